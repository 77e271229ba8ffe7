use feralyx_core::AgroError;
use thiserror::Error;

/// Errors returned by the advisory layer.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// No crop's production cost fits the budget
    #[error("insufficient budget: at least {minimum:.0} € is required")]
    InsufficientBudget { minimum: f64 },

    #[error("unknown {field} '{value}'")]
    UnknownCategory { field: &'static str, value: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("mail credentials are incomplete: {0}")]
    MissingCredentials(&'static str),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error(transparent)]
    Core(#[from] AgroError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdvisorError {
    pub(crate) fn unknown(field: &'static str, value: &str) -> Self {
        AdvisorError::UnknownCategory {
            field,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
