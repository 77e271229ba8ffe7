//! Feralyx core: agronomic observations, feature derivation, fitted
//! ensemble pipelines and their persistence.
//!
//! Modules:
//! - `record`: observations (`Record`) and tabular datasets (`Table`)
//! - `features`: deterministic irrigation and disease feature derivation
//! - `encoding`: label encoding and standard scaling
//! - `preprocess`: the encoder/scaler bank bound to an ordered feature list
//! - `ensemble`: wrappers over fitted smartcore forests and boosters, soft voting
//! - `pipeline`: trained pipelines, predictors and the untrained/trained `Model` façade
//! - `store`, `serialization`: canonical JSON model store with blake3 sidecars
//!
//! Fitting lives in `feralyx-trainer`; everything here is inference-only and
//! fitted pipelines are immutable, so they are `Send + Sync` by construction.

pub mod encoding;
pub mod ensemble;
pub mod errors;
pub mod features;
pub mod pipeline;
pub mod preprocess;
pub mod record;
pub mod serialization;
pub mod store;

pub use encoding::{LabelEncoder, StandardScaler};
pub use ensemble::{design_matrix, DecisionModel, Learner, OneVsRest, RegressionModel};
pub use errors::{AgroError, Result};
pub use features::FeatureSet;
pub use pipeline::{
    DiseaseDiagnosis, DiseaseModel, DiseasePipeline, ExportAdvice, ExportModel, ExportPipeline,
    IrrigationAdvice, IrrigationModel, IrrigationPipeline, Model, ParcelModel, ParcelPipeline,
    ParcelScores, Pipeline, PipelineKind,
};
pub use preprocess::Preprocessor;
pub use record::{Record, Table, Value};
pub use store::StoredArtifact;

/// Crate version string recorded by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn fitted_pipelines_are_shareable() {
        assert_send_sync::<IrrigationPipeline>();
        assert_send_sync::<DiseasePipeline>();
        assert_send_sync::<ExportPipeline>();
        assert_send_sync::<ParcelPipeline>();
    }
}
