//! Report delivery
//!
//! Credentials live in a [`MailConfig`] handed over at construction; the wire
//! protocol sits behind [`ReportTransport`].

use crate::errors::{AdvisorError, Result};
use crate::market::ExportRecommendation;
use crate::report::escape_html;
use chrono::{DateTime, Utc};
use feralyx_core::{DiseaseDiagnosis, IrrigationAdvice};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// Environment variable that replaces the configured secret
pub const SECRET_ENV: &str = "FERALYX_MAIL_SECRET";

pub const DEFAULT_PORT: u16 = 587;

/// Outgoing mail server and the account used to authenticate
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub account: Option<String>,
    #[serde(skip_serializing)]
    pub secret: Option<String>,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("account", &self.account)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            server: "smtp.gmail.com".to_string(),
            port: DEFAULT_PORT,
            account: None,
            secret: None,
        }
    }
}

impl MailConfig {
    /// Server settings of a known provider: gmail, outlook, yahoo or icloud
    pub fn preset(provider: &str) -> Result<Self> {
        let server = match provider {
            "gmail" => "smtp.gmail.com",
            "outlook" => "smtp-mail.outlook.com",
            "yahoo" => "smtp.mail.yahoo.com",
            "icloud" => "smtp.mail.me.com",
            other => return Err(AdvisorError::unknown("mail provider", other)),
        };
        Ok(Self {
            server: server.to_string(),
            ..Self::default()
        })
    }

    pub fn with_credentials(mut self, account: impl Into<String>, secret: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self.secret = Some(secret.into());
        self
    }

    /// Replace the secret when `secret` is set and non-empty
    pub fn with_secret_override(mut self, secret: Option<String>) -> Self {
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.secret = Some(secret);
        }
        self
    }

    /// Apply [`SECRET_ENV`] from the process environment
    pub fn with_env_secret(self) -> Self {
        self.with_secret_override(std::env::var(SECRET_ENV).ok())
    }

    /// Account and secret, failing when either is missing
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let account = self
            .account
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or(AdvisorError::MissingCredentials("account"))?;
        let secret = self
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(AdvisorError::MissingCredentials("secret"))?;
        Ok((account, secret))
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(AdvisorError::Config("mail server must not be empty".into()));
        }
        if self.port == 0 {
            return Err(AdvisorError::Config("mail port must be non-zero".into()));
        }
        Ok(())
    }
}

/// Latest results summarized in the message body
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub irrigation: Option<IrrigationAdvice>,
    pub disease: Option<DiseaseDiagnosis>,
    pub export: Option<ExportRecommendation>,
}

impl ReportSummary {
    fn is_empty(&self) -> bool {
        self.irrigation.is_none() && self.disease.is_none() && self.export.is_none()
    }

    fn render(&self) -> String {
        let mut body = String::from(
            "<html><head><meta charset=\"utf-8\"></head><body style=\"font-family: Arial, sans-serif;\">\n\
             <h2>Feralyx report</h2>\n",
        );
        if self.is_empty() {
            body.push_str("<p>Please find your complete agricultural analysis report attached.</p>\n");
        }

        if let Some(irrigation) = &self.irrigation {
            body.push_str("<h3>Irrigation</h3>\n");
            if irrigation.irrigate {
                body.push_str(&format!(
                    "<p><strong>IRRIGATION NEEDED</strong></p>\n<p>Flow rate: {:.2} L/min</p>\n<p>Duration: {:.1} minutes</p>\n",
                    irrigation.flow_rate, irrigation.duration_minutes
                ));
            } else {
                body.push_str("<p><strong>NO IRRIGATION</strong></p>\n");
            }
        }

        if let Some(disease) = &self.disease {
            body.push_str(&format!(
                "<h3>Diagnosis</h3>\n<p>State: <strong>{}</strong></p>\n<p>Confidence: {:.1}%</p>\n",
                escape_html(&disease.disease.to_uppercase().replace('_', " ")),
                disease.confidence
            ));
        }

        if let Some(export) = &self.export {
            body.push_str(&format!(
                "<h3>Export recommendation</h3>\n<p>Crop: <strong>{}</strong></p>\n<p>Export country: {}</p>\n<p>Estimated ROI: {:.1}%</p>\n",
                escape_html(&export.crop.to_uppercase()),
                escape_html(&export.export_country),
                export.roi
            ));
        }

        body.push_str("<p>The detailed report is attached.</p>\n</body></html>\n");
        body
    }
}

/// A fully composed message ready for a transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEnvelope {
    pub from: String,
    pub to: String,
    pub subject: String,
    /// HTML body
    pub body: String,
    /// Existing files only
    pub attachments: Vec<PathBuf>,
}

impl ReportEnvelope {
    /// Build subject, body and attachment list
    ///
    /// The report and additional files are attached when they exist; missing
    /// files are skipped with a warning.
    pub fn compose(
        from: &str,
        to: &str,
        report: &Path,
        additional: &[PathBuf],
        summary: &ReportSummary,
        date: DateTime<Utc>,
    ) -> Result<Self> {
        if to.trim().is_empty() {
            return Err(AdvisorError::InvalidInput("recipient must not be empty".into()));
        }

        let mut attachments = Vec::with_capacity(additional.len() + 1);
        for path in std::iter::once(report).chain(additional.iter().map(PathBuf::as_path)) {
            if path.is_file() {
                attachments.push(path.to_path_buf());
            } else {
                warn!(path = %path.display(), "attachment not found, skipping");
            }
        }

        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: format!("Feralyx report - {}", date.format("%d/%m/%Y")),
            body: summary.render(),
            attachments,
        })
    }
}

/// Delivers composed envelopes, e.g. over SMTP
pub trait ReportTransport {
    fn deliver(&self, config: &MailConfig, envelope: &ReportEnvelope) -> Result<()>;
}

/// Transport that keeps every envelope in memory
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<ReportEnvelope>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<ReportEnvelope> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl ReportTransport for Outbox {
    fn deliver(&self, _config: &MailConfig, envelope: &ReportEnvelope) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| AdvisorError::Delivery("outbox lock poisoned".into()))?
            .push(envelope.clone());
        Ok(())
    }
}

/// Sends reports with one configuration over one transport
pub struct Mailer<T> {
    config: MailConfig,
    transport: T,
}

impl<T: ReportTransport> Mailer<T> {
    pub fn new(config: MailConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn send_report(
        &self,
        to: &str,
        report: &Path,
        additional: &[PathBuf],
        summary: &ReportSummary,
    ) -> Result<ReportEnvelope> {
        self.config.validate()?;
        let (account, _) = self.config.credentials()?;
        let envelope = ReportEnvelope::compose(account, to, report, additional, summary, Utc::now())?;

        info!(
            server = %self.config.server,
            port = self.config.port,
            to,
            attachments = envelope.attachments.len(),
            "sending report"
        );
        self.transport.deliver(&self.config, &envelope)?;
        Ok(envelope)
    }
}
