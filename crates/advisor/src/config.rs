//! Advisor configuration
//!
//! ```toml
//! reports_dir = "reports"
//! grid_resolution = 20
//!
//! [mail]
//! provider = "outlook"
//! account = "farm@example.org"
//! ```
//!
//! `provider` picks the server preset; explicit `server` and `port` keys win
//! over it. The secret may come from the file but [`crate::mail::SECRET_ENV`]
//! replaces it when set.

use crate::errors::{AdvisorError, Result};
use crate::mail::MailConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_GRID_RESOLUTION: usize = 20;
pub const DEFAULT_GRID_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq)]
pub struct AdvisorConfig {
    /// Directory receiving generated HTML reports
    pub reports_dir: PathBuf,
    /// Points per axis of the opportunity grid
    pub grid_resolution: usize,
    pub grid_seed: u64,
    pub mail: MailConfig,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            grid_seed: DEFAULT_GRID_SEED,
            mail: MailConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MailSection {
    provider: Option<String>,
    server: Option<String>,
    port: Option<u16>,
    account: Option<String>,
    secret: Option<String>,
}

impl MailSection {
    fn resolve(self) -> Result<MailConfig> {
        let mut mail = match self.provider.as_deref() {
            Some(provider) => MailConfig::preset(provider)?,
            None => MailConfig::default(),
        };
        if let Some(server) = self.server {
            mail.server = server;
        }
        if let Some(port) = self.port {
            mail.port = port;
        }
        mail.account = self.account;
        mail.secret = self.secret;
        Ok(mail)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    reports_dir: Option<PathBuf>,
    grid_resolution: Option<usize>,
    grid_seed: Option<u64>,
    #[serde(default)]
    mail: MailSection,
}

impl AdvisorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| AdvisorError::Config(format!("invalid TOML: {e}")))?;
        let defaults = Self::default();

        let config = Self {
            reports_dir: file.reports_dir.unwrap_or(defaults.reports_dir),
            grid_resolution: file.grid_resolution.unwrap_or(defaults.grid_resolution),
            grid_seed: file.grid_seed.unwrap_or(defaults.grid_seed),
            mail: file.mail.resolve()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file and apply the secret from the environment
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading advisor configuration from: {}", path.display());
        let content = fs::read_to_string(path)
            .map_err(|e| AdvisorError::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&content)?;
        config.mail = config.mail.with_env_secret();
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_resolution < 2 {
            return Err(AdvisorError::Config(format!(
                "grid_resolution must be at least 2, got {}",
                self.grid_resolution
            )));
        }
        self.mail.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        assert_eq!(AdvisorConfig::from_toml_str("").unwrap(), AdvisorConfig::default());
    }

    #[test]
    fn provider_preset_with_overrides() {
        let config = AdvisorConfig::from_toml_str(
            r#"
            reports_dir = "out/reports"
            grid_resolution = 8

            [mail]
            provider = "outlook"
            port = 465
            account = "farm@example.org"
            secret = "in-file"
            "#,
        )
        .unwrap();

        assert_eq!(config.reports_dir, PathBuf::from("out/reports"));
        assert_eq!(config.grid_resolution, 8);
        assert_eq!(config.grid_seed, DEFAULT_GRID_SEED);
        assert_eq!(config.mail.server, "smtp-mail.outlook.com");
        assert_eq!(config.mail.port, 465);
        assert_eq!(config.mail.credentials().unwrap(), ("farm@example.org", "in-file"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(AdvisorConfig::from_toml_str("grid_resolution = 1").is_err());
        assert!(AdvisorConfig::from_toml_str("[mail]\nprovider = \"fax\"").is_err());
        assert!(AdvisorConfig::from_toml_str("[mail]\nport = 0").is_err());
        assert!(AdvisorConfig::from_toml_str("colour = \"green\"").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("advisor.toml");
        fs::write(&path, "grid_seed = 7\n[mail]\nprovider = \"icloud\"\n").unwrap();

        let config = AdvisorConfig::load_from_file(&path).unwrap();
        assert_eq!(config.grid_seed, 7);
        assert_eq!(config.mail.server, "smtp.mail.me.com");
        assert!(AdvisorConfig::load_from_file(dir.path().join("missing.toml")).is_err());
    }
}
