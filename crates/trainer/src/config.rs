//! Training configuration
//!
//! One section per pipeline. A configuration starts from the basic or
//! advanced preset and a TOML file overrides any subset of it: tables are
//! merged key by key, so a file may change a single hyper-parameter.

use crate::augment::AugmentationConfig;
use crate::boosting::BoostingConfig;
use crate::errors::{Result, TrainerError};
use crate::forest::ForestConfig;
use crate::models::{ClassifierSpec, RegressorSpec};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

/// Seed shared by every preset
pub const DEFAULT_SEED: u64 = 42;

pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

pub const DEFAULT_CV_FOLDS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Raw features, single forest, no augmentation or cross-validation
    Basic,
    /// Engineered features, augmentation, soft-voting ensemble, 5-fold CV
    #[default]
    Advanced,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Variant::Basic => "basic",
            Variant::Advanced => "advanced",
        })
    }
}

/// Split, validation and preprocessing options shared by the classifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub seed: u64,
    pub test_fraction: f64,
    /// Stratified folds over the training partition; `None` skips CV
    pub cv_folds: Option<usize>,
    /// Apply the pipeline's feature derivations before encoding
    pub engineered: bool,
    pub augmentation: Option<AugmentationConfig>,
}

impl Protocol {
    fn basic() -> Self {
        Self {
            seed: DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
            cv_folds: None,
            engineered: false,
            augmentation: None,
        }
    }

    fn advanced(augmentation: AugmentationConfig) -> Self {
        Self {
            seed: DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
            cv_folds: Some(DEFAULT_CV_FOLDS),
            engineered: true,
            augmentation: Some(augmentation),
        }
    }

    pub fn validate(&self, section: &str) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(TrainerError::Config(format!(
                "{section}: test_fraction must lie in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if let Some(k) = self.cv_folds {
            if k < 2 {
                return Err(TrainerError::Config(format!("{section}: cv_folds must be at least 2")));
            }
        }
        if let Some(augmentation) = &self.augmentation {
            augmentation.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationConfig {
    pub protocol: Protocol,
    pub decision: ClassifierSpec,
    /// Fitted on positive rows only, predicting flow rate and duration
    pub quantity: RegressorSpec,
}

impl IrrigationConfig {
    pub fn preset(variant: Variant) -> Self {
        match variant {
            Variant::Basic => Self {
                protocol: Protocol::basic(),
                decision: ClassifierSpec::Forest(ForestConfig::default()),
                quantity: RegressorSpec::Forest(ForestConfig::default()),
            },
            Variant::Advanced => Self {
                protocol: Protocol::advanced(AugmentationConfig::irrigation()),
                decision: ClassifierSpec::SoftVote {
                    members: vec![
                        ClassifierSpec::Forest(ForestConfig::new(200, Some(15), 5)),
                        ClassifierSpec::Boosting(BoostingConfig::new(150, 0.1, 5)),
                    ],
                },
                quantity: RegressorSpec::Boosting(
                    BoostingConfig::new(300, 0.05, 7).with_min_child_weight(2),
                ),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseConfig {
    pub protocol: Protocol,
    pub decision: ClassifierSpec,
}

impl DiseaseConfig {
    pub fn preset(variant: Variant) -> Self {
        match variant {
            Variant::Basic => Self {
                protocol: Protocol::basic(),
                decision: ClassifierSpec::Forest(ForestConfig::default()),
            },
            Variant::Advanced => Self {
                protocol: Protocol::advanced(AugmentationConfig::disease()),
                decision: ClassifierSpec::SoftVote {
                    members: vec![
                        ClassifierSpec::Forest(ForestConfig::new(250, Some(20), 3)),
                        ClassifierSpec::Boosting(BoostingConfig::new(200, 0.08, 6)),
                    ],
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub seed: u64,
    pub test_fraction: f64,
    pub crop: ClassifierSpec,
    pub country: ClassifierSpec,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
            crop: ClassifierSpec::Forest(ForestConfig::default()),
            country: ClassifierSpec::Forest(ForestConfig::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelConfig {
    pub seed: u64,
    pub test_fraction: f64,
    pub fertility: RegressorSpec,
    pub value: RegressorSpec,
    pub opportunity: RegressorSpec,
}

impl Default for ParcelConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
            fertility: RegressorSpec::Boosting(BoostingConfig::new(200, 0.05, 6)),
            value: RegressorSpec::Forest(ForestConfig::new(150, Some(15), 2)),
            opportunity: RegressorSpec::Boosting(BoostingConfig::new(200, 0.08, 7)),
        }
    }
}

/// Complete training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub variant: Variant,
    pub irrigation: IrrigationConfig,
    pub disease: DiseaseConfig,
    pub export: ExportConfig,
    pub parcel: ParcelConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::preset(Variant::default())
    }
}

impl TrainingConfig {
    pub fn preset(variant: Variant) -> Self {
        Self {
            variant,
            irrigation: IrrigationConfig::preset(variant),
            disease: DiseaseConfig::preset(variant),
            export: ExportConfig::default(),
            parcel: ParcelConfig::default(),
        }
    }

    /// Parse TOML over a preset; `variant` overrides the file's own
    /// `variant` key, which otherwise selects the preset
    pub fn from_toml_str(content: &str, variant: Option<Variant>) -> Result<Self> {
        let overrides: toml::Table = toml::from_str(content)
            .map_err(|e| TrainerError::Config(format!("invalid TOML: {e}")))?;

        let file_variant = match overrides.get("variant") {
            Some(value) => Some(
                value
                    .clone()
                    .try_into::<Variant>()
                    .map_err(|e| TrainerError::Config(format!("invalid variant: {e}")))?,
            ),
            None => None,
        };
        let variant = variant.or(file_variant).unwrap_or_default();

        let toml::Value::Table(mut base) = toml::Value::try_from(Self::preset(variant))
            .map_err(|e| TrainerError::Config(format!("cannot encode preset: {e}")))?
        else {
            return Err(TrainerError::Config("preset did not encode as a table".into()));
        };
        merge(&mut base, overrides);
        base.insert("variant".into(), toml::Value::String(variant.to_string()));

        let config: Self = toml::Value::Table(base)
            .try_into()
            .map_err(|e| TrainerError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P, variant: Option<Variant>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading training configuration from: {}", path.display());
        let content = fs::read_to_string(path)
            .map_err(|e| TrainerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&content, variant)
    }

    /// Replace every section's seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.irrigation.protocol.seed = seed;
        self.disease.protocol.seed = seed;
        self.export.seed = seed;
        self.parcel.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.irrigation.protocol.validate("irrigation")?;
        self.disease.protocol.validate("disease")?;
        for (section, fraction) in [
            ("export", self.export.test_fraction),
            ("parcel", self.parcel.test_fraction),
        ] {
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(TrainerError::Config(format!(
                    "{section}: test_fraction must lie in (0, 1), got {fraction}"
                )));
            }
        }
        Ok(())
    }
}

/// Recursive table merge; non-table values in `overrides` replace `base`
fn merge(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge(existing, incoming);
                } else {
                    base.insert(key, toml::Value::Table(incoming));
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}
