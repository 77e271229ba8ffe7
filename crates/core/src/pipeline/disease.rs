//! Leaf-disease classification

use super::{check_width, confidence_percent, round_to, Pipeline, PipelineKind};
use crate::encoding::LabelEncoder;
use crate::ensemble::{argmax, DecisionModel};
use crate::errors::{AgroError, Result};
use crate::features::DISEASE_DERIVED;
use crate::preprocess::Preprocessor;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DISEASE_COLUMN: &str = "maladie";

const BASE_FEATURES: &[&str] = &[
    "temperature_feuille",
    "humidite_feuille",
    "couleur",
    "stress_hydrique",
    "ph_sol",
    "croissance_pct",
];

pub fn disease_feature_names(engineered: bool) -> Vec<String> {
    let mut names: Vec<String> = BASE_FEATURES.iter().map(|s| s.to_string()).collect();
    if engineered {
        names.extend(DISEASE_DERIVED.iter().map(|s| s.to_string()));
    }
    names
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseDiagnosis {
    pub disease: String,
    pub confidence: f64,
    /// Percent per known label, one decimal
    pub probabilities: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiseasePipeline {
    pub preprocessor: Preprocessor,
    pub labels: LabelEncoder,
    pub decision: DecisionModel,
}

impl Pipeline for DiseasePipeline {
    const KIND: PipelineKind = PipelineKind::Disease;
    type Output = DiseaseDiagnosis;

    fn predict(&self, record: &Record) -> Result<DiseaseDiagnosis> {
        let x = self.preprocessor.transform(record)?;
        let proba = self.decision.predict_proba(&x)?;
        let disease = self
            .labels
            .inverse(argmax(&proba))
            .ok_or_else(|| AgroError::InvalidModel("decision class outside label set".into()))?
            .to_string();

        let probabilities = self
            .labels
            .classes()
            .iter()
            .zip(&proba)
            .map(|(label, p)| (label.clone(), round_to(p * 100.0, 1)))
            .collect();

        Ok(DiseaseDiagnosis {
            disease,
            confidence: confidence_percent(&proba),
            probabilities,
        })
    }

    fn validate(&self) -> Result<()> {
        self.preprocessor.validate()?;
        self.decision.validate()?;
        check_width(
            "decision model",
            self.preprocessor.feature_names().len(),
            self.decision.n_features(),
        )?;
        if self.decision.n_classes() != self.labels.len() {
            return Err(AgroError::InvalidModel(format!(
                "decision model has {} classes but {} labels are known",
                self.decision.n_classes(),
                self.labels.len()
            )));
        }
        Ok(())
    }
}
