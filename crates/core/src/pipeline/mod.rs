//! Trained pipelines and their untrained/trained façades
//!
//! A pipeline bundles a fitted [`Preprocessor`](crate::Preprocessor) with the
//! fitted models of one task. [`Model`] wraps an optional pipeline and is the
//! state machine callers hold: `Untrained` until a pipeline is installed by
//! training or loaded from the store.

mod disease;
mod export;
mod irrigation;
mod parcel;

pub use disease::{disease_feature_names, DiseaseDiagnosis, DiseasePipeline, DISEASE_COLUMN};
pub use export::{
    crop_economics, CropEconomics, ExportAdvice, ExportPipeline, COUNTRY_COLUMN, COUNTRY_FEATURES,
    CROP_COLUMN, CROP_FEATURES, NET_MARGIN, SITE_CATEGORICAL,
};
pub use irrigation::{
    irrigation_feature_names, IrrigationAdvice, IrrigationPipeline, DECISION_COLUMN,
    IRRIGATE_LABEL, MIN_DURATION_MINUTES, MIN_FLOW_RATE, QUANTITY_TARGETS,
};
pub use parcel::{
    country_bounds, land_price, recommend_crop, GeoBounds, ParcelPipeline, ParcelScores, FERTILITY_COLUMN, OPPORTUNITY_COLUMN, PARCEL_CATEGORICAL,
    PARCEL_FEATURES, VALUE_COLUMN,
};

use crate::errors::{AgroError, Result};
use crate::record::Record;
use crate::store::{self, StoredArtifact};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Which task a persisted pipeline serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Irrigation,
    Disease,
    Export,
    Parcel,
}

impl PipelineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineKind::Irrigation => "irrigation",
            PipelineKind::Disease => "disease",
            PipelineKind::Export => "export",
            PipelineKind::Parcel => "parcel",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully fitted, read-only inference chain
pub trait Pipeline: Serialize + DeserializeOwned {
    const KIND: PipelineKind;
    type Output;

    /// Run one observation through the persisted transform chain
    fn predict(&self, record: &Record) -> Result<Self::Output>;

    /// Structural consistency check run after every load
    fn validate(&self) -> Result<()>;
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Confidence in percent from class probabilities, rounded to one decimal
pub fn confidence_percent(probabilities: &[f64]) -> f64 {
    let best = probabilities.iter().copied().fold(0.0, f64::max);
    round_to(best * 100.0, 1).clamp(0.0, 100.0)
}

/// Fail unless a fitted model consumes exactly the preprocessor's width
pub(crate) fn check_width(model: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(AgroError::InvalidModel(format!(
            "{model} expects {actual} features but the preprocessor emits {expected}"
        )));
    }
    Ok(())
}

/// Untrained/trained façade over one pipeline type
#[derive(Debug, Clone)]
pub struct Model<P> {
    pipeline: Option<P>,
}

pub type IrrigationModel = Model<IrrigationPipeline>;
pub type DiseaseModel = Model<DiseasePipeline>;
pub type ExportModel = Model<ExportPipeline>;
pub type ParcelModel = Model<ParcelPipeline>;

impl<P> Default for Model<P> {
    fn default() -> Self {
        Self { pipeline: None }
    }
}

impl<P: Pipeline> Model<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pipeline(pipeline: P) -> Self {
        Self {
            pipeline: Some(pipeline),
        }
    }

    /// Replace the whole fitted state; a model is never updated incrementally
    pub fn install(&mut self, pipeline: P) {
        self.pipeline = Some(pipeline);
    }

    pub fn is_trained(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn pipeline(&self) -> Result<&P> {
        self.pipeline
            .as_ref()
            .ok_or(AgroError::NotTrained { model: P::KIND })
    }

    pub fn predict(&self, record: &Record) -> Result<P::Output> {
        self.pipeline()?.predict(record)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<StoredArtifact> {
        store::save(self.pipeline()?, path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_pipeline(store::load(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untrained_models_refuse_to_predict() {
        let model = IrrigationModel::new();
        assert!(!model.is_trained());
        match model.predict(&Record::new()) {
            Err(AgroError::NotTrained { model }) => assert_eq!(model, PipelineKind::Irrigation),
            other => panic!("expected not trained, got {other:?}"),
        }
        assert!(matches!(
            DiseaseModel::new().save("never-written.json"),
            Err(AgroError::NotTrained { model: PipelineKind::Disease })
        ));
    }

    #[test]
    fn rounding_and_confidence() {
        assert_eq!(round_to(2.345_6, 2), 2.35);
        assert_eq!(round_to(12.25, 1), 12.3);
        assert_eq!(confidence_percent(&[0.2, 0.8]), 80.0);
        assert_eq!(confidence_percent(&[0.333_33, 0.333_33, 0.333_34]), 33.3);
        assert_eq!(confidence_percent(&[1.000_000_1]), 100.0);
    }

    #[test]
    fn kind_display_matches_serde_tag() {
        for kind in [
            PipelineKind::Irrigation,
            PipelineKind::Disease,
            PipelineKind::Export,
            PipelineKind::Parcel,
        ] {
            let tag = serde_json::to_string(&kind).unwrap();
            assert_eq!(tag, format!("\"{kind}\""));
        }
    }
}
