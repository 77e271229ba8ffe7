//! Irrigation decision plus flow-rate/duration estimation

use super::{check_width, confidence_percent, round_to, Pipeline, PipelineKind};
use crate::encoding::LabelEncoder;
use crate::ensemble::{argmax, DecisionModel, RegressionModel};
use crate::errors::{AgroError, Result};
use crate::features::IRRIGATION_DERIVED;
use crate::preprocess::Preprocessor;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Class label of the `irriguer` column meaning "irrigate"
pub const IRRIGATE_LABEL: &str = "1";

/// Physical floor for a positive irrigation flow rate
pub const MIN_FLOW_RATE: f64 = 0.5;

/// Physical floor for a positive irrigation duration
pub const MIN_DURATION_MINUTES: f64 = 10.0;

/// Label column and the two quantity targets, in output order
pub const DECISION_COLUMN: &str = "irriguer";
pub const QUANTITY_TARGETS: [&str; 2] = ["debit_eau", "duree_minutes"];

const BASE_FEATURES: &[&str] = &[
    "humidite",
    "temperature",
    "type_sol_encoded",
    "ph",
    "ensoleillement",
    "age_culture",
    "precipitation_prevue",
];

/// Ordered model inputs, optionally followed by the engineered attributes
pub fn irrigation_feature_names(engineered: bool) -> Vec<String> {
    let mut names: Vec<String> = BASE_FEATURES.iter().map(|s| s.to_string()).collect();
    if engineered {
        names.extend(IRRIGATION_DERIVED.iter().map(|s| s.to_string()));
    }
    names
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationAdvice {
    pub irrigate: bool,
    /// Litres per minute, two decimals; zero when not irrigating
    pub flow_rate: f64,
    /// Minutes, one decimal; zero when not irrigating
    pub duration_minutes: f64,
    /// Percent in [0, 100], one decimal
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IrrigationPipeline {
    pub preprocessor: Preprocessor,
    pub labels: LabelEncoder,
    pub decision: DecisionModel,
    /// Absent when training saw no positive rows
    pub quantity: Option<RegressionModel>,
}

impl Pipeline for IrrigationPipeline {
    const KIND: PipelineKind = PipelineKind::Irrigation;
    type Output = IrrigationAdvice;

    fn predict(&self, record: &Record) -> Result<IrrigationAdvice> {
        let x = self.preprocessor.transform(record)?;
        let proba = self.decision.predict_proba(&x)?;
        let confidence = confidence_percent(&proba);

        let label = self
            .labels
            .inverse(argmax(&proba))
            .ok_or_else(|| AgroError::InvalidModel("decision class outside label set".into()))?;
        if label != IRRIGATE_LABEL {
            return Ok(IrrigationAdvice {
                irrigate: false,
                flow_rate: 0.0,
                duration_minutes: 0.0,
                confidence,
            });
        }

        let Some(quantity) = &self.quantity else {
            warn!("irrigation decided but the pipeline has no quantity model");
            return Err(AgroError::QuantityModelUnavailable);
        };
        match quantity.predict(&x)?.as_slice() {
            [flow, duration, ..] => Ok(IrrigationAdvice {
                irrigate: true,
                flow_rate: round_to(flow.max(MIN_FLOW_RATE), 2),
                duration_minutes: round_to(duration.max(MIN_DURATION_MINUTES), 1),
                confidence,
            }),
            _ => Err(AgroError::InvalidModel("quantity model must have two outputs".into())),
        }
    }

    fn validate(&self) -> Result<()> {
        self.preprocessor.validate()?;
        self.decision.validate()?;
        let width = self.preprocessor.feature_names().len();
        check_width("decision model", width, self.decision.n_features())?;
        if self.decision.n_classes() != self.labels.len() {
            return Err(AgroError::InvalidModel(format!(
                "decision model has {} classes but {} labels are known",
                self.decision.n_classes(),
                self.labels.len()
            )));
        }
        if let Some(quantity) = &self.quantity {
            quantity.validate()?;
            check_width("quantity model", width, quantity.n_features())?;
            if quantity.n_outputs() != QUANTITY_TARGETS.len() {
                return Err(AgroError::InvalidModel("quantity model must have two outputs".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::{Learner, OneVsRest};
    use crate::record::Table;

    fn observation(humidite: f64) -> Record {
        Record::new()
            .with("humidite", humidite)
            .with("temperature", 30.0)
            .with("type_sol", "sableux")
            .with("ph", 6.5)
            .with("ensoleillement", 8.0)
            .with("age_culture", 40.0)
            .with("precipitation_prevue", 3.0)
    }

    fn constant_decision(p_irrigate: f64) -> DecisionModel {
        DecisionModel::OneVsRest(OneVsRest::new(
            7,
            vec![Learner::Constant(1.0 - p_irrigate), Learner::Constant(p_irrigate)],
        ))
    }

    fn pipeline(p_irrigate: f64, quantity: Option<RegressionModel>) -> IrrigationPipeline {
        let table = Table::from_rows(vec![observation(10.0), observation(90.0)]);
        let preprocessor =
            Preprocessor::fit(&table, None, &["type_sol"], irrigation_feature_names(false)).unwrap();
        IrrigationPipeline {
            preprocessor,
            labels: LabelEncoder::fit(DECISION_COLUMN, ["0", "1"]).unwrap(),
            decision: constant_decision(p_irrigate),
            quantity,
        }
    }

    fn tiny_quantity(flow: f64, duration: f64) -> RegressionModel {
        RegressionModel::new(7, vec![Learner::Constant(flow), Learner::Constant(duration)])
    }

    #[test]
    fn quantities_are_floored_and_rounded() {
        let p = pipeline(0.9, Some(tiny_quantity(0.123, 4.0)));
        p.validate().unwrap();
        let advice = p.predict(&observation(12.0)).unwrap();
        assert!(advice.irrigate);
        assert_eq!(advice.flow_rate, MIN_FLOW_RATE);
        assert_eq!(advice.duration_minutes, MIN_DURATION_MINUTES);
        assert_eq!(advice.confidence, 90.0);

        let advice = pipeline(0.9, Some(tiny_quantity(2.345_6, 31.26))).predict(&observation(12.0)).unwrap();
        assert_eq!(advice.flow_rate, 2.35);
        assert_eq!(advice.duration_minutes, 31.3);
    }

    #[test]
    fn no_irrigation_means_zero_quantities() {
        let advice = pipeline(0.2, Some(tiny_quantity(3.0, 40.0))).predict(&observation(85.0)).unwrap();
        assert!(!advice.irrigate);
        assert_eq!(advice.flow_rate, 0.0);
        assert_eq!(advice.duration_minutes, 0.0);
        assert_eq!(advice.confidence, 80.0);
    }

    #[test]
    fn missing_quantity_model_is_explicit() {
        assert!(matches!(
            pipeline(0.9, None).predict(&observation(12.0)),
            Err(AgroError::QuantityModelUnavailable)
        ));
        assert!(!pipeline(0.1, None).predict(&observation(85.0)).unwrap().irrigate);
    }

    #[test]
    fn single_class_decision_never_irrigates() {
        let mut p = pipeline(0.0, None);
        p.labels = LabelEncoder::fit(DECISION_COLUMN, ["0"]).unwrap();
        p.decision = DecisionModel::OneVsRest(OneVsRest::new(7, vec![Learner::Constant(1.0)]));
        p.validate().unwrap();

        let advice = p.predict(&observation(5.0)).unwrap();
        assert!(!advice.irrigate);
        assert_eq!(advice.confidence, 100.0);
    }

    #[test]
    fn validate_rejects_width_and_label_drift() {
        let mut p = pipeline(0.5, None);
        p.labels = LabelEncoder::fit(DECISION_COLUMN, ["0", "1", "2"]).unwrap();
        assert!(p.validate().is_err());

        let mut p = pipeline(0.5, Some(RegressionModel::new(
            3,
            vec![Learner::Constant(1.0), Learner::Constant(1.0)],
        )));
        assert!(p.validate().is_err());
        p.quantity = None;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn feature_names_extend_with_engineering() {
        assert_eq!(irrigation_feature_names(false).len(), 7);
        assert_eq!(irrigation_feature_names(true).len(), 17);
        assert_eq!(irrigation_feature_names(true)[2], "type_sol_encoded");
    }
}
