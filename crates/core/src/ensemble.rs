//! Fitted ensemble models
//!
//! Tree ensembles are fitted by `smartcore` (random forests and XGBoost-style
//! gradient boosting); this module only wraps the fitted estimators for
//! inference and persistence.
//!
//! Classifiers are one-vs-rest: each class owns a regressor scoring its
//! indicator target, and the clipped scores are normalised into class
//! probabilities. A soft vote averages those probabilities over members.

use crate::errors::{AgroError, Result};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::xgboost::XGRegressor;

/// Random forest regressor over dense `f64` rows
pub type ForestEstimator = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Gradient-boosted regressor over dense `f64` rows
pub type BoostedEstimator = XGRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Row-major feature rows as a smartcore matrix
pub fn design_matrix(rows: &[Vec<f64>]) -> Result<DenseMatrix<f64>> {
    let width = rows.first().map_or(0, Vec::len);
    if let Some(row) = rows.iter().find(|row| row.len() != width) {
        return Err(AgroError::FeatureWidthMismatch {
            expected: width,
            actual: row.len(),
        });
    }
    DenseMatrix::from_2d_vec(&rows.to_vec())
        .map_err(|e| AgroError::InvalidModel(format!("cannot build design matrix: {e}")))
}

/// Index of the largest entry; ties resolve to the lowest index
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Clip scores to [0, 1] and rescale them to sum to one
///
/// All-zero scores become the uniform distribution.
pub fn normalize(scores: &[f64]) -> Vec<f64> {
    let clipped: Vec<f64> = scores.iter().map(|s| s.clamp(0.0, 1.0)).collect();
    let total: f64 = clipped.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        let n = clipped.len().max(1) as f64;
        return vec![1.0 / n; clipped.len()];
    }
    clipped.into_iter().map(|p| p / total).collect()
}

/// One fitted single-target estimator
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Learner {
    Forest(ForestEstimator),
    Boosted(BoostedEstimator),
    /// Target was constant at training time
    Constant(f64),
}

impl Learner {
    fn predict(&self, x: &DenseMatrix<f64>) -> Result<f64> {
        let out = match self {
            Learner::Forest(m) => m.predict(x),
            Learner::Boosted(m) => m.predict(x),
            Learner::Constant(value) => return Ok(*value),
        }
        .map_err(|e| AgroError::InvalidModel(format!("estimator failed to predict: {e}")))?;
        out.first()
            .copied()
            .ok_or_else(|| AgroError::InvalidModel("estimator produced no output".into()))
    }
}

fn single_row(n_features: usize, x: &[f64]) -> Result<DenseMatrix<f64>> {
    if x.len() != n_features {
        return Err(AgroError::FeatureWidthMismatch {
            expected: n_features,
            actual: x.len(),
        });
    }
    design_matrix(&[x.to_vec()])
}

/// One indicator regressor per class
#[derive(Debug, Serialize, Deserialize)]
pub struct OneVsRest {
    pub n_features: usize,
    /// Indexed by class code
    pub classes: Vec<Learner>,
}

impl OneVsRest {
    pub fn new(n_features: usize, classes: Vec<Learner>) -> Self {
        Self { n_features, classes }
    }

    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>> {
        let row = single_row(self.n_features, x)?;
        let scores = self
            .classes
            .iter()
            .map(|learner| learner.predict(&row))
            .collect::<Result<Vec<f64>>>()?;
        Ok(normalize(&scores))
    }
}

/// A fitted classifier producing class probabilities
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionModel {
    OneVsRest(OneVsRest),
    /// Averaged class probabilities of the members
    SoftVote(Vec<DecisionModel>),
}

impl DecisionModel {
    pub fn n_classes(&self) -> usize {
        match self {
            DecisionModel::OneVsRest(m) => m.classes.len(),
            DecisionModel::SoftVote(members) => members.first().map_or(0, DecisionModel::n_classes),
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            DecisionModel::OneVsRest(m) => m.n_features,
            DecisionModel::SoftVote(members) => members.first().map_or(0, DecisionModel::n_features),
        }
    }

    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>> {
        match self {
            DecisionModel::OneVsRest(m) => m.predict_proba(x),
            DecisionModel::SoftVote(members) => {
                let mut acc = vec![0.0; self.n_classes()];
                for member in members {
                    for (a, p) in acc.iter_mut().zip(member.predict_proba(x)?) {
                        *a += p;
                    }
                }
                let n = members.len().max(1) as f64;
                acc.iter_mut().for_each(|a| *a /= n);
                Ok(acc)
            }
        }
    }

    /// Class index with the highest probability
    pub fn predict(&self, x: &[f64]) -> Result<usize> {
        Ok(argmax(&self.predict_proba(x)?))
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            DecisionModel::OneVsRest(m) if m.classes.is_empty() => {
                Err(AgroError::InvalidModel("classifier has no classes".into()))
            }
            DecisionModel::OneVsRest(_) => Ok(()),
            DecisionModel::SoftVote(members) => {
                let Some(first) = members.first() else {
                    return Err(AgroError::InvalidModel("soft vote has no members".into()));
                };
                for member in members {
                    if member.n_classes() != first.n_classes()
                        || member.n_features() != first.n_features()
                    {
                        return Err(AgroError::InvalidModel(
                            "soft vote members disagree on input or class count".into(),
                        ));
                    }
                    member.validate()?;
                }
                Ok(())
            }
        }
    }
}

/// A fitted regressor with one estimator per output
#[derive(Debug, Serialize, Deserialize)]
pub struct RegressionModel {
    pub n_features: usize,
    pub outputs: Vec<Learner>,
}

impl RegressionModel {
    pub fn new(n_features: usize, outputs: Vec<Learner>) -> Self {
        Self { n_features, outputs }
    }

    pub fn n_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn predict(&self, x: &[f64]) -> Result<Vec<f64>> {
        let row = single_row(self.n_features, x)?;
        self.outputs.iter().map(|learner| learner.predict(&row)).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.outputs.is_empty() {
            return Err(AgroError::InvalidModel("regressor has no outputs".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use smartcore::ensemble::random_forest_regressor::RandomForestRegressorParameters;
    use smartcore::xgboost::XGRegressorParameters;

    /// Small booster fitted on `rows`, used by the pipeline tests
    pub(crate) fn boosted_learner(rows: &[Vec<f64>], y: &[f64]) -> Learner {
        let params = XGRegressorParameters::default().with_n_estimators(20).with_max_depth(2);
        Learner::Boosted(BoostedEstimator::fit(&design_matrix(rows).unwrap(), &y.to_vec(), params).unwrap())
    }

    fn constant_classifier(scores: &[f64]) -> DecisionModel {
        DecisionModel::OneVsRest(OneVsRest::new(
            1,
            scores.iter().map(|s| Learner::Constant(*s)).collect(),
        ))
    }

    /// Forest scoring `x > 0` on one feature
    fn sign_forest() -> Learner {
        let rows: Vec<Vec<f64>> = (-20..20).map(|i| vec![i as f64 + 0.5]).collect();
        let y: Vec<f64> = rows.iter().map(|r| f64::from(u8::from(r[0] > 0.0))).collect();
        let params = RandomForestRegressorParameters::default().with_n_trees(10).with_seed(7);
        Learner::Forest(ForestEstimator::fit(&design_matrix(&rows).unwrap(), &y, params).unwrap())
    }

    #[test]
    fn scores_are_clipped_and_normalised() {
        let p = normalize(&[1.4, -0.2, 0.6]);
        assert_relative_eq!(p[0], 1.0 / 1.6);
        assert_eq!(p[1], 0.0);
        assert_relative_eq!(p.iter().sum::<f64>(), 1.0);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.5, 0.5]);
    }

    #[test]
    fn one_vs_rest_uses_fitted_forests() {
        let forest = sign_forest();
        let model = DecisionModel::OneVsRest(OneVsRest::new(1, vec![Learner::Constant(0.5), forest]));
        model.validate().unwrap();
        assert_eq!(model.predict(&[15.0]).unwrap(), 1);
        assert_eq!(model.predict(&[-15.0]).unwrap(), 0);

        let json = serde_json::to_string(&model).unwrap();
        let back: DecisionModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.predict_proba(&[15.0]).unwrap(), model.predict_proba(&[15.0]).unwrap());
    }

    #[test]
    fn single_class_is_certain() {
        let model = constant_classifier(&[1.0]);
        assert_eq!(model.predict_proba(&[3.0]).unwrap(), vec![1.0]);
        assert_eq!(model.predict(&[3.0]).unwrap(), 0);
    }

    #[test]
    fn soft_vote_averages_members() {
        let vote = DecisionModel::SoftVote(vec![
            constant_classifier(&[0.75, 0.25]),
            constant_classifier(&[0.0, 1.0]),
        ]);
        let p = vote.predict_proba(&[-1.0]).unwrap();
        assert_relative_eq!(p[0], 0.375);
        assert_relative_eq!(p[1], 0.625);
        assert!(vote.validate().is_ok());
    }

    #[test]
    fn regression_outputs_follow_estimators() {
        let model = RegressionModel::new(1, vec![Learner::Constant(3.0), sign_forest()]);
        let out = model.predict(&[12.0]).unwrap();
        assert_eq!(out[0], 3.0);
        assert!(out[1] > 0.5);
        assert_eq!(model.n_outputs(), 2);
        assert!(matches!(
            model.predict(&[1.0, 2.0]),
            Err(AgroError::FeatureWidthMismatch { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn empty_models_are_invalid() {
        assert!(matches!(
            DecisionModel::SoftVote(vec![]).validate(),
            Err(AgroError::InvalidModel(_))
        ));
        assert!(constant_classifier(&[]).validate().is_err());
        assert!(RegressionModel::new(3, vec![]).validate().is_err());
        assert!(design_matrix(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
    }
}
