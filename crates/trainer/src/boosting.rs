//! Gradient-boosting estimators
//!
//! Hyper-parameters map onto smartcore's XGBoost regressor under squared
//! loss. With `subsample = 1` every round sees all rows and the fit is fully
//! deterministic; below one the seed drives row sampling.

use crate::errors::{Result, TrainerError};
use crate::forest::tree_depth;
use feralyx_core::ensemble::BoostedEstimator;
use feralyx_core::Learner;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::xgboost::XGRegressorParameters;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Minimum hessian mass (rows, under squared loss) on each side of a split
    pub min_child_weight: usize,
    pub subsample: f64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_child_weight: 1,
            subsample: 1.0,
        }
    }
}

impl BoostingConfig {
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: usize) -> Self {
        Self {
            n_estimators,
            learning_rate,
            max_depth,
            ..Self::default()
        }
    }

    pub fn with_min_child_weight(mut self, min_child_weight: usize) -> Self {
        self.min_child_weight = min_child_weight;
        self
    }

    pub fn parameters(&self, seed: u64) -> XGRegressorParameters {
        XGRegressorParameters::default()
            .with_n_estimators(self.n_estimators)
            .with_learning_rate(self.learning_rate)
            .with_max_depth(tree_depth(self.max_depth))
            .with_min_child_weight(self.min_child_weight)
            .with_subsample(self.subsample)
            .with_seed(seed)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(TrainerError::Config("boosting needs at least one round".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(TrainerError::Config(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(TrainerError::Config(format!(
                "subsample must lie in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }

    /// Fit one boosted model on a single target column
    pub fn fit(&self, x: &DenseMatrix<f64>, y: &[f64], seed: u64) -> Result<Learner> {
        self.validate()?;
        let model = BoostedEstimator::fit(x, &y.to_vec(), self.parameters(seed))
            .map_err(|e| TrainerError::Training(format!("gradient boosting fit failed: {e}")))?;
        debug!(rounds = self.n_estimators, rows = y.len(), "fitted boosted regressor");
        Ok(Learner::Boosted(model))
    }
}
