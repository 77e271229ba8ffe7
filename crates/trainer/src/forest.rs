//! Random-forest estimators
//!
//! Hyper-parameters map onto smartcore's random forest regressor. The forest
//! seed drives bootstrap sampling and split-feature draws, so the same seed
//! over the same rows grows the same trees.

use crate::errors::{Result, TrainerError};
use feralyx_core::ensemble::ForestEstimator;
use feralyx_core::Learner;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::RandomForestRegressorParameters;
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` leaves smartcore's √features default
    pub max_features: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

/// smartcore counts depth in `u16`
pub(crate) fn tree_depth(depth: usize) -> u16 {
    u16::try_from(depth).unwrap_or(u16::MAX)
}

impl ForestConfig {
    pub fn new(n_trees: usize, max_depth: Option<usize>, min_samples_split: usize) -> Self {
        Self {
            n_trees,
            max_depth,
            min_samples_split,
            ..Self::default()
        }
    }

    pub fn parameters(&self, seed: u64) -> RandomForestRegressorParameters {
        let mut params = RandomForestRegressorParameters::default()
            .with_n_trees(self.n_trees)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_seed(seed);
        if let Some(depth) = self.max_depth {
            params = params.with_max_depth(tree_depth(depth));
        }
        if let Some(m) = self.max_features {
            params = params.with_m(m);
        }
        params
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(TrainerError::Config("forest needs at least one tree".into()));
        }
        if self.min_samples_split < 2 {
            return Err(TrainerError::Config(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        Ok(())
    }

    /// Fit one forest on a single target column
    pub fn fit(&self, x: &DenseMatrix<f64>, y: &[f64], seed: u64) -> Result<Learner> {
        self.validate()?;
        let forest = ForestEstimator::fit(x, &y.to_vec(), self.parameters(seed))
            .map_err(|e| TrainerError::Training(format!("random forest fit failed: {e}")))?;
        debug!(trees = self.n_trees, rows = y.len(), "fitted random forest");
        Ok(Learner::Forest(forest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feralyx_core::{design_matrix, RegressionModel};

    fn linear() -> (DenseMatrix<f64>, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y = (0..60).map(|i| 2.0 * i as f64).collect();
        (design_matrix(&rows).unwrap(), y)
    }

    #[test]
    fn forest_tracks_a_linear_target() {
        let (x, y) = linear();
        let config = ForestConfig {
            max_features: Some(2),
            ..ForestConfig::new(20, None, 2)
        };
        let model = RegressionModel::new(2, vec![config.fit(&x, &y, 1).unwrap()]);
        let out = model.predict(&[30.0, 0.0]).unwrap();
        assert!((out[0] - 60.0).abs() < 8.0, "predicted {}", out[0]);
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = linear();
        let config = ForestConfig::new(5, Some(4), 2);
        let first = serde_json::to_string(&config.fit(&x, &y, 9).unwrap()).unwrap();
        let second = serde_json::to_string(&config.fit(&x, &y, 9).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parameters_carry_the_config() {
        let params = ForestConfig::new(200, Some(15), 5).parameters(42);
        assert_eq!(params.n_trees, 200);
        assert_eq!(params.max_depth, Some(15));
        assert_eq!(params.min_samples_split, 5);
        assert_eq!(params.seed, 42);
        assert_eq!(params.m, None);
    }

    #[test]
    fn degenerate_configs_are_rejected() {
        let (x, y) = linear();
        let err = ForestConfig::new(0, None, 2).fit(&x, &y, 0).unwrap_err();
        assert!(matches!(err, TrainerError::Config(_)));
        assert!(ForestConfig::new(10, None, 1).validate().is_err());
    }
}
