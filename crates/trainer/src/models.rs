//! Declarative model specifications
//!
//! A spec names an estimator family and its hyper-parameters; `fit` turns it
//! into one of the core inference models. Specs are what training
//! configuration files carry.
//!
//! Classifiers are fitted one-vs-rest: one smartcore regressor per class on
//! the 0/1 indicator of that class. Regressors get one estimator per output.
//! A constant target (a class absent from the rows, or the only class
//! present) is stored as a constant instead of being fitted.

use crate::boosting::BoostingConfig;
use crate::errors::{Result, TrainerError};
use crate::forest::ForestConfig;
use feralyx_core::{design_matrix, DecisionModel, Learner, OneVsRest, RegressionModel};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifierSpec {
    Forest(ForestConfig),
    Boosting(BoostingConfig),
    /// Members are fitted independently and their probabilities averaged
    SoftVote { members: Vec<ClassifierSpec> },
}

/// Estimator family used for every single-target fit of a spec
#[derive(Clone, Copy)]
enum Family<'a> {
    Forest(&'a ForestConfig),
    Boosting(&'a BoostingConfig),
}

impl Family<'_> {
    fn fit(self, x: &DenseMatrix<f64>, y: &[f64], seed: u64) -> Result<Learner> {
        if let Some(&first) = y.first() {
            if y.iter().all(|v| *v == first) {
                return Ok(Learner::Constant(first));
            }
        }
        match self {
            Family::Forest(config) => config.fit(x, y, seed),
            Family::Boosting(config) => config.fit(x, y, seed),
        }
    }
}

fn training_matrix(x: &[Vec<f64>], targets: usize, what: &str) -> Result<DenseMatrix<f64>> {
    if x.is_empty() {
        return Err(TrainerError::Training("cannot fit on zero rows".into()));
    }
    if x.len() != targets {
        return Err(TrainerError::Training(format!(
            "{} feature rows but {targets} {what}",
            x.len()
        )));
    }
    Ok(design_matrix(x)?)
}

fn fit_one_vs_rest(
    family: Family<'_>,
    x: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
    seed: u64,
) -> Result<DecisionModel> {
    let matrix = training_matrix(x, labels.len(), "labels")?;
    let classes = (0..n_classes)
        .map(|class| {
            let indicator: Vec<f64> = labels.iter().map(|&l| f64::from(u8::from(l == class))).collect();
            family.fit(&matrix, &indicator, seed.wrapping_add(class as u64))
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(n_classes, rows = x.len(), "fitted one-vs-rest classifier");
    Ok(DecisionModel::OneVsRest(OneVsRest::new(x[0].len(), classes)))
}

impl ClassifierSpec {
    pub fn fit(&self, x: &[Vec<f64>], labels: &[usize], n_classes: usize, seed: u64) -> Result<DecisionModel> {
        match self {
            ClassifierSpec::Forest(config) => fit_one_vs_rest(Family::Forest(config), x, labels, n_classes, seed),
            ClassifierSpec::Boosting(config) => {
                fit_one_vs_rest(Family::Boosting(config), x, labels, n_classes, seed)
            }
            ClassifierSpec::SoftVote { members } => {
                if members.is_empty() {
                    return Err(TrainerError::Config("soft vote needs at least one member".into()));
                }
                let fitted = members
                    .iter()
                    .enumerate()
                    .map(|(i, member)| {
                        debug!(member = i, "fitting soft-vote member");
                        member.fit(x, labels, n_classes, member_seed(seed, i))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(DecisionModel::SoftVote(fitted))
            }
        }
    }

    /// Human-readable one-line summary for logs and reports
    pub fn describe(&self) -> String {
        match self {
            ClassifierSpec::Forest(c) => format!("forest({} trees)", c.n_trees),
            ClassifierSpec::Boosting(c) => {
                format!("boosting({} rounds, lr {})", c.n_estimators, c.learning_rate)
            }
            ClassifierSpec::SoftVote { members } => format!(
                "soft_vote[{}]",
                members.iter().map(Self::describe).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegressorSpec {
    Forest(ForestConfig),
    Boosting(BoostingConfig),
}

impl RegressorSpec {
    fn family(&self) -> Family<'_> {
        match self {
            RegressorSpec::Forest(config) => Family::Forest(config),
            RegressorSpec::Boosting(config) => Family::Boosting(config),
        }
    }

    pub fn fit(&self, x: &[Vec<f64>], y: &[Vec<f64>], seed: u64) -> Result<RegressionModel> {
        let matrix = training_matrix(x, y.len(), "targets")?;
        let n_outputs = y[0].len();
        let outputs = (0..n_outputs)
            .map(|j| {
                let column: Vec<f64> = y.iter().map(|row| row[j]).collect();
                self.family().fit(&matrix, &column, seed.wrapping_add(j as u64))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RegressionModel::new(x[0].len(), outputs))
    }

    pub fn describe(&self) -> String {
        match self {
            RegressorSpec::Forest(c) => format!("forest({} trees)", c.n_trees),
            RegressorSpec::Boosting(c) => {
                format!("boosting({} rounds, lr {})", c.n_estimators, c.learning_rate)
            }
        }
    }
}

/// Members get well-separated seed streams
fn member_seed(seed: u64, member: usize) -> u64 {
    seed.wrapping_add((member as u64) << 32)
}
