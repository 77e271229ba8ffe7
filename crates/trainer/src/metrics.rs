//! Held-out evaluation metrics

use serde::{Deserialize, Serialize};

/// Fraction of matching predictions; zero for empty input
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    hits as f64 / truth.len() as f64
}

/// Coefficient of determination averaged uniformly over outputs
///
/// An output whose truth has zero variance scores 1 when predicted exactly and
/// 0 otherwise. Empty input scores 0.
pub fn r2_score(truth: &[Vec<f64>], predicted: &[Vec<f64>]) -> f64 {
    let Some(first) = truth.first() else {
        return 0.0;
    };
    let outputs = first.len();
    if outputs == 0 {
        return 0.0;
    }
    let n = truth.len() as f64;

    let mut total = 0.0;
    for j in 0..outputs {
        let mean = truth.iter().map(|row| row[j]).sum::<f64>() / n;
        let (mut ss_res, mut ss_tot) = (0.0, 0.0);
        for (t, p) in truth.iter().zip(predicted) {
            ss_res += (t[j] - p[j]).powi(2);
            ss_tot += (t[j] - mean).powi(2);
        }
        total += if ss_tot == 0.0 {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        };
    }
    total / outputs as f64
}

/// Fold scores with their mean and a 2σ spread (population deviation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvSummary {
    pub scores: Vec<f64>,
    pub mean: f64,
    pub spread: f64,
}

impl CvSummary {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        if scores.is_empty() {
            return Self {
                scores,
                mean: 0.0,
                spread: 0.0,
            };
        }
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self {
            scores,
            mean,
            spread: 2.0 * var.sqrt(),
        }
    }
}
