//! Categorical encoding and numeric standardization
//!
//! Both transforms are fitted once on training data, persisted with the
//! pipeline, and applied in transform-only mode at inference.

use crate::errors::{AgroError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Standard deviations below this are treated as constant columns
pub const MIN_STD: f64 = 1e-12;

/// Maps categorical labels to integer codes assigned in sorted label order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    column: String,
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Learn the sorted set of labels observed in `column`
    pub fn fit<I, S>(column: impl Into<String>, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        if classes.is_empty() {
            return Err(AgroError::EmptyDataset);
        }
        Ok(Self {
            column: column.into(),
            classes: classes.into_iter().collect(),
        })
    }

    /// Code for `label`, or `UnknownCategory` when it was not seen at fit time
    pub fn transform(&self, label: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| AgroError::UnknownCategory {
                column: self.column.clone(),
                value: label.to_string(),
            })
    }

    pub fn inverse(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Per-column `(x - mean) / std` standardization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Learn per-column mean and population standard deviation
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows.first().ok_or(AgroError::EmptyDataset)?;
        let width = first.len();
        let n = rows.len() as f64;

        let mut means = vec![0.0; width];
        for row in rows {
            if row.len() != width {
                return Err(AgroError::FeatureWidthMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut scales = vec![0.0; width];
        for row in rows {
            for (i, v) in row.iter().enumerate() {
                let d = v - means[i];
                scales[i] += d * d;
            }
        }
        for s in &mut scales {
            let std = (*s / n).sqrt();
            *s = if std < MIN_STD { 1.0 } else { std };
        }

        Ok(Self { means, scales })
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.means.len() {
            return Err(AgroError::FeatureWidthMismatch {
                expected: self.means.len(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}
