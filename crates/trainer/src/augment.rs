//! Gaussian-noise dataset augmentation
//!
//! The augmented table is the original rows followed by one noisy copy per
//! configured fraction. Copy `i` adds `N(0, σ_col · fraction_i)` to every
//! listed column, where `σ_col` is the sample standard deviation of that
//! column in the original rows. Labels and unlisted columns are copied as-is,
//! which assumes small perturbations never move a row across a decision
//! boundary.

use crate::errors::{Result, TrainerError};
use feralyx_core::features::{DISEASE_BASE, IRRIGATION_BASE};
use feralyx_core::{Record, Table};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentationConfig {
    /// Numeric columns that receive noise
    pub columns: Vec<String>,
    /// One noisy copy per entry, noise std as a fraction of the column std
    pub noise_fractions: Vec<f64>,
}

impl AugmentationConfig {
    /// Two copies at 10 % and 15 % over the weather/soil readings
    pub fn irrigation() -> Self {
        Self {
            columns: IRRIGATION_BASE
                .iter()
                .filter(|c| **c != "age_culture")
                .map(|c| c.to_string())
                .collect(),
            noise_fractions: vec![0.10, 0.15],
        }
    }

    /// Three copies at 10 %, 15 % and 20 % over the leaf/soil readings
    pub fn disease() -> Self {
        Self {
            columns: DISEASE_BASE.iter().map(|c| c.to_string()).collect(),
            noise_fractions: vec![0.10, 0.15, 0.20],
        }
    }

    pub fn copies(&self) -> usize {
        self.noise_fractions.len()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self
            .noise_fractions
            .iter()
            .find(|f| !f.is_finite() || **f < 0.0)
        {
            return Err(TrainerError::Config(format!("invalid noise fraction {bad}")));
        }
        Ok(())
    }
}

/// Sample (n − 1) standard deviation; zero for fewer than two values
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (n - 1.0)).sqrt()
}

/// Original rows followed by `config.copies()` noisy copies
pub fn augment(table: &Table, config: &AugmentationConfig, rng: &mut StdRng) -> Result<Table> {
    config.validate()?;
    let columns: Vec<&str> = config.columns.iter().map(String::as_str).collect();
    table.require_columns(&columns)?;

    let sigmas = columns
        .iter()
        .map(|c| Ok(sample_std(&table.numeric_column(c)?)))
        .collect::<Result<Vec<f64>>>()?;

    debug!(
        rows = table.len(),
        copies = config.copies(),
        "augmenting with label-invariant Gaussian noise"
    );

    let mut out = table.clone();
    for fraction in &config.noise_fractions {
        let noise = sigmas
            .iter()
            .map(|sigma| {
                Normal::new(0.0, sigma * fraction)
                    .map_err(|e| TrainerError::Config(format!("noise distribution: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let copy: Vec<Record> = table
            .rows
            .iter()
            .map(|row| {
                let mut noisy = row.clone();
                for ((column, dist), sigma) in columns.iter().zip(&noise).zip(&sigmas) {
                    if *sigma == 0.0 {
                        continue;
                    }
                    // numeric presence was checked above
                    if let Ok(v) = row.number(column) {
                        noisy.insert(*column, v + dist.sample(&mut *rng));
                    }
                }
                noisy
            })
            .collect();
        out.rows.extend(copy);
    }
    Ok(out)
}
