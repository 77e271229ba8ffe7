//! Encoder/scaler bank bound to an ordered feature list
//!
//! `Preprocessor` owns everything needed to turn one raw observation into the
//! standardized vector a fitted model expects: optional feature derivation,
//! one label encoder per categorical column, the ordered feature names, and
//! the scaler. It is fitted once and only ever used in transform mode after.

use crate::encoding::{LabelEncoder, StandardScaler};
use crate::errors::{AgroError, Result};
use crate::features::FeatureSet;
use crate::record::{Record, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Name of the numeric column emitted for an encoded categorical column
pub fn encoded_name(column: &str) -> String {
    format!("{column}_encoded")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    features: Option<FeatureSet>,
    encoders: BTreeMap<String, LabelEncoder>,
    feature_names: Vec<String>,
    scaler: StandardScaler,
}

impl Preprocessor {
    /// Fit encoders on `categorical` columns and the scaler on `feature_names`.
    ///
    /// `feature_names` may refer to base columns, derived columns of
    /// `features`, and `<column>_encoded` names for the categorical columns.
    pub fn fit(
        table: &Table,
        features: Option<FeatureSet>,
        categorical: &[&str],
        feature_names: Vec<String>,
    ) -> Result<Self> {
        table.require_columns(categorical)?;

        let mut encoders = BTreeMap::new();
        for column in categorical {
            let encoder = LabelEncoder::fit(*column, table.label_column(column)?)?;
            debug!(column = *column, classes = encoder.len(), "fitted label encoder");
            encoders.insert((*column).to_string(), encoder);
        }

        let raw = table
            .rows
            .iter()
            .map(|row| {
                let prepared = prepare_with(features, &encoders, row)?;
                vectorize_with(&feature_names, &prepared)
            })
            .collect::<Result<Vec<_>>>()?;
        let scaler = StandardScaler::fit(&raw)?;

        debug!(rows = raw.len(), width = feature_names.len(), "fitted feature scaler");
        Ok(Self {
            features,
            encoders,
            feature_names,
            scaler,
        })
    }

    /// Derive engineered attributes and attach encoded categorical codes
    pub fn prepare(&self, record: &Record) -> Result<Record> {
        prepare_with(self.features, &self.encoders, record)
    }

    /// Ordered raw (unscaled) feature vector of a prepared record
    pub fn vectorize(&self, prepared: &Record) -> Result<Vec<f64>> {
        vectorize_with(&self.feature_names, prepared)
    }

    /// Full transform-only path: derive, encode, order, standardize
    pub fn transform(&self, record: &Record) -> Result<Vec<f64>> {
        let prepared = self.prepare(record)?;
        let raw = self.vectorize(&prepared)?;
        self.scaler.transform(&raw)
    }

    pub fn transform_table(&self, table: &Table) -> Result<Vec<Vec<f64>>> {
        table.rows.iter().map(|row| self.transform(row)).collect()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature_set(&self) -> Option<FeatureSet> {
        self.features
    }

    pub fn encoder(&self, column: &str) -> Option<&LabelEncoder> {
        self.encoders.get(column)
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Check internal consistency after deserialization
    pub fn validate(&self) -> Result<()> {
        if self.scaler.width() != self.feature_names.len() {
            return Err(AgroError::FeatureWidthMismatch {
                expected: self.feature_names.len(),
                actual: self.scaler.width(),
            });
        }
        Ok(())
    }
}

fn prepare_with(
    features: Option<FeatureSet>,
    encoders: &BTreeMap<String, LabelEncoder>,
    record: &Record,
) -> Result<Record> {
    let mut out = match features {
        Some(set) => set.derive(record)?,
        None => record.clone(),
    };
    for (column, encoder) in encoders {
        let label = record.label(column)?;
        let code = encoder.transform(&label)?;
        out.insert(encoded_name(column), code as f64);
    }
    Ok(out)
}

fn vectorize_with(feature_names: &[String], prepared: &Record) -> Result<Vec<f64>> {
    feature_names.iter().map(|name| prepared.number(name)).collect()
}
