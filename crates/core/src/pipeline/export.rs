//! Crop and export-country recommendation
//!
//! Two chained classifiers: the crop is predicted from site attributes, then
//! the export country from the same attributes plus the predicted crop.
//! Gains come from fixed per-crop yield and price tables.

use super::{check_width, round_to, Pipeline, PipelineKind};
use crate::encoding::LabelEncoder;
use crate::ensemble::DecisionModel;
use crate::errors::{AgroError, Result};
use crate::preprocess::Preprocessor;
use crate::record::Record;
use serde::{Deserialize, Serialize};

pub const CROP_COLUMN: &str = "culture";
pub const COUNTRY_COLUMN: &str = "pays_export";

/// Share of the gross gain left after production and logistics costs
pub const NET_MARGIN: f64 = 0.65;

/// Categorical inputs of both classifiers
pub const SITE_CATEGORICAL: &[&str] = &["type_sol", "region"];

pub const CROP_FEATURES: &[&str] = &["type_sol_encoded", "region_encoded", "budget", "surface"];
pub const COUNTRY_FEATURES: &[&str] = &[
    "type_sol_encoded",
    "region_encoded",
    "budget",
    "surface",
    "culture_encoded",
];

/// Average yield (t/ha) and sale price (€/t) of a crop
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropEconomics {
    pub yield_per_ha: f64,
    pub price_per_tonne: f64,
}

/// Reference economics; unknown crops fall back to 10 t/ha at 300 €/t
pub fn crop_economics(crop: &str) -> CropEconomics {
    let (yield_per_ha, price_per_tonne) = match crop {
        "tomate" => (50.0, 500.0),
        "pomme_de_terre" => (30.0, 200.0),
        "mais" => (10.0, 180.0),
        "ble" => (7.0, 220.0),
        "olivier" => (2.0, 3000.0),
        "vigne" => (8.0, 2500.0),
        _ => (10.0, 300.0),
    };
    CropEconomics {
        yield_per_ha,
        price_per_tonne,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportAdvice {
    pub crop: String,
    pub country: String,
    pub gross_gain: f64,
    pub net_gain: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportPipeline {
    pub crop_inputs: Preprocessor,
    pub crop_labels: LabelEncoder,
    pub crop_model: DecisionModel,
    pub country_inputs: Preprocessor,
    pub country_labels: LabelEncoder,
    pub country_model: DecisionModel,
}

impl Pipeline for ExportPipeline {
    const KIND: PipelineKind = PipelineKind::Export;
    type Output = ExportAdvice;

    fn predict(&self, record: &Record) -> Result<ExportAdvice> {
        let surface = record.number("surface")?;

        let x = self.crop_inputs.transform(record)?;
        let crop = self
            .crop_labels
            .inverse(self.crop_model.predict(&x)?)
            .ok_or_else(|| AgroError::InvalidModel("crop class outside label set".into()))?
            .to_string();

        let with_crop = record.clone().with(CROP_COLUMN, crop.as_str());
        let x = self.country_inputs.transform(&with_crop)?;
        let country = self
            .country_labels
            .inverse(self.country_model.predict(&x)?)
            .ok_or_else(|| AgroError::InvalidModel("country class outside label set".into()))?
            .to_string();

        let economics = crop_economics(&crop);
        let gross = economics.yield_per_ha * surface * economics.price_per_tonne;
        Ok(ExportAdvice {
            crop,
            country,
            gross_gain: round_to(gross, 2),
            net_gain: round_to(gross * NET_MARGIN, 2),
        })
    }

    fn validate(&self) -> Result<()> {
        for (name, inputs, labels, model) in [
            ("crop model", &self.crop_inputs, &self.crop_labels, &self.crop_model),
            ("country model", &self.country_inputs, &self.country_labels, &self.country_model),
        ] {
            inputs.validate()?;
            model.validate()?;
            check_width(name, inputs.feature_names().len(), model.n_features())?;
            if model.n_classes() != labels.len() {
                return Err(AgroError::InvalidModel(format!(
                    "{name} has {} classes but {} labels are known",
                    model.n_classes(),
                    labels.len()
                )));
            }
        }
        Ok(())
    }
}
