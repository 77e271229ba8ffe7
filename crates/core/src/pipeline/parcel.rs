//! Satellite parcel scoring: fertility, land value and opportunity

use super::{check_width, Pipeline, PipelineKind};
use crate::ensemble::RegressionModel;
use crate::errors::{AgroError, Result};
use crate::preprocess::Preprocessor;
use crate::record::Record;
use serde::{Deserialize, Serialize};

pub const PARCEL_CATEGORICAL: &[&str] = &["pays", "region"];

pub const PARCEL_FEATURES: &[&str] = &[
    "ndvi",
    "ndwi",
    "temp_surface",
    "albedo",
    "soil_texture",
    "slope",
    "altitude",
    "distance_water",
    "distance_road",
    "surface",
    "pays_encoded",
    "region_encoded",
];

/// Reference farmland price (€/ha) by country and region
pub fn land_price(country: &str, region: &str) -> Result<f64> {
    let prices = match country {
        "tunisie" => [8_000.0, 12_000.0, 6_000.0],
        "france" => [45_000.0, 35_000.0, 55_000.0],
        "italie" => [40_000.0, 38_000.0, 28_000.0],
        "espagne" => [30_000.0, 25_000.0, 32_000.0],
        _ => {
            return Err(AgroError::UnknownCategory {
                column: "pays".into(),
                value: country.into(),
            })
        }
    };
    match region {
        "nord" => Ok(prices[0]),
        "centre" => Ok(prices[1]),
        "sud" => Ok(prices[2]),
        _ => Err(AgroError::UnknownCategory {
            column: "region".into(),
            value: region.into(),
        }),
    }
}

/// Latitude/longitude rectangle in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// Mainland bounds of each supported country
pub fn country_bounds(country: &str) -> Result<GeoBounds> {
    let (lat_min, lat_max, lon_min, lon_max) = match country {
        "tunisie" => (33.0, 37.5, 7.5, 11.5),
        "france" => (42.0, 51.0, -5.0, 8.0),
        "italie" => (36.0, 47.0, 6.0, 18.5),
        "espagne" => (36.0, 43.8, -9.3, 3.3),
        _ => {
            return Err(AgroError::UnknownCategory {
                column: "pays".into(),
                value: country.into(),
            })
        }
    };
    Ok(GeoBounds {
        lat_min,
        lat_max,
        lon_min,
        lon_max,
    })
}

/// Crop best suited to a parcel's vegetation, fertility and terrain
pub fn recommend_crop(ndvi: f64, fertility: f64, temp_surface: f64, distance_water: f64, altitude: f64) -> &'static str {
    if ndvi > 0.7 && fertility > 70.0 {
        "tomate"
    } else if ndvi > 0.5 && temp_surface < 30.0 {
        "ble"
    } else if distance_water < 5.0 && fertility > 60.0 {
        "mais"
    } else if temp_surface > 30.0 && altitude < 200.0 {
        "olivier"
    } else {
        "pomme_de_terre"
    }
}

pub const FERTILITY_COLUMN: &str = "fertility";
pub const VALUE_COLUMN: &str = "value_per_ha";
pub const OPPORTUNITY_COLUMN: &str = "opportunity_score";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParcelScores {
    /// 0 to 100
    pub fertility: f64,
    /// €/ha, never negative
    pub value_per_ha: f64,
    /// 0 to 100
    pub opportunity_score: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ParcelPipeline {
    pub preprocessor: Preprocessor,
    pub fertility: RegressionModel,
    pub value: RegressionModel,
    pub opportunity: RegressionModel,
}

fn single(model: &RegressionModel, x: &[f64]) -> Result<f64> {
    model
        .predict(x)?
        .first()
        .copied()
        .ok_or_else(|| AgroError::InvalidModel("regressor produced no output".into()))
}

impl Pipeline for ParcelPipeline {
    const KIND: PipelineKind = PipelineKind::Parcel;
    type Output = ParcelScores;

    fn predict(&self, record: &Record) -> Result<ParcelScores> {
        let x = self.preprocessor.transform(record)?;
        Ok(ParcelScores {
            fertility: single(&self.fertility, &x)?.clamp(0.0, 100.0),
            value_per_ha: single(&self.value, &x)?.max(0.0),
            opportunity_score: single(&self.opportunity, &x)?.clamp(0.0, 100.0),
        })
    }

    fn validate(&self) -> Result<()> {
        self.preprocessor.validate()?;
        let width = self.preprocessor.feature_names().len();
        for (name, model) in [
            ("fertility model", &self.fertility),
            ("value model", &self.value),
            ("opportunity model", &self.opportunity),
        ] {
            model.validate()?;
            check_width(name, width, model.n_features())?;
            if model.n_outputs() != 1 {
                return Err(AgroError::InvalidModel(format!("{name} must have one output")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::tests::boosted_learner;
    use crate::ensemble::Learner;
    use crate::record::Table;

    fn parcel(ndvi: f64) -> Record {
        let mut record = Record::new().with("pays", "tunisie").with("region", "nord");
        for (name, value) in PARCEL_FEATURES[..10].iter().zip([
            ndvi, 0.4, 28.0, 0.22, 0.4, 3.0, 150.0, 2.0, 1.5, 10.0,
        ]) {
            record.insert(*name, value);
        }
        record
    }

    fn constant(value: f64) -> RegressionModel {
        RegressionModel::new(12, vec![Learner::Constant(value)])
    }

    fn pipeline() -> ParcelPipeline {
        let table = Table::from_rows(vec![parcel(0.2), parcel(0.8)]);
        let preprocessor = Preprocessor::fit(
            &table,
            None,
            PARCEL_CATEGORICAL,
            PARCEL_FEATURES.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        // land value tracks vegetation: negative on bare soil, 9000 on green parcels
        let x = preprocessor.transform_table(&table).unwrap();
        ParcelPipeline {
            preprocessor,
            fertility: constant(130.0),
            value: RegressionModel::new(12, vec![boosted_learner(&x, &[-5.0, 9000.0])]),
            opportunity: constant(64.5),
        }
    }

    #[test]
    fn scores_are_bounded() {
        let p = pipeline();
        p.validate().unwrap();
        let scores = p.predict(&parcel(0.75)).unwrap();
        assert_eq!(scores.fertility, 100.0);
        assert!(scores.value_per_ha > 8000.0);
        assert_eq!(scores.opportunity_score, 64.5);
        assert_eq!(p.predict(&parcel(0.1)).unwrap().value_per_ha, 0.0);
    }

    #[test]
    fn land_prices_by_location() {
        assert_eq!(land_price("france", "sud").unwrap(), 55_000.0);
        assert_eq!(land_price("tunisie", "centre").unwrap(), 12_000.0);
        assert!(matches!(
            land_price("maroc", "nord"),
            Err(AgroError::UnknownCategory { ref column, .. }) if column == "pays"
        ));
        assert!(land_price("italie", "est").is_err());
    }

    #[test]
    fn crops_follow_parcel_conditions() {
        assert_eq!(recommend_crop(0.8, 75.0, 25.0, 2.0, 100.0), "tomate");
        assert_eq!(recommend_crop(0.6, 50.0, 25.0, 8.0, 100.0), "ble");
        assert_eq!(recommend_crop(0.4, 65.0, 32.0, 3.0, 500.0), "mais");
        assert_eq!(recommend_crop(0.4, 30.0, 35.0, 8.0, 100.0), "olivier");
        assert_eq!(recommend_crop(0.2, 30.0, 20.0, 12.0, 300.0), "pomme_de_terre");
        assert_eq!(country_bounds("espagne").unwrap().lon_min, -9.3);
        assert!(country_bounds("maroc").is_err());
    }

    #[test]
    fn multi_output_regressor_is_invalid_here() {
        let mut p = pipeline();
        p.opportunity = RegressionModel::new(12, vec![Learner::Constant(1.0), Learner::Constant(2.0)]);
        assert!(p.validate().is_err());
    }
}
