//! Seeded synthetic datasets for every pipeline
//!
//! Rows follow fixed agronomic rules so the generated tables are learnable
//! and the same seed always yields the same CSV.

use crate::errors::{Result, TrainerError};
use feralyx_core::pipeline::{
    country_bounds, land_price, recommend_crop, COUNTRY_COLUMN, CROP_COLUMN, DECISION_COLUMN,
    DISEASE_COLUMN,
};
use feralyx_core::{Record, Table};
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};

pub const IRRIGATION_ROWS: usize = 800;
pub const DISEASE_ROWS: usize = 500;
pub const EXPORT_ROWS: usize = 300;
pub const PARCEL_ROWS: usize = 1000;

pub const SOIL_TYPES: [&str; 3] = ["argileux", "sableux", "limoneux"];
pub const REGIONS: [&str; 3] = ["nord", "centre", "sud"];
pub const COUNTRIES: [&str; 4] = ["tunisie", "france", "italie", "espagne"];
pub const DISEASES: [&str; 5] = ["sain", "oïdium", "rouille", "mildiou", "carence_azote"];
pub const EXPORT_MARKETS: [&str; 5] = ["France", "Italie", "Espagne", "Allemagne", "Pays-Bas"];

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn pick<'a>(rng: &mut StdRng, options: &[&'a str]) -> &'a str {
    options.choose(rng).copied().unwrap_or_default()
}

/// Draw from `options` with the given weights
fn pick_weighted<'a>(rng: &mut StdRng, options: &[&'a str], weights: &[f64]) -> Result<&'a str> {
    let dist = WeightedIndex::new(weights)
        .map_err(|e| TrainerError::Dataset(format!("invalid weights: {e}")))?;
    Ok(options[dist.sample(rng)])
}

fn normal(std: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std).map_err(|e| TrainerError::Dataset(format!("noise distribution: {e}")))
}

fn exponential(mean: f64) -> Result<Exp<f64>> {
    Exp::new(1.0 / mean).map_err(|e| TrainerError::Dataset(format!("exponential distribution: {e}")))
}

/// Additive need score; irrigate at 4 or more
fn irrigation_score(humidity: f64, temperature: f64, rain: f64, sun: f64) -> u32 {
    let mut score = 0;
    score += if humidity < 30.0 {
        3
    } else if humidity < 50.0 {
        1
    } else {
        0
    };
    score += if temperature > 30.0 {
        2
    } else if temperature > 25.0 {
        1
    } else {
        0
    };
    score += if rain < 5.0 {
        2
    } else if rain < 10.0 {
        1
    } else {
        0
    };
    if sun > 8.0 {
        score += 1;
    }
    score
}

/// Sensor readings with an irrigation decision and, for positives, flow
/// rate (L/min) and duration (minutes)
pub fn irrigation(n: usize, seed: u64) -> Result<Table> {
    let mut rng = StdRng::seed_from_u64(seed);
    let flow_noise = normal(0.3)?;
    let duration_noise = normal(5.0)?;

    let rows = (0..n)
        .map(|_| {
            let humidity = rng.gen_range(5.0..95.0);
            let temperature = rng.gen_range(10.0..45.0);
            let soil = pick(&mut rng, &SOIL_TYPES);
            let ph = rng.gen_range(4.5..8.5);
            let sun = rng.gen_range(0.0..12.0);
            let age = rng.gen_range(1..180) as f64;
            let rain = rng.gen_range(0.0..50.0);

            let (decision, flow, duration) = if irrigation_score(humidity, temperature, rain, sun) >= 4 {
                let (mut flow, mut duration) = (2.0, 30.0);
                match soil {
                    "sableux" => {
                        flow *= 1.3;
                        duration *= 0.8;
                    }
                    "argileux" => {
                        flow *= 0.7;
                        duration *= 1.2;
                    }
                    _ => {}
                }
                let boost = if humidity < 15.0 {
                    1.5
                } else if humidity < 30.0 {
                    1.2
                } else {
                    1.0
                };
                flow = (flow * boost + flow_noise.sample(&mut rng)).clamp(0.5, 5.0);
                duration = (duration * boost + duration_noise.sample(&mut rng)).clamp(10.0, 120.0);
                (1.0, flow, duration)
            } else {
                (0.0, 0.0, 0.0)
            };

            Record::new()
                .with("humidite", humidity)
                .with("temperature", temperature)
                .with("type_sol", soil)
                .with("ph", ph)
                .with("ensoleillement", sun)
                .with("age_culture", age)
                .with("precipitation_prevue", rain)
                .with(DECISION_COLUMN, decision)
                .with("debit_eau", flow)
                .with("duree_minutes", duration)
        })
        .collect();

    Ok(Table::new(
        columns(&[
            "humidite",
            "temperature",
            "type_sol",
            "ph",
            "ensoleillement",
            "age_culture",
            "precipitation_prevue",
            DECISION_COLUMN,
            "debit_eau",
            "duree_minutes",
        ]),
        rows,
    ))
}

/// Leaf readings labelled with one of [`DISEASES`]
///
/// `couleur` is numeric: 0 green, 1 yellow, 2 brown.
pub fn disease(n: usize, seed: u64) -> Result<Table> {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = (0..n)
        .map(|_| {
            let label = pick(&mut rng, &DISEASES);
            // temperature, humidity, stress, pH and growth ranges per label
            let (temp, hum, stress, ph, growth) = match label {
                "sain" => ((18.0, 28.0), (40.0, 70.0), (0.0, 30.0), (6.0, 7.5), (5.0, 20.0)),
                "oïdium" => ((20.0, 30.0), (60.0, 90.0), (20.0, 60.0), (6.5, 8.0), (-5.0, 5.0)),
                "rouille" => ((15.0, 25.0), (70.0, 95.0), (30.0, 70.0), (5.5, 7.0), (-10.0, 3.0)),
                "mildiou" => ((12.0, 22.0), (80.0, 100.0), (40.0, 80.0), (5.0, 6.5), (-15.0, 0.0)),
                _ => ((15.0, 30.0), (30.0, 70.0), (10.0, 50.0), (7.0, 8.5), (-8.0, 2.0)),
            };
            let colour = match label {
                "sain" => 0.0,
                "oïdium" => rng.gen_range(0..=1) as f64,
                "rouille" => rng.gen_range(1..=2) as f64,
                "mildiou" => 2.0,
                _ => 1.0,
            };
            let mut uniform = |(lo, hi): (f64, f64)| rng.gen_range(lo..hi);
            Record::new()
                .with("temperature_feuille", uniform(temp))
                .with("humidite_feuille", uniform(hum))
                .with("couleur", colour)
                .with("stress_hydrique", uniform(stress))
                .with("ph_sol", uniform(ph))
                .with("croissance_pct", uniform(growth))
                .with(DISEASE_COLUMN, label)
        })
        .collect();

    Ok(Table::new(
        columns(&[
            "temperature_feuille",
            "humidite_feuille",
            "couleur",
            "stress_hydrique",
            "ph_sol",
            "croissance_pct",
            DISEASE_COLUMN,
        ]),
        rows,
    ))
}

/// Site attributes with the crop grown and the market it was sold to
pub fn export(n: usize, seed: u64) -> Result<Table> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n);
    for _ in 0..n {
        let soil = pick(&mut rng, &SOIL_TYPES);
        let region = pick(&mut rng, &REGIONS);
        let budget = rng.gen_range(5_000.0..100_000.0);
        let surface = rng.gen_range(0.5..20.0);

        let crop = match soil {
            "argileux" => pick_weighted(&mut rng, &["ble", "mais", "tomate"], &[0.4, 0.4, 0.2])?,
            "sableux" => pick_weighted(&mut rng, &["pomme_de_terre", "vigne"], &[0.6, 0.4])?,
            _ => pick_weighted(&mut rng, &["tomate", "mais", "olivier"], &[0.4, 0.3, 0.3])?,
        };
        let economics = feralyx_core::pipeline::crop_economics(crop);
        let harvest = economics.yield_per_ha * surface * rng.gen_range(0.8..1.2);

        let market = if matches!(crop, "olivier" | "vigne") {
            pick_weighted(&mut rng, &["France", "Italie", "Espagne"], &[0.4, 0.4, 0.2])?
        } else {
            pick(&mut rng, &EXPORT_MARKETS)
        };

        let gross = harvest * economics.price_per_tonne * rng.gen_range(0.9..1.3);
        let net = gross * (1.0 - rng.gen_range(0.3..0.5));

        rows.push(
            Record::new()
                .with("type_sol", soil)
                .with("region", region)
                .with("budget", budget)
                .with("surface", surface)
                .with("recolte_prevue", harvest)
                .with(CROP_COLUMN, crop)
                .with(COUNTRY_COLUMN, market)
                .with("gain_brut", gross)
                .with("gain_net", net),
        );
    }

    Ok(Table::new(
        columns(&[
            "type_sol",
            "region",
            "budget",
            "surface",
            "recolte_prevue",
            CROP_COLUMN,
            COUNTRY_COLUMN,
            "gain_brut",
            "gain_net",
        ]),
        rows,
    ))
}

/// Fertility score (0 to 100) from spectral and terrain attributes
pub fn parcel_fertility(ndvi: f64, ndwi: f64, soil_texture: f64, temp_surface: f64, slope: f64, distance_water: f64) -> f64 {
    let score = ndvi * 30.0
        + (1.0 - (ndwi - 0.3).abs() / 0.7) * 20.0
        + (1.0 - soil_texture) * 15.0
        + (40.0 - temp_surface).max(0.0) / 40.0 * 15.0
        + (20.0 - slope).max(0.0) / 20.0 * 10.0
        + (10.0 - distance_water).max(0.0) / 10.0 * 10.0;
    score.clamp(0.0, 100.0)
}

/// Investment opportunity score (0 to 100)
pub fn parcel_opportunity(fertility: f64, distance_road: f64, distance_water: f64, surface: f64, ndvi: f64) -> f64 {
    let healthy = if ndvi > 0.6 { 15.0 } else { 0.0 };
    let score = fertility * 0.4
        + (1.0 - distance_road / 20.0) * 20.0
        + (1.0 - distance_water / 20.0) * 15.0
        + surface / 50.0 * 10.0
        + healthy;
    score.clamp(0.0, 100.0)
}

/// Simulated satellite parcels with fertility, land value and opportunity
pub fn parcels(n: usize, seed: u64) -> Result<Table> {
    let mut rng = StdRng::seed_from_u64(seed);
    let slope_dist = exponential(5.0)?;
    let water_dist = exponential(10.0)?;
    let road_dist = exponential(3.0)?;

    let mut rows = Vec::with_capacity(n);
    for _ in 0..n {
        let country = pick(&mut rng, &COUNTRIES);
        let region = pick(&mut rng, &REGIONS);
        let bounds = country_bounds(country)?;
        let lat = rng.gen_range(bounds.lat_min..bounds.lat_max);
        let lon = rng.gen_range(bounds.lon_min..bounds.lon_max);

        let ndvi = rng.gen_range(-0.2..0.95);
        let ndwi = rng.gen_range(-0.3..0.8);
        let temp_surface = rng.gen_range(15.0..45.0);
        let albedo = rng.gen_range(0.1..0.4);
        let soil_texture = rng.gen_range(0.0..1.0);
        let slope = slope_dist.sample(&mut rng);
        let altitude = rng.gen_range(0.0..800.0);
        let distance_water = water_dist.sample(&mut rng);
        let distance_road = road_dist.sample(&mut rng);
        let surface = rng.gen_range(0.5..50.0);

        let fertility = parcel_fertility(ndvi, ndwi, soil_texture, temp_surface, slope, distance_water);
        let value_per_ha = land_price(country, region)? * (0.5 + fertility / 100.0);
        let opportunity = parcel_opportunity(fertility, distance_road, distance_water, surface, ndvi);

        let crop = recommend_crop(ndvi, fertility, temp_surface, distance_water, altitude);

        rows.push(
            Record::new()
                .with("pays", country)
                .with("region", region)
                .with("lat", lat)
                .with("lon", lon)
                .with("ndvi", ndvi)
                .with("ndwi", ndwi)
                .with("temp_surface", temp_surface)
                .with("albedo", albedo)
                .with("soil_texture", soil_texture)
                .with("slope", slope)
                .with("altitude", altitude)
                .with("distance_water", distance_water)
                .with("distance_road", distance_road)
                .with("surface", surface)
                .with("fertility", fertility)
                .with("value_per_ha", value_per_ha)
                .with("opportunity_score", opportunity)
                .with("culture_recommandee", crop),
        );
    }

    Ok(Table::new(
        columns(&[
            "pays",
            "region",
            "lat",
            "lon",
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
            "fertility",
            "value_per_ha",
            "opportunity_score",
            "culture_recommandee",
        ]),
        rows,
    ))
}
