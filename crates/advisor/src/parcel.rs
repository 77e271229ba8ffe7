//! Satellite parcel assessment
//!
//! A [`SpectralIndexProvider`] summarizes the imagery over a parcel; the
//! summary is enriched with terrain estimates into a [`ParcelObservation`],
//! scored by a fitted [`ParcelPipeline`] and turned into an investment
//! assessment by fixed agronomic rules.

use crate::errors::{AdvisorError, Result};
use chrono::{DateTime, Datelike, Utc};
use feralyx_core::pipeline::{country_bounds, recommend_crop, round_to, Pipeline};
use feralyx_core::{ParcelPipeline, ParcelScores, Record};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Kilometres per degree of latitude
const KM_PER_DEGREE: f64 = 111.0;

/// Yearly operating cost as a share of the acquisition cost
pub const OPERATING_COST_RATE: f64 = 0.08;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Square of side `size_km` centred on `center`
    pub fn around(center: Coordinates, size_km: f64) -> Self {
        let half = size_km / KM_PER_DEGREE / 2.0;
        Self {
            min_lon: center.lon - half,
            min_lat: center.lat - half,
            max_lon: center.lon + half,
            max_lat: center.lat + half,
        }
    }

    pub fn center(&self) -> Coordinates {
        Coordinates {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lon: (self.min_lon + self.max_lon) / 2.0,
        }
    }
}

/// Mean reflectances and indices over a bounding box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralSummary {
    pub ndvi: f64,
    pub ndwi: f64,
    /// Moisture index
    pub ndmi: f64,
    pub blue: f64,
    pub green: f64,
    pub red: f64,
    pub nir: f64,
    pub swir1: f64,
    pub swir2: f64,
    pub source: String,
}

/// Source of spectral summaries, e.g. a satellite imagery service
pub trait SpectralIndexProvider {
    fn summarize(&self, bbox: &BoundingBox) -> Result<SpectralSummary>;
}

/// Seed shared by every value simulated for one location
fn location_seed(center: Coordinates) -> u64 {
    (center.lat * 1000.0 + center.lon * 1000.0).rem_euclid(1_000_000.0) as u64
}

fn normal(std: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std).map_err(|e| AdvisorError::InvalidInput(format!("noise distribution: {e}")))
}

fn exponential(mean: f64) -> Result<Exp<f64>> {
    Exp::new(1.0 / mean).map_err(|e| AdvisorError::InvalidInput(format!("exponential distribution: {e}")))
}

/// Plausible summaries derived deterministically from the location
///
/// Vegetation peaks around 35°N and fades with distance from it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedIndexProvider;

impl SpectralIndexProvider for SimulatedIndexProvider {
    fn summarize(&self, bbox: &BoundingBox) -> Result<SpectralSummary> {
        let center = bbox.center();
        let mut rng = StdRng::seed_from_u64(location_seed(center));
        let noise = normal(0.1)?;

        let ndvi = (0.7 - (center.lat - 35.0).abs() * 0.02 + noise.sample(&mut rng)).clamp(-0.2, 0.95);
        let ndwi = rng.gen_range(0.2..0.6);
        let ndmi = (ndvi * 0.8 + noise.sample(&mut rng)).clamp(-0.2, 0.8);
        Ok(SpectralSummary {
            ndvi,
            ndwi,
            ndmi,
            blue: rng.gen_range(0.05..0.15),
            green: rng.gen_range(0.08..0.18),
            red: rng.gen_range(0.06..0.16),
            nir: rng.gen_range(0.25..0.45),
            swir1: rng.gen_range(0.15..0.30),
            swir2: rng.gen_range(0.10..0.25),
            source: "simulation".to_string(),
        })
    }
}

/// Model inputs for one parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelObservation {
    pub country: String,
    pub region: String,
    pub ndvi: f64,
    pub ndwi: f64,
    /// °C
    pub temp_surface: f64,
    pub albedo: f64,
    pub soil_texture: f64,
    /// Degrees
    pub slope: f64,
    /// Metres
    pub altitude: f64,
    /// Kilometres
    pub distance_water: f64,
    /// Kilometres
    pub distance_road: f64,
    /// Hectares
    pub surface: f64,
}

impl ParcelObservation {
    pub fn to_record(&self) -> Record {
        Record::new()
            .with("pays", self.country.as_str())
            .with("region", self.region.as_str())
            .with("ndvi", self.ndvi)
            .with("ndwi", self.ndwi)
            .with("temp_surface", self.temp_surface)
            .with("albedo", self.albedo)
            .with("soil_texture", self.soil_texture)
            .with("slope", self.slope)
            .with("altitude", self.altitude)
            .with("distance_water", self.distance_water)
            .with("distance_road", self.distance_road)
            .with("surface", self.surface)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityCategory {
    Exceptional,
    Good,
    Moderate,
    Weak,
}

impl OpportunityCategory {
    pub fn from_score(score: f64) -> Self {
        if score > 80.0 {
            OpportunityCategory::Exceptional
        } else if score > 60.0 {
            OpportunityCategory::Good
        } else if score > 40.0 {
            OpportunityCategory::Moderate
        } else {
            OpportunityCategory::Weak
        }
    }
}

impl fmt::Display for OpportunityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpportunityCategory::Exceptional => "exceptional opportunity",
            OpportunityCategory::Good => "good opportunity",
            OpportunityCategory::Moderate => "moderate opportunity",
            OpportunityCategory::Weak => "weak opportunity",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelRisk {
    FarFromWater,
    SteepSlope,
    PoorRoadAccess,
    SparseVegetation,
    LowFertility,
}

impl fmt::Display for ParcelRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParcelRisk::FarFromWater => "far from water sources",
            ParcelRisk::SteepSlope => "steep terrain, mechanization is difficult",
            ParcelRisk::PoorRoadAccess => "limited road access",
            ParcelRisk::SparseVegetation => "sparse or absent vegetation",
            ParcelRisk::LowFertility => "insufficient soil fertility",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VegetationHealth {
    Excellent,
    Good,
    Average,
    Poor,
}

impl VegetationHealth {
    pub fn from_ndvi(ndvi: f64) -> Self {
        if ndvi > 0.7 {
            VegetationHealth::Excellent
        } else if ndvi > 0.5 {
            VegetationHealth::Good
        } else if ndvi > 0.3 {
            VegetationHealth::Average
        } else {
            VegetationHealth::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterAvailability {
    High,
    Medium,
    Low,
}

impl WaterAvailability {
    pub fn from_distance(distance_water: f64) -> Self {
        if distance_water < 3.0 {
            WaterAvailability::High
        } else if distance_water < 7.0 {
            WaterAvailability::Medium
        } else {
            WaterAvailability::Low
        }
    }
}

/// Expected yield (t/ha) and sale price (€/t) of the crops the parcel rules pick
fn crop_outlook(crop: &str) -> (f64, f64) {
    match crop {
        "tomate" => (55.0, 520.0),
        "ble" => (8.0, 240.0),
        "mais" => (12.0, 210.0),
        "olivier" => (2.5, 3000.0),
        _ => (35.0, 230.0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelAssessment {
    pub fertility: f64,
    /// €/ha
    pub value_per_ha: f64,
    /// Acquisition cost of the whole parcel (€)
    pub total_value: f64,
    pub opportunity_score: f64,
    pub category: OpportunityCategory,
    pub recommended_crop: String,
    /// t/ha
    pub expected_yield: f64,
    pub annual_gross_gain: f64,
    pub annual_net_gain: f64,
    /// Percent of the acquisition cost
    pub annual_roi: f64,
    /// Empty when no major risk applies
    pub risks: Vec<ParcelRisk>,
    pub vegetation_health: VegetationHealth,
    pub water_availability: WaterAvailability,
}

/// Turn model scores into an investment assessment
pub fn assess_scores(observation: &ParcelObservation, scores: &ParcelScores) -> ParcelAssessment {
    let ParcelScores {
        fertility,
        value_per_ha,
        opportunity_score,
    } = *scores;

    let crop = recommend_crop(
        observation.ndvi,
        fertility,
        observation.temp_surface,
        observation.distance_water,
        observation.altitude,
    );
    let (expected_yield, price) = crop_outlook(crop);

    let acquisition = value_per_ha * observation.surface;
    let gross = expected_yield * observation.surface * price;
    let net = gross - acquisition * OPERATING_COST_RATE;
    let roi = if acquisition > 0.0 {
        net / acquisition * 100.0
    } else {
        0.0
    };

    let risks = [
        (observation.distance_water > 10.0, ParcelRisk::FarFromWater),
        (observation.slope > 15.0, ParcelRisk::SteepSlope),
        (observation.distance_road > 5.0, ParcelRisk::PoorRoadAccess),
        (observation.ndvi < 0.3, ParcelRisk::SparseVegetation),
        (fertility < 40.0, ParcelRisk::LowFertility),
    ]
    .into_iter()
    .filter_map(|(applies, risk)| applies.then_some(risk))
    .collect();

    ParcelAssessment {
        fertility: round_to(fertility, 1),
        value_per_ha: round_to(value_per_ha, 0),
        total_value: round_to(acquisition, 0),
        opportunity_score: round_to(opportunity_score, 1),
        category: OpportunityCategory::from_score(opportunity_score),
        recommended_crop: crop.to_string(),
        expected_yield,
        annual_gross_gain: round_to(gross, 0),
        annual_net_gain: round_to(net, 0),
        annual_roi: round_to(roi, 1),
        risks,
        vegetation_health: VegetationHealth::from_ndvi(observation.ndvi),
        water_availability: WaterAvailability::from_distance(observation.distance_water),
    }
}

/// Score and assess one observation
pub fn assess(pipeline: &ParcelPipeline, observation: &ParcelObservation) -> Result<ParcelAssessment> {
    let scores = pipeline.predict(&observation.to_record())?;
    Ok(assess_scores(observation, &scores))
}

/// A parcel to locate, observe and assess
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelSite {
    pub center: Coordinates,
    pub size_km: f64,
    pub country: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteAnalysis {
    pub assessment: ParcelAssessment,
    pub observation: ParcelObservation,
    pub spectral: SpectralSummary,
    pub coordinates: Coordinates,
    pub bbox: BoundingBox,
    pub analyzed_at: DateTime<Utc>,
}

/// Surface temperature from latitude, season and vegetation cover
pub fn estimate_temperature(lat: f64, month: u32, ndvi: f64) -> f64 {
    let base = if lat < 35.0 {
        32.0
    } else if lat < 42.0 {
        26.0
    } else {
        20.0
    };
    let seasonal = match month {
        6..=8 => base + 5.0,
        12 | 1 | 2 => base - 8.0,
        _ => base,
    };
    (seasonal - ndvi * 5.0).clamp(10.0, 45.0)
}

/// Analyzes sites with a spectral provider and a fitted parcel pipeline
pub struct ParcelAnalyzer<'a, S> {
    pipeline: &'a ParcelPipeline,
    provider: S,
    month: u32,
}

impl<'a, S: SpectralIndexProvider> ParcelAnalyzer<'a, S> {
    pub fn new(pipeline: &'a ParcelPipeline, provider: S) -> Self {
        Self {
            pipeline,
            provider,
            month: Utc::now().month(),
        }
    }

    /// Fix the calendar month used by the temperature estimate
    pub fn with_month(mut self, month: u32) -> Self {
        self.month = month;
        self
    }

    /// Enrich a spectral summary with terrain estimates
    ///
    /// Terrain values the imagery cannot provide are drawn from a generator
    /// seeded by the location, so one site always yields one observation.
    pub fn observe(&self, site: &ParcelSite, spectral: &SpectralSummary) -> Result<ParcelObservation> {
        let mut rng = StdRng::seed_from_u64(location_seed(site.center).wrapping_add(1));
        let lat = site.center.lat;

        let altitude = if lat > 45.0 {
            rng.gen_range(200.0..800.0)
        } else if lat < 35.0 {
            rng.gen_range(50.0..400.0)
        } else {
            rng.gen_range(0.0..600.0)
        };
        let distance_water = if spectral.ndwi > 0.5 {
            rng.gen_range(0.5..2.0)
        } else if spectral.ndwi > 0.3 {
            rng.gen_range(2.0..5.0)
        } else if spectral.ndwi > 0.1 {
            rng.gen_range(5.0..10.0)
        } else {
            rng.gen_range(10.0..20.0)
        };

        Ok(ParcelObservation {
            country: site.country.clone(),
            region: site.region.clone(),
            ndvi: spectral.ndvi,
            ndwi: spectral.ndwi,
            temp_surface: estimate_temperature(lat, self.month, spectral.ndvi),
            albedo: (spectral.red + spectral.green + spectral.blue) / 3.0,
            soil_texture: 1.0 - spectral.ndmi,
            slope: exponential(5.0)?.sample(&mut rng),
            altitude,
            distance_water,
            distance_road: exponential(3.0)?.sample(&mut rng),
            surface: site.size_km * site.size_km * 100.0,
        })
    }

    pub fn analyze(&self, site: &ParcelSite) -> Result<SiteAnalysis> {
        if !(site.size_km.is_finite() && site.size_km > 0.0) {
            return Err(AdvisorError::InvalidInput(format!(
                "parcel size must be positive, got {} km",
                site.size_km
            )));
        }
        let bbox = BoundingBox::around(site.center, site.size_km);
        let spectral = self.provider.summarize(&bbox)?;
        debug!(ndvi = spectral.ndvi, ndwi = spectral.ndwi, source = %spectral.source, "spectral summary");

        let observation = self.observe(site, &spectral)?;
        let assessment = assess(self.pipeline, &observation)?;
        info!(
            lat = site.center.lat,
            lon = site.center.lon,
            score = assessment.opportunity_score,
            category = %assessment.category,
            "analyzed parcel"
        );

        Ok(SiteAnalysis {
            assessment,
            observation,
            spectral,
            coordinates: site.center,
            bbox,
            analyzed_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub lat: f64,
    pub lon: f64,
    pub score: f64,
    pub fertility: f64,
    pub crop: String,
}

/// `n` evenly spaced values from `start` to `end` inclusive
fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 { (end - start) / (n - 1) as f64 } else { 0.0 };
    (0..n).map(move |i| start + step * i as f64)
}

/// Opportunity scores over a `resolution × resolution` lattice of `country`
///
/// Every point is a 10 ha parcel in the central region with simulated
/// spectral and terrain attributes drawn from `seed`.
pub fn opportunity_grid(
    pipeline: &ParcelPipeline,
    country: &str,
    resolution: usize,
    seed: u64,
) -> Result<Vec<GridPoint>> {
    if resolution == 0 {
        return Err(AdvisorError::InvalidInput("grid resolution must be positive".into()));
    }
    let bounds = country_bounds(country)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let slope = exponential(4.0)?;
    let water = exponential(8.0)?;
    let road = exponential(2.5)?;

    let mut points = Vec::with_capacity(resolution * resolution);
    for lat in linspace(bounds.lat_min, bounds.lat_max, resolution) {
        for lon in linspace(bounds.lon_min, bounds.lon_max, resolution) {
            let observation = ParcelObservation {
                country: country.to_string(),
                region: "centre".to_string(),
                ndvi: rng.gen_range(0.2..0.9),
                ndwi: rng.gen_range(0.1..0.7),
                temp_surface: rng.gen_range(20.0..40.0),
                albedo: rng.gen_range(0.15..0.35),
                soil_texture: rng.gen_range(0.2..0.8),
                slope: slope.sample(&mut rng),
                altitude: rng.gen_range(0.0..500.0),
                distance_water: water.sample(&mut rng),
                distance_road: road.sample(&mut rng),
                surface: 10.0,
            };
            let assessment = assess(pipeline, &observation)?;
            points.push(GridPoint {
                lat,
                lon,
                score: assessment.opportunity_score,
                fertility: assessment.fertility,
                crop: assessment.recommended_crop,
            });
        }
    }
    info!(country, points = points.len(), "scored opportunity grid");
    Ok(points)
}
