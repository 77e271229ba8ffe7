//! Rule-based export recommendation
//!
//! Scores every affordable crop on soil compatibility, return on investment
//! and regional climate risk, then picks the best one together with the
//! export market paying the highest price for it.

use crate::errors::{AdvisorError, Result};
use feralyx_core::pipeline::round_to;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Transport cost per cultivated hectare (€)
pub const TRANSPORT_COST_PER_HA: f64 = 400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Soil {
    Argileux,
    Sableux,
    Limoneux,
}

impl Soil {
    pub fn as_str(self) -> &'static str {
        match self {
            Soil::Argileux => "argileux",
            Soil::Sableux => "sableux",
            Soil::Limoneux => "limoneux",
        }
    }
}

impl FromStr for Soil {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argileux" => Ok(Soil::Argileux),
            "sableux" => Ok(Soil::Sableux),
            "limoneux" => Ok(Soil::Limoneux),
            other => Err(AdvisorError::unknown("soil type", other)),
        }
    }
}

impl fmt::Display for Soil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Nord,
    Centre,
    Sud,
}

impl Region {
    pub fn as_str(self) -> &'static str {
        match self {
            Region::Nord => "nord",
            Region::Centre => "centre",
            Region::Sud => "sud",
        }
    }

    /// Mean temperature (°C) and annual rainfall (mm)
    pub fn climate(self) -> (f64, f64) {
        match self {
            Region::Nord => (18.0, 600.0),
            Region::Centre => (22.0, 450.0),
            Region::Sud => (26.0, 200.0),
        }
    }
}

impl FromStr for Region {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nord" => Ok(Region::Nord),
            "centre" => Ok(Region::Centre),
            "sud" => Ok(Region::Sud),
            other => Err(AdvisorError::unknown("region", other)),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agronomic and commercial profile of one crop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropMarket {
    pub crop: &'static str,
    /// Tonnes per hectare
    pub yield_per_ha: f64,
    /// € per hectare
    pub production_cost_per_ha: f64,
    /// € per tonne by destination
    pub export_prices: &'static [(&'static str, f64)],
    pub temp_range: (f64, f64),
    pub rain_range: (f64, f64),
}

impl CropMarket {
    /// Destination paying the most; the first listed wins ties
    pub fn best_market(&self) -> Option<(&'static str, f64)> {
        self.export_prices
            .iter()
            .copied()
            .fold(None, |best, (country, price)| match best {
                Some((_, top)) if top >= price => best,
                _ => Some((country, price)),
            })
    }
}

pub const MARKETS: &[CropMarket] = &[
    CropMarket {
        crop: "tomate",
        yield_per_ha: 55.0,
        production_cost_per_ha: 8000.0,
        export_prices: &[("France", 520.0), ("Allemagne", 580.0), ("Italie", 490.0), ("Espagne", 450.0)],
        temp_range: (15.0, 35.0),
        rain_range: (400.0, 800.0),
    },
    CropMarket {
        crop: "pomme_de_terre",
        yield_per_ha: 35.0,
        production_cost_per_ha: 4500.0,
        export_prices: &[("France", 220.0), ("Allemagne", 240.0), ("Belgique", 230.0), ("Pays-Bas", 250.0)],
        temp_range: (10.0, 25.0),
        rain_range: (500.0, 700.0),
    },
    CropMarket {
        crop: "mais",
        yield_per_ha: 12.0,
        production_cost_per_ha: 3000.0,
        export_prices: &[("France", 200.0), ("Allemagne", 220.0), ("Italie", 210.0), ("Espagne", 190.0)],
        temp_range: (18.0, 32.0),
        rain_range: (450.0, 650.0),
    },
    CropMarket {
        crop: "ble",
        yield_per_ha: 8.0,
        production_cost_per_ha: 2500.0,
        export_prices: &[("France", 240.0), ("Allemagne", 250.0), ("Italie", 235.0), ("Belgique", 245.0)],
        temp_range: (12.0, 28.0),
        rain_range: (400.0, 600.0),
    },
    CropMarket {
        crop: "olivier",
        yield_per_ha: 2.5,
        production_cost_per_ha: 6000.0,
        export_prices: &[("Italie", 3200.0), ("France", 3000.0), ("Espagne", 2800.0), ("Grèce", 2900.0)],
        temp_range: (14.0, 38.0),
        rain_range: (300.0, 600.0),
    },
    CropMarket {
        crop: "vigne",
        yield_per_ha: 9.0,
        production_cost_per_ha: 12000.0,
        export_prices: &[("France", 2800.0), ("Italie", 2600.0), ("Allemagne", 2900.0), ("Suisse", 3200.0)],
        temp_range: (15.0, 35.0),
        rain_range: (500.0, 800.0),
    },
];

/// Suitability (0 to 100) of `crop` on `soil`
pub fn soil_compatibility(soil: Soil, crop: &str) -> f64 {
    let table: [f64; 6] = match soil {
        Soil::Argileux => [85.0, 60.0, 90.0, 95.0, 50.0, 70.0],
        Soil::Sableux => [60.0, 90.0, 70.0, 65.0, 75.0, 85.0],
        Soil::Limoneux => [95.0, 85.0, 80.0, 90.0, 80.0, 88.0],
    };
    MARKETS
        .iter()
        .position(|m| m.crop == crop)
        .map_or(50.0, |i| table[i])
}

/// Yield multiplier of `crop` in `region`
pub fn region_bonus(region: Region, crop: &str) -> f64 {
    match (region, crop) {
        (Region::Nord, "ble") => 1.1,
        (Region::Nord, "pomme_de_terre") => 1.15,
        (Region::Centre, "tomate" | "mais") => 1.1,
        (Region::Centre, "ble") => 1.05,
        (Region::Sud, "olivier") => 1.2,
        (Region::Sud, "vigne") => 1.15,
        (Region::Sud, "tomate") => 1.1,
        _ => 1.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=19 => RiskLevel::Low,
            20..=49 => RiskLevel::Moderate,
            _ => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateRisk {
    /// 0 to 100
    pub score: u32,
    pub level: RiskLevel,
    pub details: Vec<String>,
}

/// Mismatch between a crop's climate needs and a region's climate
pub fn climate_risk(market: &CropMarket, region: Region) -> ClimateRisk {
    let (temperature, rainfall) = region.climate();
    let mut score = 0u32;
    let mut details = Vec::new();

    if temperature < market.temp_range.0 {
        details.push(format!("temperature too low ({temperature}°C)"));
        score += 30;
    } else if temperature > market.temp_range.1 {
        details.push(format!("temperature too high ({temperature}°C)"));
        score += 25;
    }

    if rainfall < market.rain_range.0 {
        details.push(format!("rainfall deficit ({rainfall} mm/year)"));
        score += 20;
    } else if rainfall > market.rain_range.1 {
        details.push(format!("excess rainfall ({rainfall} mm/year)"));
        score += 15;
    }

    if details.is_empty() {
        details.push("favourable conditions".to_string());
    }
    let score = score.min(100);
    ClimateRisk {
        score,
        level: RiskLevel::from_score(score),
        details,
    }
}

/// A site and the money available to farm it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub soil: Soil,
    pub region: Region,
    pub surface_ha: f64,
    pub budget_eur: f64,
}

impl ExportRequest {
    /// Parse the soil and region names, rejecting unknown ones
    pub fn parse(soil: &str, region: &str, surface_ha: f64, budget_eur: f64) -> Result<Self> {
        Ok(Self {
            soil: soil.parse()?,
            region: region.parse()?,
            surface_ha,
            budget_eur,
        })
    }

    fn validate(&self) -> Result<()> {
        if !(self.surface_ha.is_finite() && self.surface_ha > 0.0) {
            return Err(AdvisorError::InvalidInput(format!(
                "surface must be positive, got {}",
                self.surface_ha
            )));
        }
        if !(self.budget_eur.is_finite() && self.budget_eur >= 0.0) {
            return Err(AdvisorError::InvalidInput(format!(
                "budget must be non-negative, got {}",
                self.budget_eur
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecommendation {
    pub crop: String,
    pub export_country: String,
    pub gross_gain: f64,
    pub net_gain: f64,
    /// Net gain over budget, percent
    pub roi: f64,
    pub yield_tonnes: f64,
    pub production_cost: f64,
    pub transport_cost: f64,
    pub score: f64,
    pub soil_compatibility: f64,
    pub climate_risk: RiskLevel,
    pub risk_details: Vec<String>,
}

struct Candidate<'a> {
    market: &'a CropMarket,
    country: &'static str,
    gross: f64,
    net: f64,
    roi: f64,
    yield_tonnes: f64,
    cost: f64,
    transport: f64,
    soil: f64,
    risk: ClimateRisk,
    score: f64,
}

fn evaluate<'a>(market: &'a CropMarket, request: &ExportRequest) -> Option<Candidate<'a>> {
    let cost = market.production_cost_per_ha * request.surface_ha;
    if cost > request.budget_eur {
        return None;
    }
    let (country, price) = market.best_market()?;

    let soil = soil_compatibility(request.soil, market.crop);
    let risk = climate_risk(market, request.region);
    let penalty = 1.0 - f64::from(risk.score) / 200.0;
    let yield_tonnes = market.yield_per_ha * request.surface_ha * region_bonus(request.region, market.crop) * penalty;

    let gross = yield_tonnes * price;
    let transport = request.surface_ha * TRANSPORT_COST_PER_HA;
    let net = gross - cost - transport;
    let roi = if request.budget_eur > 0.0 {
        net / request.budget_eur * 100.0
    } else {
        0.0
    };
    let score = soil * 0.3 + roi * 0.5 + (100.0 - f64::from(risk.score)) * 0.2;
    debug!(crop = market.crop, score, roi, "scored crop");

    Some(Candidate {
        market,
        country,
        gross,
        net,
        roi,
        yield_tonnes,
        cost,
        transport,
        soil,
        risk,
        score,
    })
}

/// Best crop and export destination for `request`
///
/// Crops whose production cost exceeds the budget are skipped; when none is
/// affordable the error carries the cheapest total production cost.
pub fn recommend(request: &ExportRequest) -> Result<ExportRecommendation> {
    request.validate()?;

    let best = MARKETS
        .iter()
        .filter_map(|market| evaluate(market, request))
        .fold(None::<Candidate>, |best, candidate| match best {
            Some(b) if b.score >= candidate.score => Some(b),
            _ => Some(candidate),
        });

    let Some(best) = best else {
        let minimum = MARKETS
            .iter()
            .map(|m| m.production_cost_per_ha * request.surface_ha)
            .fold(f64::INFINITY, f64::min);
        return Err(AdvisorError::InsufficientBudget { minimum });
    };

    Ok(ExportRecommendation {
        crop: best.market.crop.to_string(),
        export_country: best.country.to_string(),
        gross_gain: round_to(best.gross, 2),
        net_gain: round_to(best.net, 2),
        roi: round_to(best.roi, 2),
        yield_tonnes: round_to(best.yield_tonnes, 2),
        production_cost: round_to(best.cost, 2),
        transport_cost: round_to(best.transport, 2),
        score: round_to(best.score, 1),
        soil_compatibility: best.soil,
        climate_risk: best.risk.level,
        risk_details: best.risk.details,
    })
}
