//! Feralyx advisor: decisions built on top of the fitted pipelines
//!
//! - [`market`]: rule-based export recommendation from soil, region, surface and budget
//! - [`parcel`]: satellite parcel observation, assessment and opportunity grids
//! - [`report`]: HTML report assembly
//! - [`mail`]: report delivery over a pluggable transport

pub mod config;
pub mod errors;
pub mod mail;
pub mod market;
pub mod parcel;
pub mod report;

pub use config::AdvisorConfig;
pub use errors::{AdvisorError, Result};
pub use mail::{MailConfig, Mailer, Outbox, ReportEnvelope, ReportSummary, ReportTransport};
pub use market::{recommend, ExportRecommendation, ExportRequest, Region, RiskLevel, Soil};
pub use parcel::{
    assess, opportunity_grid, BoundingBox, Coordinates, GridPoint, OpportunityCategory, ParcelAnalyzer,
    ParcelAssessment, ParcelObservation, ParcelSite, SimulatedIndexProvider, SiteAnalysis, SpectralIndexProvider,
    SpectralSummary,
};
pub use report::ReportBuilder;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
