//! Feralyx trainer: seeded ensemble fitting for the agronomy pipelines
//!
//! Loads CSV datasets, augments and splits them reproducibly, fits smartcore
//! random forests and gradient boosting, and persists the resulting pipelines
//! through the core model store.

pub mod augment;
pub mod boosting;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod forest;
pub mod metrics;
pub mod models;
pub mod split;
pub mod synth;
pub mod trainer;

use feralyx_core::pipeline::Pipeline;
use feralyx_core::{store, PipelineKind, Record, StoredArtifact, Table};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub use config::{TrainingConfig, Variant};
pub use errors::{Result, TrainerError};
pub use models::{ClassifierSpec, RegressorSpec};
pub use trainer::{
    parse_kind, DiseaseTrainer, ExportTrainer, IrrigationTrainer, ParcelTrainer, Trained,
};

/// Conventional dataset file name for each pipeline
pub fn dataset_file(kind: PipelineKind) -> &'static str {
    match kind {
        PipelineKind::Irrigation => "irrigation_dataset.csv",
        PipelineKind::Disease => "disease_dataset.csv",
        PipelineKind::Export => "export_dataset.csv",
        PipelineKind::Parcel => "satellite_parcels.csv",
    }
}

/// Conventional model file name for each pipeline
pub fn model_file(kind: PipelineKind) -> String {
    format!("{kind}.json")
}

/// A persisted pipeline together with its training report
#[derive(Debug, Clone, Serialize)]
pub struct TrainingOutcome {
    pub kind: PipelineKind,
    pub artifact: StoredArtifact,
    pub report: serde_json::Value,
}

fn persist<P: Pipeline, R: Serialize>(trained: Trained<P, R>, output: &Path) -> Result<TrainingOutcome> {
    let artifact = store::save(&trained.pipeline, output)?;
    let report = serde_json::to_value(&trained.report)
        .map_err(|e| TrainerError::Training(format!("cannot encode report: {e}")))?;
    Ok(TrainingOutcome {
        kind: P::KIND,
        artifact,
        report,
    })
}

/// Train the `kind` pipeline on `table` and save it at `output`
pub fn train_and_save(
    kind: PipelineKind,
    table: &Table,
    config: &TrainingConfig,
    output: &Path,
) -> Result<TrainingOutcome> {
    match kind {
        PipelineKind::Irrigation => persist(
            IrrigationTrainer::new(config.irrigation.clone()).train(table)?,
            output,
        ),
        PipelineKind::Disease => persist(DiseaseTrainer::new(config.disease.clone()).train(table)?, output),
        PipelineKind::Export => persist(ExportTrainer::new(config.export.clone()).train(table)?, output),
        PipelineKind::Parcel => persist(ParcelTrainer::new(config.parcel.clone()).train(table)?, output),
    }
}

/// Train a pipeline directly from a CSV file
pub fn train_model_from_csv(
    kind: PipelineKind,
    input: &Path,
    config: &TrainingConfig,
    output: &Path,
) -> Result<TrainingOutcome> {
    let table = dataset::read_csv(input)?;
    info!(kind = %kind, rows = table.len(), input = %input.display(), "loaded dataset");
    train_and_save(kind, &table, config, output)
}

fn predict_with<P: Pipeline>(path: &Path, record: &Record) -> Result<serde_json::Value>
where
    P::Output: Serialize,
{
    let pipeline: P = store::load(path)?;
    let output = pipeline.predict(record)?;
    serde_json::to_value(output).map_err(|e| TrainerError::Training(format!("cannot encode prediction: {e}")))
}

/// Run `record` through whichever pipeline is stored at `path`
pub fn predict_from_file(path: &Path, record: &Record) -> Result<(PipelineKind, serde_json::Value)> {
    let kind = store::peek_kind(path)?;
    let value = match kind {
        PipelineKind::Irrigation => predict_with::<feralyx_core::IrrigationPipeline>(path, record)?,
        PipelineKind::Disease => predict_with::<feralyx_core::DiseasePipeline>(path, record)?,
        PipelineKind::Export => predict_with::<feralyx_core::ExportPipeline>(path, record)?,
        PipelineKind::Parcel => predict_with::<feralyx_core::ParcelPipeline>(path, record)?,
    };
    Ok((kind, value))
}

/// Write every synthetic dataset at its default size into `dir`
pub fn generate_datasets(dir: &Path, seed: u64) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let tables = [
        (PipelineKind::Irrigation, synth::irrigation(synth::IRRIGATION_ROWS, seed)?),
        (PipelineKind::Disease, synth::disease(synth::DISEASE_ROWS, seed)?),
        (PipelineKind::Export, synth::export(synth::EXPORT_ROWS, seed)?),
        (PipelineKind::Parcel, synth::parcels(synth::PARCEL_ROWS, seed)?),
    ];

    let mut written = Vec::with_capacity(tables.len());
    for (kind, table) in tables {
        let path = dir.join(dataset_file(kind));
        dataset::write_csv(&table, &path)?;
        info!(kind = %kind, rows = table.len(), path = %path.display(), "wrote dataset");
        written.push(path);
    }
    Ok(written)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
