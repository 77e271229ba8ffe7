//! Feralyx command-line tool
//!
//! Generates synthetic datasets, trains and persists pipelines, and runs
//! single predictions against stored models.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use feralyx_core::{serialization::canonical_json_string, PipelineKind, Record};
use feralyx_trainer::{
    dataset_file, generate_datasets, model_file, predict_from_file, train_model_from_csv,
    TrainingConfig, Variant,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "feralyx")]
#[command(author = "Feralyx Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Seeded training and prediction for Feralyx agronomy pipelines", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the synthetic irrigation, disease, export and parcel datasets
    Generate {
        /// Output directory for the CSV files
        #[arg(short, long, default_value = "data")]
        out: PathBuf,

        /// Random seed for every generator
        #[arg(long, default_value = "42")]
        seed: u64,
    },
    /// Train one pipeline, or all of them, and save the models
    Train {
        /// Pipeline to train
        #[arg(value_enum)]
        target: TrainTarget,

        /// Directory holding the dataset CSV files
        #[arg(short, long, default_value = "data")]
        data: PathBuf,

        /// Explicit dataset path (single pipeline only)
        #[arg(short, long, conflicts_with = "data")]
        input: Option<PathBuf>,

        /// Output directory for models and hashes
        #[arg(short, long, default_value = "models")]
        out: PathBuf,

        /// Model preset
        #[arg(long, value_enum)]
        variant: Option<Variant>,

        /// TOML training configuration layered over the preset
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed applied to every pipeline section
        #[arg(long)]
        seed: Option<u64>,

        /// Also write the training report next to each model
        #[arg(long)]
        report: bool,
    },
    /// Predict one observation with a stored model
    Predict {
        /// Stored model path
        #[arg(short, long)]
        model: PathBuf,

        /// Observation as a JSON object
        #[arg(short, long, conflicts_with = "input_file")]
        input: Option<String>,

        /// File holding the observation JSON object
        #[arg(long)]
        input_file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TrainTarget {
    Irrigation,
    Disease,
    Export,
    Parcel,
    All,
}

impl TrainTarget {
    fn kinds(self) -> Vec<PipelineKind> {
        match self {
            TrainTarget::Irrigation => vec![PipelineKind::Irrigation],
            TrainTarget::Disease => vec![PipelineKind::Disease],
            TrainTarget::Export => vec![PipelineKind::Export],
            TrainTarget::Parcel => vec![PipelineKind::Parcel],
            TrainTarget::All => vec![
                PipelineKind::Irrigation,
                PipelineKind::Disease,
                PipelineKind::Export,
                PipelineKind::Parcel,
            ],
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    info!("Feralyx v{}", feralyx_trainer::VERSION);
    info!("═══════════════════════════════════════════");

    match cli.command {
        Commands::Generate { out, seed } => generate(&out, seed),
        Commands::Train {
            target,
            data,
            input,
            out,
            variant,
            config,
            seed,
            report,
        } => {
            let config = load_config(config.as_deref(), variant, seed)?;
            let kinds = target.kinds();
            if input.is_some() && kinds.len() > 1 {
                bail!("--input names a single dataset; pick one pipeline instead of 'all'");
            }
            for kind in kinds {
                let dataset = input.clone().unwrap_or_else(|| data.join(dataset_file(kind)));
                train(kind, &dataset, &out, &config, report)?;
            }
            Ok(())
        }
        Commands::Predict {
            model,
            input,
            input_file,
        } => predict(&model, input, input_file.as_deref()),
    }
}

fn generate(out: &Path, seed: u64) -> Result<()> {
    info!("Generating datasets with seed: {}", seed);
    let written = generate_datasets(out, seed).context("Failed to generate datasets")?;
    info!("═══════════════════════════════════════════");
    for path in written {
        info!("  {}", path.display());
    }
    Ok(())
}

fn load_config(path: Option<&Path>, variant: Option<Variant>, seed: Option<u64>) -> Result<TrainingConfig> {
    let config = match path {
        Some(path) => TrainingConfig::load_from_file(path, variant)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => TrainingConfig::preset(variant.unwrap_or_default()),
    };
    let config = match seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    };
    config.validate().context("Invalid training configuration")?;
    info!("Training variant: {}", config.variant);
    Ok(config)
}

fn train(kind: PipelineKind, dataset: &Path, out: &Path, config: &TrainingConfig, write_report: bool) -> Result<()> {
    info!("═══════════════════════════════════════════");
    info!("Training {} pipeline from: {}", kind, dataset.display());

    let model_path = out.join(model_file(kind));
    let outcome = train_model_from_csv(kind, dataset, config, &model_path)
        .with_context(|| format!("Failed to train {kind} pipeline"))?;

    info!("Training complete!");
    info!("  Model: {}", outcome.artifact.path.display());
    info!("  Hash file: {}", outcome.artifact.hash_path.display());
    info!("  Model hash: {}", outcome.artifact.hash);

    let report = serde_json::to_string_pretty(&outcome.report).context("Failed to serialize report")?;
    if write_report {
        let report_path = out.join(format!("{kind}_report.json"));
        fs::write(&report_path, &report)
            .with_context(|| format!("Failed to write report {}", report_path.display()))?;
        info!("  Report: {}", report_path.display());
    }
    println!("{report}");
    Ok(())
}

fn predict(model: &Path, input: Option<String>, input_file: Option<&Path>) -> Result<()> {
    let raw = match (input, input_file) {
        (Some(json), _) => json,
        (None, Some(path)) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        (None, None) => bail!("provide the observation with --input or --input-file"),
    };
    let record: Record = serde_json::from_str(&raw).context("Observation must be a JSON object of numbers and strings")?;

    let (kind, prediction) =
        predict_from_file(model, &record).with_context(|| format!("Failed to predict with {}", model.display()))?;
    info!("Prediction from {} pipeline", kind);
    println!("{}", canonical_json_string(&prediction).context("Failed to serialize prediction")?);
    Ok(())
}
