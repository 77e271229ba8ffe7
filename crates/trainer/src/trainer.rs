//! Pipeline trainers
//!
//! Every trainer follows the same protocol: validate the table, optionally
//! augment and derive features, fit the preprocessor on the whole table, split
//! with a fixed seed (stratified for classifiers), optionally cross-validate
//! on the training side, fit, and score on the held-out side.

use crate::augment::augment;
use crate::config::{DiseaseConfig, ExportConfig, IrrigationConfig, ParcelConfig, Protocol};
use crate::errors::{Result, TrainerError};
use crate::metrics::{accuracy, r2_score, CvSummary};
use crate::models::{ClassifierSpec, RegressorSpec};
use crate::split::{stratified_k_folds, stratified_split, train_test_split, Split};
use chrono::{DateTime, Utc};
use feralyx_core::pipeline::{
    disease_feature_names, irrigation_feature_names, Pipeline, COUNTRY_COLUMN, COUNTRY_FEATURES,
    CROP_COLUMN, CROP_FEATURES, DECISION_COLUMN, DISEASE_COLUMN, FERTILITY_COLUMN,
    IRRIGATE_LABEL, OPPORTUNITY_COLUMN, PARCEL_CATEGORICAL, PARCEL_FEATURES, QUANTITY_TARGETS,
    SITE_CATEGORICAL, VALUE_COLUMN,
};
use feralyx_core::{
    DecisionModel, DiseasePipeline, ExportPipeline, FeatureSet, IrrigationPipeline, LabelEncoder,
    ParcelPipeline, PipelineKind, Preprocessor, RegressionModel, Table,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Raw columns an irrigation table must carry
pub const IRRIGATION_COLUMNS: &[&str] = &[
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
];

pub const DISEASE_COLUMNS: &[&str] = &[
    "temperature_feuille",
    "humidite_feuille",
    "couleur",
    "stress_hydrique",
    "ph_sol",
    "croissance_pct",
    DISEASE_COLUMN,
];

pub const EXPORT_COLUMNS: &[&str] = &["type_sol", "region", "budget", "surface", CROP_COLUMN, COUNTRY_COLUMN];

pub const PARCEL_COLUMNS: &[&str] = &[
    "pays",
    "region",
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
    FERTILITY_COLUMN,
    VALUE_COLUMN,
    OPPORTUNITY_COLUMN,
];

/// A fitted pipeline with the report of the run that produced it
#[derive(Debug, Clone)]
pub struct Trained<P, R> {
    pub pipeline: P,
    pub report: R,
}

/// Held-out evaluation of one classifier
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub target: String,
    pub model: String,
    /// Rows after augmentation
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub features: Vec<String>,
    pub classes: Vec<String>,
    pub accuracy: f64,
    pub cross_validation: Option<CvSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrrigationReport {
    pub decision: ClassificationReport,
    pub quantity_model: String,
    /// Positive rows available to the quantity model
    pub quantity_rows: usize,
    /// Held-out R² averaged over flow rate and duration; zero when unfit
    pub quantity_r2: f64,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiseaseReport {
    pub decision: ClassificationReport,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub crop: ClassificationReport,
    pub country: ClassificationReport,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParcelReport {
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub fertility_r2: f64,
    pub value_r2: f64,
    pub opportunity_r2: f64,
    pub trained_at: DateTime<Utc>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn rows<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

/// Encode the label column
///
/// A single distinct label is accepted; the fitted classifier then always
/// answers that label with full confidence.
fn encode_labels(table: &Table, column: &str) -> Result<(LabelEncoder, Vec<usize>)> {
    let raw = table.label_column(column)?;
    let encoder = LabelEncoder::fit(column, raw.iter().cloned())?;
    if encoder.len() < 2 {
        warn!(
            column,
            label = encoder.inverse(0).unwrap_or_default(),
            "only one distinct label; classifier will be constant"
        );
    }
    let codes = raw
        .iter()
        .map(|label| encoder.transform(label))
        .collect::<feralyx_core::Result<Vec<_>>>()?;
    Ok((encoder, codes))
}

/// Augment when configured
fn prepare_table(table: &Table, protocol: &Protocol, rng: &mut StdRng) -> Result<Table> {
    match &protocol.augmentation {
        Some(config) => {
            let augmented = augment(table, config, rng)?;
            info!(
                original = table.len(),
                augmented = augmented.len(),
                "augmented training table"
            );
            Ok(augmented)
        }
        None => Ok(table.clone()),
    }
}

/// Accuracy of `spec` over stratified folds of the training partition
fn cross_validate(
    spec: &ClassifierSpec,
    x: &[Vec<f64>],
    y: &[usize],
    n_classes: usize,
    folds: usize,
    seed: u64,
    rng: &mut StdRng,
) -> Result<CvSummary> {
    let mut scores = Vec::with_capacity(folds);
    for (i, fold) in stratified_k_folds(y, folds, rng)?.iter().enumerate() {
        let model = spec.fit(&rows(x, &fold.train), &rows(y, &fold.train), n_classes, seed)?;
        let truth = rows(y, &fold.test);
        let predicted = fold
            .test
            .iter()
            .map(|&r| model.predict(&x[r]))
            .collect::<feralyx_core::Result<Vec<_>>>()?;
        let score = accuracy(&truth, &predicted);
        debug!(fold = i, accuracy = score, "cross-validation fold");
        scores.push(score);
    }
    Ok(CvSummary::from_scores(scores))
}

struct FittedClassifier {
    model: DecisionModel,
    split: Split,
    report: ClassificationReport,
}

/// Split, optionally cross-validate, fit and score one classifier
#[allow(clippy::too_many_arguments)]
fn fit_classifier(
    target: &str,
    spec: &ClassifierSpec,
    x: &[Vec<f64>],
    y: &[usize],
    labels: &LabelEncoder,
    features: &[String],
    protocol: &Protocol,
    rng: &mut StdRng,
) -> Result<FittedClassifier> {
    let n_classes = labels.len();
    let split = stratified_split(y, protocol.test_fraction, rng)?;
    let (train_x, train_y) = (rows(x, &split.train), rows(y, &split.train));

    let cross_validation = match protocol.cv_folds {
        Some(_) if train_x.len() < 2 => {
            warn!(column = target, rows = train_x.len(), "too few training rows to cross-validate; skipped");
            None
        }
        Some(k) => {
            let folds = k.min(train_x.len());
            if folds < k {
                warn!(column = target, requested = k, folds, "fewer training rows than folds; folds reduced");
            }
            let cv = cross_validate(spec, &train_x, &train_y, n_classes, folds, protocol.seed, rng)?;
            info!(column = target, folds, mean = cv.mean, spread = cv.spread, "cross-validation accuracy");
            Some(cv)
        }
        None => None,
    };

    info!(column = target, model = %spec.describe(), rows = train_x.len(), "fitting classifier");
    let model = spec.fit(&train_x, &train_y, n_classes, protocol.seed)?;

    let truth = rows(y, &split.test);
    let predicted = split
        .test
        .iter()
        .map(|&r| model.predict(&x[r]))
        .collect::<feralyx_core::Result<Vec<_>>>()?;
    let score = accuracy(&truth, &predicted);
    info!(column = target, accuracy = score, test_rows = split.test.len(), "held-out accuracy");

    let report = ClassificationReport {
        target: target.to_string(),
        model: spec.describe(),
        rows: x.len(),
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        features: features.to_vec(),
        classes: labels.classes().to_vec(),
        accuracy: score,
        cross_validation,
    };
    Ok(FittedClassifier { model, split, report })
}

/// Fit `spec` on a seeded 80/20 split of `(x, y)` and return it with its held-out R²
fn fit_regressor(
    spec: &RegressorSpec,
    x: &[Vec<f64>],
    y: &[Vec<f64>],
    split: &Split,
    seed: u64,
) -> Result<(RegressionModel, f64)> {
    let model = spec.fit(&rows(x, &split.train), &rows(y, &split.train), seed)?;
    let truth = rows(y, &split.test);
    let predicted = split
        .test
        .iter()
        .map(|&r| model.predict(&x[r]))
        .collect::<feralyx_core::Result<Vec<_>>>()?;
    Ok((model, r2_score(&truth, &predicted)))
}

pub struct IrrigationTrainer {
    config: IrrigationConfig,
}

impl IrrigationTrainer {
    pub fn new(config: IrrigationConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(rows = table.len()))]
    pub fn train(&self, table: &Table) -> Result<Trained<IrrigationPipeline, IrrigationReport>> {
        let protocol = &self.config.protocol;
        protocol.validate("irrigation")?;
        table.require_columns(IRRIGATION_COLUMNS)?;
        let mut rng = StdRng::seed_from_u64(protocol.seed);

        let data = prepare_table(table, protocol, &mut rng)?;
        let feature_set = protocol.engineered.then_some(FeatureSet::Irrigation);
        let preprocessor = Preprocessor::fit(
            &data,
            feature_set,
            &["type_sol"],
            irrigation_feature_names(protocol.engineered),
        )?;
        let x = preprocessor.transform_table(&data)?;
        let (labels, y) = encode_labels(&data, DECISION_COLUMN)?;

        let decision = fit_classifier(
            DECISION_COLUMN,
            &self.config.decision,
            &x,
            &y,
            &labels,
            preprocessor.feature_names(),
            protocol,
            &mut rng,
        )?;

        // Quantity model: positive rows only, their own 80/20 split
        let positives: Vec<usize> = match labels.transform(IRRIGATE_LABEL) {
            Ok(code) => (0..y.len()).filter(|&i| y[i] == code).collect(),
            Err(_) => Vec::new(),
        };
        let (quantity, quantity_r2) = if positives.is_empty() {
            warn!("no positive irrigation rows; quantity model left unfit");
            (None, 0.0)
        } else {
            let qx = rows(&x, &positives);
            let qy = positives
                .iter()
                .map(|&i| {
                    QUANTITY_TARGETS
                        .iter()
                        .map(|column| data.rows[i].number(column))
                        .collect::<feralyx_core::Result<Vec<f64>>>()
                })
                .collect::<feralyx_core::Result<Vec<_>>>()?;
            let split = train_test_split(qx.len(), protocol.test_fraction, &mut rng)?;
            info!(model = %self.config.quantity.describe(), rows = split.train.len(), "fitting quantity model");
            let (model, r2) = fit_regressor(&self.config.quantity, &qx, &qy, &split, protocol.seed)?;
            info!(r2, "quantity model held-out R²");
            (Some(model), r2)
        };

        let pipeline = IrrigationPipeline {
            preprocessor,
            labels,
            decision: decision.model,
            quantity,
        };
        pipeline.validate()?;
        debug!(
            train = decision.split.train.len(),
            test = decision.split.test.len(),
            "irrigation pipeline assembled"
        );

        Ok(Trained {
            pipeline,
            report: IrrigationReport {
                decision: decision.report,
                quantity_model: self.config.quantity.describe(),
                quantity_rows: positives.len(),
                quantity_r2,
                trained_at: Utc::now(),
            },
        })
    }
}

pub struct DiseaseTrainer {
    config: DiseaseConfig,
}

impl DiseaseTrainer {
    pub fn new(config: DiseaseConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(rows = table.len()))]
    pub fn train(&self, table: &Table) -> Result<Trained<DiseasePipeline, DiseaseReport>> {
        let protocol = &self.config.protocol;
        protocol.validate("disease")?;
        table.require_columns(DISEASE_COLUMNS)?;
        let mut rng = StdRng::seed_from_u64(protocol.seed);

        let data = prepare_table(table, protocol, &mut rng)?;
        let feature_set = protocol.engineered.then_some(FeatureSet::Disease);
        let preprocessor =
            Preprocessor::fit(&data, feature_set, &[], disease_feature_names(protocol.engineered))?;
        let x = preprocessor.transform_table(&data)?;
        let (labels, y) = encode_labels(&data, DISEASE_COLUMN)?;

        let decision = fit_classifier(
            DISEASE_COLUMN,
            &self.config.decision,
            &x,
            &y,
            &labels,
            preprocessor.feature_names(),
            protocol,
            &mut rng,
        )?;

        let pipeline = DiseasePipeline {
            preprocessor,
            labels,
            decision: decision.model,
        };
        pipeline.validate()?;

        Ok(Trained {
            pipeline,
            report: DiseaseReport {
                decision: decision.report,
                trained_at: Utc::now(),
            },
        })
    }
}

pub struct ExportTrainer {
    config: ExportConfig,
}

impl ExportTrainer {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(rows = table.len()))]
    pub fn train(&self, table: &Table) -> Result<Trained<ExportPipeline, ExportReport>> {
        table.require_columns(EXPORT_COLUMNS)?;
        let protocol = Protocol {
            seed: self.config.seed,
            test_fraction: self.config.test_fraction,
            cv_folds: None,
            engineered: false,
            augmentation: None,
        };
        protocol.validate("export")?;
        let mut rng = StdRng::seed_from_u64(protocol.seed);

        let crop_inputs = Preprocessor::fit(table, None, SITE_CATEGORICAL, names(CROP_FEATURES))?;
        let crop_x = crop_inputs.transform_table(table)?;
        let (crop_labels, crop_y) = encode_labels(table, CROP_COLUMN)?;
        let crop = fit_classifier(
            CROP_COLUMN,
            &self.config.crop,
            &crop_x,
            &crop_y,
            &crop_labels,
            crop_inputs.feature_names(),
            &protocol,
            &mut rng,
        )?;

        let mut country_categorical = SITE_CATEGORICAL.to_vec();
        country_categorical.push(CROP_COLUMN);
        let country_inputs = Preprocessor::fit(table, None, &country_categorical, names(COUNTRY_FEATURES))?;
        let country_x = country_inputs.transform_table(table)?;
        let (country_labels, country_y) = encode_labels(table, COUNTRY_COLUMN)?;
        let country = fit_classifier(
            COUNTRY_COLUMN,
            &self.config.country,
            &country_x,
            &country_y,
            &country_labels,
            country_inputs.feature_names(),
            &protocol,
            &mut rng,
        )?;

        let pipeline = ExportPipeline {
            crop_inputs,
            crop_labels,
            crop_model: crop.model,
            country_inputs,
            country_labels,
            country_model: country.model,
        };
        pipeline.validate()?;

        Ok(Trained {
            pipeline,
            report: ExportReport {
                crop: crop.report,
                country: country.report,
                trained_at: Utc::now(),
            },
        })
    }
}

pub struct ParcelTrainer {
    config: ParcelConfig,
}

impl ParcelTrainer {
    pub fn new(config: ParcelConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(rows = table.len()))]
    pub fn train(&self, table: &Table) -> Result<Trained<ParcelPipeline, ParcelReport>> {
        table.require_columns(PARCEL_COLUMNS)?;
        let seed = self.config.seed;
        let mut rng = StdRng::seed_from_u64(seed);

        let preprocessor = Preprocessor::fit(table, None, PARCEL_CATEGORICAL, names(PARCEL_FEATURES))?;
        let x = preprocessor.transform_table(table)?;
        let split = train_test_split(x.len(), self.config.test_fraction, &mut rng)?;

        let fit = |column: &str, spec: &RegressorSpec| -> Result<(RegressionModel, f64)> {
            let y = table
                .numeric_column(column)?
                .into_iter()
                .map(|v| vec![v])
                .collect::<Vec<_>>();
            info!(column, model = %spec.describe(), "fitting parcel regressor");
            let (model, r2) = fit_regressor(spec, &x, &y, &split, seed)?;
            info!(column, r2, "held-out R²");
            Ok((model, r2))
        };
        let (fertility, fertility_r2) = fit(FERTILITY_COLUMN, &self.config.fertility)?;
        let (value, value_r2) = fit(VALUE_COLUMN, &self.config.value)?;
        let (opportunity, opportunity_r2) = fit(OPPORTUNITY_COLUMN, &self.config.opportunity)?;

        let pipeline = ParcelPipeline {
            preprocessor,
            fertility,
            value,
            opportunity,
        };
        pipeline.validate()?;

        Ok(Trained {
            pipeline,
            report: ParcelReport {
                rows: table.len(),
                train_rows: split.train.len(),
                test_rows: split.test.len(),
                fertility_r2,
                value_r2,
                opportunity_r2,
                trained_at: Utc::now(),
            },
        })
    }
}

/// Pipeline kind named by a CLI or config string
pub fn parse_kind(name: &str) -> Result<PipelineKind> {
    match name {
        "irrigation" => Ok(PipelineKind::Irrigation),
        "disease" => Ok(PipelineKind::Disease),
        "export" => Ok(PipelineKind::Export),
        "parcel" => Ok(PipelineKind::Parcel),
        other => Err(TrainerError::Config(format!("unknown pipeline '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Variant, DEFAULT_SEED};
    use crate::forest::ForestConfig;
    use crate::synth;
    use feralyx_core::{AgroError, Record};

    fn small_forest() -> ClassifierSpec {
        ClassifierSpec::Forest(ForestConfig::new(10, Some(8), 2))
    }

    /// Parched field when `irrigate`, soaked otherwise; other readings vary with `i`
    fn field_row(i: usize, irrigate: bool) -> Record {
        let (humidity, temperature, rain) = if irrigate { (10.0, 38.0, 2.0) } else { (80.0, 18.0, 30.0) };
        let (flow, duration) = if irrigate {
            (2.5 + (i % 3) as f64 * 0.2, 40.0 + (i % 4) as f64)
        } else {
            (0.0, 0.0)
        };
        Record::new()
            .with("humidite", humidity)
            .with("temperature", temperature)
            .with("type_sol", ["sableux", "argileux", "limoneux"][i % 3])
            .with("ph", 6.0 + (i % 4) as f64 * 0.3)
            .with("ensoleillement", 4.0 + (i % 7) as f64)
            .with("age_culture", 10.0 + (i * 7 % 90) as f64)
            .with("precipitation_prevue", rain)
            .with(DECISION_COLUMN, if irrigate { 1.0 } else { 0.0 })
            .with("debit_eau", flow)
            .with("duree_minutes", duration)
    }

    fn basic_irrigation() -> IrrigationConfig {
        let mut config = IrrigationConfig::preset(Variant::Basic);
        config.decision = small_forest();
        config.quantity = RegressorSpec::Forest(ForestConfig::new(10, Some(8), 2));
        config
    }

    #[test]
    fn irrigation_basic_run_reports_scores() {
        let table = synth::irrigation(200, DEFAULT_SEED).unwrap();
        let trained = IrrigationTrainer::new(basic_irrigation()).train(&table).unwrap();
        let report = &trained.report;
        assert_eq!(report.decision.rows, 200);
        assert_eq!(report.decision.train_rows + report.decision.test_rows, 200);
        assert_eq!(report.decision.features.len(), 7);
        assert!(report.decision.accuracy > 0.6);
        assert!(report.quantity_rows > 0);
        assert!(trained.pipeline.quantity.is_some());
    }

    #[test]
    fn never_irrigated_dataset_trains_a_constant_decision() {
        let table = Table::from_rows((0..20).map(|i| field_row(i, false)).collect());
        let trained = IrrigationTrainer::new(IrrigationConfig::preset(Variant::Basic)).train(&table).unwrap();

        assert!(trained.pipeline.quantity.is_none());
        assert_eq!(trained.report.quantity_rows, 0);
        assert_eq!(trained.report.quantity_r2, 0.0);
        assert_eq!(trained.report.decision.classes, vec!["0".to_string()]);

        let advice = trained.pipeline.predict(&field_row(7, true)).unwrap();
        assert!(!advice.irrigate);
        assert_eq!(advice.confidence, 100.0);
    }

    #[test]
    fn folds_shrink_to_fit_a_tiny_table() {
        let table = Table::from_rows(vec![field_row(0, true), field_row(1, false)]);
        let trained = IrrigationTrainer::new(IrrigationConfig::preset(Variant::Advanced)).train(&table).unwrap();

        let report = &trained.report.decision;
        assert_eq!(report.rows, 6);
        assert_eq!(report.train_rows, 4);
        let cv = report.cross_validation.as_ref().unwrap();
        assert_eq!(cv.scores.len(), 4);
        assert!(trained.pipeline.quantity.is_some());
    }

    #[test]
    fn single_training_row_skips_cross_validation() {
        let mut config = basic_irrigation();
        config.protocol.cv_folds = Some(5);
        let table = Table::from_rows(vec![field_row(0, false)]);

        let trained = IrrigationTrainer::new(config).train(&table).unwrap();
        assert!(trained.report.decision.cross_validation.is_none());
        assert_eq!(trained.report.decision.train_rows, 1);
    }

    #[test]
    fn missing_column_is_reported() {
        let mut table = synth::disease(40, 1).unwrap();
        table.columns.retain(|c| c != "ph_sol");
        let err = DiseaseTrainer::new(DiseaseConfig::preset(Variant::Basic)).train(&table).err().unwrap();
        assert!(matches!(
            err,
            TrainerError::Core(AgroError::MissingColumn { ref column }) if column == "ph_sol"
        ));
    }

    #[test]
    fn empty_table_is_rejected() {
        let table = Table::new(names(DISEASE_COLUMNS), vec![]);
        let err = DiseaseTrainer::new(DiseaseConfig::preset(Variant::Basic)).train(&table).err().unwrap();
        assert!(matches!(err, TrainerError::Core(AgroError::EmptyDataset)));
    }

    #[test]
    fn advanced_disease_run_cross_validates() {
        let mut config = DiseaseConfig::preset(Variant::Advanced);
        config.decision = small_forest();
        config.protocol.cv_folds = Some(3);
        let table = synth::disease(120, DEFAULT_SEED).unwrap();

        let trained = DiseaseTrainer::new(config).train(&table).unwrap();
        let report = &trained.report.decision;
        assert_eq!(report.rows, 120 * 4);
        assert_eq!(report.features.len(), 13);
        let cv = report.cross_validation.as_ref().unwrap();
        assert_eq!(cv.scores.len(), 3);
        assert!(cv.mean > 0.5);
    }

    #[test]
    fn export_pipeline_predicts_known_labels() {
        let mut config = ExportConfig::default();
        config.crop = small_forest();
        config.country = small_forest();
        let table = synth::export(150, 3).unwrap();
        let trained = ExportTrainer::new(config).train(&table).unwrap();

        let advice = trained
            .pipeline
            .predict(
                &Record::new()
                    .with("type_sol", "sableux")
                    .with("region", "sud")
                    .with("budget", 30_000.0)
                    .with("surface", 4.0),
            )
            .unwrap();
        assert!(trained.pipeline.crop_labels.classes().contains(&advice.crop));
        assert!(trained.pipeline.country_labels.classes().contains(&advice.country));
        assert!(advice.gross_gain > 0.0);
    }

    #[test]
    fn parcel_regressors_explain_the_targets() {
        let config = ParcelConfig {
            fertility: RegressorSpec::Forest(ForestConfig::new(10, Some(10), 2)),
            value: RegressorSpec::Forest(ForestConfig::new(10, Some(10), 2)),
            opportunity: RegressorSpec::Forest(ForestConfig::new(10, Some(10), 2)),
            ..ParcelConfig::default()
        };
        let table = synth::parcels(300, 4).unwrap();
        let trained = ParcelTrainer::new(config).train(&table).unwrap();
        assert!(trained.report.fertility_r2 > 0.3);
        assert!(trained.report.value_r2 > 0.3);
    }

    #[test]
    fn kinds_parse_by_name() {
        assert_eq!(parse_kind("parcel").unwrap(), PipelineKind::Parcel);
        assert!(parse_kind("weather").is_err());
    }
}
