//! End-to-end training, persistence and prediction for every pipeline
//!
//! Models are trained on the seeded synthetic datasets with small ensembles.

use anyhow::Result;
use feralyx_core::{
    store, DiseasePipeline, IrrigationModel, IrrigationPipeline, Pipeline, PipelineKind, Record, Table,
};
use feralyx_trainer::boosting::BoostingConfig;
use feralyx_trainer::config::{DiseaseConfig, IrrigationConfig};
use feralyx_trainer::forest::ForestConfig;
use feralyx_trainer::{
    dataset, generate_datasets, predict_from_file, synth, train_and_save, ClassifierSpec, DiseaseTrainer,
    IrrigationTrainer, RegressorSpec, TrainingConfig, Variant,
};
use proptest::prelude::*;
use std::sync::OnceLock;
use tempfile::tempdir;

fn small_forest() -> ClassifierSpec {
    ClassifierSpec::Forest(ForestConfig::new(30, Some(10), 2))
}

fn irrigation_config() -> IrrigationConfig {
    let mut config = IrrigationConfig::preset(Variant::Basic);
    config.decision = small_forest();
    config.quantity = RegressorSpec::Forest(ForestConfig::new(20, Some(10), 2));
    config
}

fn disease_config() -> DiseaseConfig {
    let mut config = DiseaseConfig::preset(Variant::Basic);
    config.decision = small_forest();
    config
}

fn irrigation_pipeline() -> &'static IrrigationPipeline {
    static PIPELINE: OnceLock<IrrigationPipeline> = OnceLock::new();
    PIPELINE.get_or_init(|| {
        let table = synth::irrigation(synth::IRRIGATION_ROWS, 42).unwrap();
        IrrigationTrainer::new(irrigation_config()).train(&table).unwrap().pipeline
    })
}

fn dry_hot_field() -> Record {
    Record::new()
        .with("humidite", 8.0)
        .with("temperature", 40.0)
        .with("type_sol", "sableux")
        .with("ph", 6.5)
        .with("ensoleillement", 10.0)
        .with("age_culture", 45.0)
        .with("precipitation_prevue", 1.0)
}

fn wet_cool_field() -> Record {
    Record::new()
        .with("humidite", 85.0)
        .with("temperature", 15.0)
        .with("type_sol", "argileux")
        .with("ph", 6.8)
        .with("ensoleillement", 3.0)
        .with("age_culture", 60.0)
        .with("precipitation_prevue", 30.0)
}

#[test]
fn dry_hot_field_gets_irrigated() -> Result<()> {
    let advice = irrigation_pipeline().predict(&dry_hot_field())?;
    assert!(advice.irrigate, "expected irrigation, got {advice:?}");
    assert!(advice.flow_rate >= 0.5);
    assert!(advice.duration_minutes >= 10.0);
    assert!(advice.confidence > 50.0);
    Ok(())
}

#[test]
fn wet_cool_field_is_left_alone() -> Result<()> {
    let advice = irrigation_pipeline().predict(&wet_cool_field())?;
    assert!(!advice.irrigate, "expected no irrigation, got {advice:?}");
    assert_eq!(advice.flow_rate, 0.0);
    assert_eq!(advice.duration_minutes, 0.0);
    Ok(())
}

#[test]
fn humid_cool_leaf_is_diagnosed_as_mildew() -> Result<()> {
    let table = synth::disease(synth::DISEASE_ROWS, 42)?;
    let trained = DiseaseTrainer::new(disease_config()).train(&table)?;
    assert_eq!(trained.report.decision.classes.len(), 5);

    let leaf = Record::new()
        .with("temperature_feuille", 18.0)
        .with("humidite_feuille", 95.0)
        .with("couleur", 2.0)
        .with("stress_hydrique", 75.0)
        .with("ph_sol", 5.2)
        .with("croissance_pct", -13.0);
    let diagnosis = trained.pipeline.predict(&leaf)?;
    assert_eq!(diagnosis.disease, "mildiou");
    assert!(diagnosis.confidence > 50.0, "confidence {}", diagnosis.confidence);
    assert_eq!(diagnosis.probabilities.len(), 5);
    Ok(())
}

/// `pairs` parched/soaked row pairs sharing every reading except
/// humidity, temperature and forecast rain
fn contrasted_fields(pairs: usize) -> Table {
    let mut rows = Vec::with_capacity(pairs * 2);
    for k in 0..pairs {
        let shared = Record::new()
            .with("type_sol", ["sableux", "argileux", "limoneux"][k % 3])
            .with("ph", 5.5 + (k % 6) as f64 * 0.4)
            .with("ensoleillement", 3.0 + (k % 9) as f64)
            .with("age_culture", 5.0 + (k * 13 % 150) as f64);
        rows.push(
            shared
                .clone()
                .with("humidite", 10.0)
                .with("temperature", 38.0)
                .with("precipitation_prevue", 2.0)
                .with("irriguer", 1.0)
                .with("debit_eau", 2.0 + (k % 5) as f64 * 0.3)
                .with("duree_minutes", 30.0 + (k % 4) as f64 * 5.0),
        );
        rows.push(
            shared
                .with("humidite", 80.0)
                .with("temperature", 18.0)
                .with("precipitation_prevue", 30.0)
                .with("irriguer", 0.0)
                .with("debit_eau", 0.0)
                .with("duree_minutes", 0.0),
        );
    }
    Table::from_rows(rows)
}

/// Healthy leaves at 40-70 % humidity, mildewed ones at 80-100 %, paired on
/// every other reading
fn contrasted_leaves(pairs: usize) -> Table {
    let mut rows = Vec::with_capacity(pairs * 2);
    for k in 0..pairs {
        let shared = Record::new()
            .with("temperature_feuille", 15.0 + (k % 16) as f64)
            .with("couleur", (k % 4) as f64)
            .with("stress_hydrique", 20.0 + (k % 7) as f64 * 10.0)
            .with("ph_sol", 5.0 + (k % 5) as f64 * 0.5)
            .with("croissance_pct", -10.0 + (k % 6) as f64 * 4.0);
        rows.push(
            shared
                .clone()
                .with("humidite_feuille", 40.0 + (k % 7) as f64 * 5.0)
                .with("maladie", "sain"),
        );
        rows.push(
            shared
                .with("humidite_feuille", 80.0 + (k % 5) as f64 * 5.0)
                .with("maladie", "mildiou"),
        );
    }
    Table::from_rows(rows)
}

#[test]
fn parched_field_is_irrigated_under_both_presets() -> Result<()> {
    let table = contrasted_fields(20);
    for variant in [Variant::Basic, Variant::Advanced] {
        let trained = IrrigationTrainer::new(IrrigationConfig::preset(variant)).train(&table)?;
        let advice = trained.pipeline.predict(&dry_hot_field())?;
        assert!(advice.irrigate, "{variant}: expected irrigation, got {advice:?}");
        assert!(advice.flow_rate >= 0.5, "{variant}: flow {}", advice.flow_rate);
        assert!(advice.duration_minutes >= 10.0, "{variant}: duration {}", advice.duration_minutes);
    }
    Ok(())
}

#[test]
fn wet_leaf_is_mildew_under_both_presets() -> Result<()> {
    let table = contrasted_leaves(20);
    let leaf = Record::new()
        .with("temperature_feuille", 18.0)
        .with("humidite_feuille", 95.0)
        .with("couleur", 2.0)
        .with("stress_hydrique", 50.0)
        .with("ph_sol", 6.5)
        .with("croissance_pct", 0.0);
    for variant in [Variant::Basic, Variant::Advanced] {
        let trained = DiseaseTrainer::new(DiseaseConfig::preset(variant)).train(&table)?;
        let diagnosis = trained.pipeline.predict(&leaf)?;
        assert_eq!(diagnosis.disease, "mildiou", "{variant}: {diagnosis:?}");
        assert!(diagnosis.confidence > 50.0, "{variant}: confidence {}", diagnosis.confidence);
    }
    Ok(())
}

#[test]
fn predictions_survive_a_save_load_cycle() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("irrigation.json");

    let table = synth::irrigation(300, 42)?;
    let model = IrrigationModel::from_pipeline(IrrigationTrainer::new(irrigation_config()).train(&table)?.pipeline);
    let artifact = model.save(&path)?;
    assert_eq!(artifact.hash_path, dir.path().join("irrigation.hash"));

    let restored = IrrigationModel::load(&path)?;
    for record in [dry_hot_field(), wet_cool_field()] {
        assert_eq!(model.predict(&record)?, restored.predict(&record)?);
    }
    Ok(())
}

#[test]
fn loading_as_the_wrong_kind_fails() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("irrigation.json");
    store::save(irrigation_pipeline(), &path)?;

    assert_eq!(store::peek_kind(&path)?, PipelineKind::Irrigation);
    assert!(store::load::<DiseasePipeline>(&path).is_err());
    Ok(())
}

#[test]
fn training_is_deterministic() -> Result<()> {
    let table = synth::irrigation(200, 7)?;
    let mut config = irrigation_config();
    config.decision = ClassifierSpec::SoftVote {
        members: vec![
            ClassifierSpec::Forest(ForestConfig::new(5, Some(6), 2)),
            ClassifierSpec::Boosting(BoostingConfig::new(10, 0.1, 3)),
        ],
    };

    let first = IrrigationTrainer::new(config.clone()).train(&table)?.pipeline;
    let second = IrrigationTrainer::new(config).train(&table)?.pipeline;
    assert_eq!(
        feralyx_core::serialization::canonical_json_string(&first)?,
        feralyx_core::serialization::canonical_json_string(&second)?
    );
    Ok(())
}

#[test]
fn csv_round_trip_trains_the_same_model() -> Result<()> {
    let dir = tempdir()?;
    let table = synth::irrigation(300, 11)?;
    let path = dir.path().join("irrigation_dataset.csv");
    dataset::write_csv(&table, &path)?;
    let reread = dataset::read_csv(&path)?;
    assert_eq!(reread.len(), table.len());

    let trainer = IrrigationTrainer::new(irrigation_config());
    let from_memory = trainer.train(&table)?.pipeline;
    let from_disk = trainer.train(&reread)?.pipeline;
    assert_eq!(from_memory.predict(&dry_hot_field())?, from_disk.predict(&dry_hot_field())?);
    Ok(())
}

#[test]
fn generated_datasets_train_and_predict_through_the_store() -> Result<()> {
    let dir = tempdir()?;
    let written = generate_datasets(&dir.path().join("data"), 42)?;
    assert_eq!(written.len(), 4);
    assert!(written.iter().all(|p| p.exists()));

    let mut config = TrainingConfig::preset(Variant::Basic);
    config.export.crop = small_forest();
    config.export.country = small_forest();
    let table = dataset::read_csv(dir.path().join("data").join("export_dataset.csv"))?;
    let model_path = dir.path().join("models").join("export.json");
    let outcome = train_and_save(PipelineKind::Export, &table, &config, &model_path)?;
    assert_eq!(outcome.kind, PipelineKind::Export);
    assert!(outcome.artifact.hash_path.exists());
    assert!(outcome.report.get("crop").is_some());

    let site = Record::new()
        .with("type_sol", "limoneux")
        .with("region", "centre")
        .with("budget", 20_000.0)
        .with("surface", 5.0);
    let (kind, prediction) = predict_from_file(&model_path, &site)?;
    assert_eq!(kind, PipelineKind::Export);
    let net = prediction["net_gain"].as_f64().unwrap_or_default();
    let gross = prediction["gross_gain"].as_f64().unwrap_or_default();
    assert!((net - 0.65 * gross).abs() <= 0.01);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn irrigation_confidence_stays_in_range(
        humidity in 0.0f64..100.0,
        temperature in 0.0f64..50.0,
        soil in prop::sample::select(vec!["argileux", "sableux", "limoneux"]),
        rain in 0.0f64..60.0,
        sun in 0.0f64..14.0,
    ) {
        let record = Record::new()
            .with("humidite", humidity)
            .with("temperature", temperature)
            .with("type_sol", soil)
            .with("ph", 6.5)
            .with("ensoleillement", sun)
            .with("age_culture", 90.0)
            .with("precipitation_prevue", rain);
        let advice = irrigation_pipeline().predict(&record).unwrap();
        prop_assert!((0.0..=100.0).contains(&advice.confidence));
        if advice.irrigate {
            prop_assert!(advice.flow_rate >= 0.5);
            prop_assert!(advice.duration_minutes >= 10.0);
        } else {
            prop_assert_eq!(advice.flow_rate, 0.0);
            prop_assert_eq!(advice.duration_minutes, 0.0);
        }
    }
}
