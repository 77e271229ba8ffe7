//! Deterministic feature derivation from raw agronomic readings
//!
//! Every derived attribute is a pure function of one observation and fixed
//! constants. The same code path serves whole-table training and single-row
//! inference, so the two can never drift apart.

use crate::errors::Result;
use crate::record::{Record, Table};
use serde::{Deserialize, Serialize};

/// Agronomic pH optimum used for deviation features
pub const PH_OPTIMUM: f64 = 6.5;

/// Base columns consumed by irrigation derivations
pub const IRRIGATION_BASE: &[&str] = &[
    "humidite",
    "temperature",
    "ph",
    "ensoleillement",
    "age_culture",
    "precipitation_prevue",
];

/// Attributes produced by irrigation derivations, in emission order
pub const IRRIGATION_DERIVED: &[&str] = &[
    "stress_hydrique_score",
    "besoin_eau_base",
    "deficit_hydrique",
    "temperature_extreme",
    "humidite_critique",
    "pluie_insuffisante",
    "temp_x_ensoleillement",
    "humidite_x_ph",
    "ph_deviation",
    "phase_croissance",
];

/// Base columns consumed by disease derivations
pub const DISEASE_BASE: &[&str] = &[
    "temperature_feuille",
    "humidite_feuille",
    "stress_hydrique",
    "ph_sol",
    "croissance_pct",
];

/// Attributes produced by disease derivations, in emission order
pub const DISEASE_DERIVED: &[&str] = &[
    "stress_global",
    "conditions_oidium",
    "conditions_rouille",
    "conditions_mildiou",
    "temp_hum_interaction",
    "ph_extreme",
    "croissance_anormale",
];

/// Which derivation family to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    Irrigation,
    Disease,
}

impl FeatureSet {
    pub fn base_columns(self) -> &'static [&'static str] {
        match self {
            FeatureSet::Irrigation => IRRIGATION_BASE,
            FeatureSet::Disease => DISEASE_BASE,
        }
    }

    pub fn derived_columns(self) -> &'static [&'static str] {
        match self {
            FeatureSet::Irrigation => IRRIGATION_DERIVED,
            FeatureSet::Disease => DISEASE_DERIVED,
        }
    }

    /// Return `record` augmented with the derived attributes of this family
    pub fn derive(self, record: &Record) -> Result<Record> {
        let mut out = record.clone();
        match self {
            FeatureSet::Irrigation => derive_irrigation(record, &mut out)?,
            FeatureSet::Disease => derive_disease(record, &mut out)?,
        }
        Ok(out)
    }

    /// Apply `derive` to every row
    pub fn derive_table(self, table: &Table) -> Result<Table> {
        let rows = table
            .rows
            .iter()
            .map(|row| self.derive(row))
            .collect::<Result<Vec<_>>>()?;

        let mut columns = table.columns.clone();
        for derived in self.derived_columns() {
            if !columns.iter().any(|c| c == derived) {
                columns.push((*derived).to_string());
            }
        }
        Ok(Table::new(columns, rows))
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Growth phase bucket: (0, 30] → 0, (30, 90] → 1, beyond → 2
pub fn growth_phase(age_days: f64) -> f64 {
    if age_days <= 30.0 {
        0.0
    } else if age_days <= 90.0 {
        1.0
    } else {
        2.0
    }
}

fn derive_irrigation(base: &Record, out: &mut Record) -> Result<()> {
    let humidity = base.number("humidite")?;
    let temperature = base.number("temperature")?;
    let ph = base.number("ph")?;
    let sunlight = base.number("ensoleillement")?;
    let age = base.number("age_culture")?;
    let rain = base.number("precipitation_prevue")?;

    out.insert("stress_hydrique_score", (100.0 - humidity) * (temperature / 20.0));
    out.insert("besoin_eau_base", sunlight * 0.5 - rain * 0.3);
    out.insert("deficit_hydrique", (50.0 - humidity).max(0.0));
    out.insert("temperature_extreme", flag(temperature > 35.0));
    out.insert("humidite_critique", flag(humidity < 20.0));
    out.insert("pluie_insuffisante", flag(rain < 10.0));
    out.insert("temp_x_ensoleillement", temperature * sunlight);
    out.insert("humidite_x_ph", humidity * ph);
    out.insert("ph_deviation", (ph - PH_OPTIMUM).abs());
    out.insert("phase_croissance", growth_phase(age));
    Ok(())
}

fn derive_disease(base: &Record, out: &mut Record) -> Result<()> {
    let leaf_temp = base.number("temperature_feuille")?;
    let leaf_humidity = base.number("humidite_feuille")?;
    let water_stress = base.number("stress_hydrique")?;
    let soil_ph = base.number("ph_sol")?;
    let growth = base.number("croissance_pct")?;

    out.insert(
        "stress_global",
        water_stress * 0.4 + (100.0 - leaf_humidity) * 0.3 + (soil_ph - PH_OPTIMUM).abs() * 10.0,
    );
    out.insert("conditions_oidium", flag(leaf_humidity > 60.0 && leaf_temp > 20.0));
    out.insert("conditions_rouille", flag(leaf_humidity > 70.0 && leaf_temp < 25.0));
    out.insert("conditions_mildiou", flag(leaf_humidity > 80.0 && leaf_temp < 22.0));
    out.insert("temp_hum_interaction", leaf_temp * leaf_humidity / 100.0);
    out.insert("ph_extreme", flag(soil_ph < 5.5 || soil_ph > 7.8));
    out.insert("croissance_anormale", flag(growth < 0.0));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AgroError;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn irrigation_row(humidite: f64, temperature: f64, rain: f64, age: f64) -> Record {
        Record::new()
            .with("humidite", humidite)
            .with("temperature", temperature)
            .with("type_sol", "sableux")
            .with("ph", 7.1)
            .with("ensoleillement", 10.0)
            .with("age_culture", age)
            .with("precipitation_prevue", rain)
    }

    #[test]
    fn irrigation_derivations_match_definitions() {
        let out = FeatureSet::Irrigation
            .derive(&irrigation_row(8.0, 40.0, 1.0, 45.0))
            .unwrap();

        assert_relative_eq!(out.number("stress_hydrique_score").unwrap(), 92.0 * 2.0);
        assert_relative_eq!(out.number("besoin_eau_base").unwrap(), 5.0 - 0.3);
        assert_relative_eq!(out.number("deficit_hydrique").unwrap(), 42.0);
        assert_eq!(out.number("temperature_extreme").unwrap(), 1.0);
        assert_eq!(out.number("humidite_critique").unwrap(), 1.0);
        assert_eq!(out.number("pluie_insuffisante").unwrap(), 1.0);
        assert_relative_eq!(out.number("temp_x_ensoleillement").unwrap(), 400.0);
        assert_relative_eq!(out.number("humidite_x_ph").unwrap(), 8.0 * 7.1);
        assert_relative_eq!(out.number("ph_deviation").unwrap(), 0.6, epsilon = 1e-12);
        assert_eq!(out.number("phase_croissance").unwrap(), 1.0);
        // base attributes are preserved
        assert_eq!(out.label("type_sol").unwrap(), "sableux");
    }

    #[test]
    fn growth_phase_bucket_edges() {
        assert_eq!(growth_phase(1.0), 0.0);
        assert_eq!(growth_phase(30.0), 0.0);
        assert_eq!(growth_phase(30.5), 1.0);
        assert_eq!(growth_phase(90.0), 1.0);
        assert_eq!(growth_phase(179.0), 2.0);
    }

    #[test]
    fn disease_flags_follow_favourable_conditions() {
        let leaf = Record::new()
            .with("temperature_feuille", 18.0)
            .with("humidite_feuille", 95.0)
            .with("stress_hydrique", 60.0)
            .with("ph_sol", 5.2)
            .with("croissance_pct", -4.0);
        let out = FeatureSet::Disease.derive(&leaf).unwrap();

        assert_eq!(out.number("conditions_oidium").unwrap(), 0.0);
        assert_eq!(out.number("conditions_rouille").unwrap(), 1.0);
        assert_eq!(out.number("conditions_mildiou").unwrap(), 1.0);
        assert_eq!(out.number("ph_extreme").unwrap(), 1.0);
        assert_eq!(out.number("croissance_anormale").unwrap(), 1.0);
        assert_relative_eq!(
            out.number("stress_global").unwrap(),
            24.0 + 1.5 + 13.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(out.number("temp_hum_interaction").unwrap(), 17.1, epsilon = 1e-9);
    }

    #[test]
    fn missing_base_column_is_named() {
        let mut row = irrigation_row(30.0, 20.0, 5.0, 10.0);
        row.remove("ph");
        match FeatureSet::Irrigation.derive(&row) {
            Err(AgroError::MissingColumn { column }) => assert_eq!(column, "ph"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn derive_table_registers_new_columns_once() {
        let table = Table::from_rows(vec![
            irrigation_row(10.0, 30.0, 2.0, 20.0),
            irrigation_row(70.0, 18.0, 30.0, 120.0),
        ]);
        let derived = FeatureSet::Irrigation.derive_table(&table).unwrap();
        let derived_again = FeatureSet::Irrigation.derive_table(&derived).unwrap();
        assert_eq!(derived.columns, derived_again.columns);
        assert_eq!(derived.columns.len(), table.columns.len() + IRRIGATION_DERIVED.len());
    }

    proptest! {
        #[test]
        fn single_row_and_batch_paths_agree(
            rows in prop::collection::vec(
                (0.0f64..100.0, 5.0f64..45.0, 0.0f64..50.0, 1.0f64..180.0),
                1..20,
            )
        ) {
            let table = Table::from_rows(
                rows.iter().map(|&(h, t, r, a)| irrigation_row(h, t, r, a)).collect(),
            );
            let batch = FeatureSet::Irrigation.derive_table(&table).unwrap();
            for (raw, batched) in table.rows.iter().zip(batch.rows.iter()) {
                let single = FeatureSet::Irrigation.derive(raw).unwrap();
                prop_assert_eq!(&single, batched);
            }
        }
    }
}
