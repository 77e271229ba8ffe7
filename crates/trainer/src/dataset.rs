//! CSV dataset loading and writing
//!
//! Headers become column names; every cell is parsed with
//! [`Value::parse`], so numeric cells are numbers and everything else is a
//! categorical label.

use crate::errors::{Result, TrainerError};
use csv::{ReaderBuilder, WriterBuilder};
use feralyx_core::{Record, Table, Value};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Load a headed CSV file into a [`Table`]
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| TrainerError::Dataset(format!("cannot open {}: {e}", path.display())))?;
    let table = read_from(file)
        .map_err(|e| TrainerError::Dataset(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), rows = table.len(), columns = table.columns.len(), "loaded dataset");
    Ok(table)
}

/// Parse headed CSV from any reader
pub fn read_from<R: Read>(reader: R) -> Result<Table> {
    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if columns.is_empty() {
        return Err(TrainerError::Dataset("missing header row".into()));
    }

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let raw = result?;
        if raw.len() != columns.len() {
            return Err(TrainerError::Dataset(format!(
                "row {}: expected {} fields, got {}",
                line + 1,
                columns.len(),
                raw.len()
            )));
        }
        rows.push(
            columns
                .iter()
                .zip(raw.iter())
                .map(|(column, cell)| (column.clone(), Value::parse(cell)))
                .collect::<Record>(),
        );
    }

    Ok(Table::new(columns, rows))
}

/// Write `table` with its declared column order; absent cells are left empty
pub fn write_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_to(table, File::create(path)?)?;
    debug!(path = %path.display(), rows = table.len(), "wrote dataset");
    Ok(())
}

pub fn write_to<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(
            table
                .columns
                .iter()
                .map(|c| row.get(c).map(Value::to_string).unwrap_or_default()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = "humidite,type_sol,irriguer\n8.5,sableux,1\n 72 , argileux ,0\n";

    #[test]
    fn cells_are_typed() {
        let table = read_from(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["humidite", "type_sol", "irriguer"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].number("humidite").unwrap(), 8.5);
        assert_eq!(table.rows[1].label("type_sol").unwrap(), "argileux");
        assert_eq!(table.rows[1].label("irriguer").unwrap(), "0");
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = read_from("a,b\n1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TrainerError::Csv(_) | TrainerError::Dataset(_)));
    }

    #[test]
    fn file_round_trip_preserves_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data/irrigation.csv");
        let table = read_from(SAMPLE.as_bytes()).unwrap();
        write_csv(&table, &path).unwrap();
        assert_eq!(read_csv(&path).unwrap(), table);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_csv("/nonexistent/feralyx.csv").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/feralyx.csv"));
    }
}
