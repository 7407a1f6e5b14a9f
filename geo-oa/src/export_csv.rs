// CSV export module
// Writes flat measurement records to a CSV table in the session directory

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::Result;

/// A flat record: field name -> scalar value
pub type Record = Map<String, Value>;

/// Append `.csv` unless the name already ends with it
pub fn csv_filename(filename: &str) -> String {
    if filename.ends_with(".csv") {
        filename.to_string()
    } else {
        format!("{}.csv", filename)
    }
}

/// Export records to `output_dir/<filename>.csv`
///
/// The header is the sorted union of every record's keys; fields a record lacks
/// are left empty. Returns `None` without touching the filesystem when there are
/// no records.
pub fn export_csv(records: &[Record], filename: &str, output_dir: &Path) -> Result<Option<PathBuf>> {
    if records.is_empty() {
        log::warn!("No records to export, skipping {}", filename);
        return Ok(None);
    }

    let path = output_dir.join(csv_filename(filename));

    let fieldnames: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .collect();

    let mut file = BufWriter::new(File::create(&path)?);

    let header: Vec<String> = fieldnames.iter().map(|f| escape_field(f)).collect();
    write!(file, "{}\r\n", header.join(","))?;

    for record in records {
        let row: Vec<String> = fieldnames
            .iter()
            .map(|f| record.get(*f).map(format_value).unwrap_or_default())
            .collect();
        write!(file, "{}\r\n", row.join(","))?;
    }

    file.flush()?;

    log::info!(
        "Exported {} record(s) x {} field(s) to CSV: {}",
        records.len(),
        fieldnames.len(),
        path.display()
    );

    Ok(Some(path))
}

/// Render a JSON scalar as an escaped CSV field
fn format_value(value: &Value) -> String {
    let raw = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    escape_field(&raw)
}

/// Quote a field when it contains a delimiter, quote or line break
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
