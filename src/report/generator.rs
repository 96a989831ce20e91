//! Cell table serialization.
//!
//! Tables are written either as JSON in a `columns`/`index`/`data` layout or
//! as CSV with a header row. Undefined densities are written as `null` in
//! JSON and `NaN` in CSV.

use crate::cli::OutputFormat;
use crate::models::{CellId, CellTable, TableSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON layout of a table.
#[derive(Debug, Serialize)]
struct TableJson<'a> {
    columns: &'a [String],
    index: Vec<CellId>,
    data: Vec<Vec<Value>>,
}

/// Circuit name: the last four `/`-separated parts of its locator, joined by `_`.
///
/// An absolute locator with fewer than four parts keeps its leading empty
/// part, so `/data/O1/circuit.json` becomes `_data_O1_circuit.json`.
pub fn circuit_name(locator: &Path) -> String {
    let locator = locator.to_string_lossy();
    let parts: Vec<&str> = locator.split('/').collect();

    let start = parts.len().saturating_sub(4);
    parts[start..].join("_")
}

/// Output file name for a run.
pub fn output_file_name<Tz>(
    locator: &Path,
    target: &str,
    date: &DateTime<Tz>,
    format: OutputFormat,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "cell_table__{}__Target_{}__{}.{}",
        circuit_name(locator),
        target,
        date.format("%Y-%m-%d_%H-%M-%S"),
        format.extension()
    )
}

/// Generate the JSON table.
pub fn generate_json_table(table: &CellTable) -> Result<String> {
    let columns = table.column_names();
    let data = table
        .rows
        .iter()
        .map(|row| {
            let mut values = vec![
                float_value(row.position.x),
                float_value(row.position.y),
                float_value(row.position.z),
                float_value(row.total_dendrite_length),
                Value::from(row.local_e_syn_count),
                Value::from(row.local_i_syn_count),
            ];
            values.extend(row.projection_counts.iter().map(|&c| Value::from(c)));
            values.push(float_value(row.local_e_syn_density));
            values.push(float_value(row.local_i_syn_density));
            values.extend(row.projection_densities.iter().map(|&d| float_value(d)));
            values
        })
        .collect();

    let json = TableJson {
        // The id column becomes the index.
        columns: &columns[1..],
        index: table.ids(),
        data,
    };

    serde_json::to_string_pretty(&json).context("Failed to serialize cell table")
}

/// NaN has no JSON representation and maps to `null`.
fn float_value(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Generate the CSV table.
pub fn generate_csv_table(table: &CellTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(table.column_names())
        .context("Failed to write CSV header")?;

    for row in &table.rows {
        let record = std::iter::once(row.id.to_string())
            .chain(row.values().into_iter().map(|v| v.to_string()));
        writer
            .write_record(record)
            .with_context(|| format!("Failed to write CSV row for cell {}", row.id))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to flush CSV table")?;
    String::from_utf8(bytes).context("CSV table is not valid UTF-8")
}

/// Write the table in the given format to `path`.
pub fn write_table(table: &CellTable, path: &Path, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Json => generate_json_table(table)?,
        OutputFormat::Csv => generate_csv_table(table)?,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write cell table to {}", path.display()))?;

    Ok(())
}

/// Full output path inside `output_dir`.
pub fn output_path<Tz>(
    output_dir: &Path,
    locator: &Path,
    target: &str,
    date: &DateTime<Tz>,
    format: OutputFormat,
) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    output_dir.join(output_file_name(locator, target, date, format))
}

/// Generate a text summary of the table statistics.
pub fn generate_summary_text(summary: &TableSummary) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Cells: {}", summary.cells));
    if summary.zero_length_cells > 0 {
        lines.push(format!(
            "Cells without dendrites (NaN densities): {}",
            summary.zero_length_cells
        ));
    }
    lines.push(format!(
        "Mean local E density: {:.4}",
        summary.mean_local_e_density
    ));
    lines.push(format!(
        "Mean local I density: {:.4}",
        summary.mean_local_i_density
    ));

    for (name, mean) in &summary.mean_projection_densities {
        lines.push(format!("Mean {} density: {:.4}", name, mean));
    }

    lines.join("\n")
}
