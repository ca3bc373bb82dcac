// src/export.rs

use arrow::csv::WriterBuilder;
use parquet::{
    arrow::ArrowWriter,
    basic::Compression,
    file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};
use tracing::{info, instrument};

use crate::error::Result;
use crate::table::Table;

/// Write `table` as comma-delimited text with a header row. Missing values
/// are empty fields.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<W> {
    let mut csv = WriterBuilder::new().with_header(true).build(writer);
    csv.write(table.batch())?;
    Ok(csv.into_inner())
}

/// The CSV download body for `table`.
pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    write_csv(table, Vec::new())
}

/// Write `table` to `path` as CSV, creating parent directories.
#[instrument(level = "info", skip(table), fields(path = %path.display(), rows = table.num_rows()))]
pub fn write_csv_file(table: &Table, path: &Path) -> Result<()> {
    create_parent(path)?;
    let mut file = write_csv(table, File::create(path)?)?;
    file.flush()?;
    info!("csv written");
    Ok(())
}

/// Write `table` to `path` as a single Snappy-compressed Parquet file.
#[instrument(level = "info", skip(table), fields(path = %path.display(), rows = table.num_rows()))]
pub fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, table.schema(), Some(props))?;
    writer.write(table.batch())?;
    writer.close()?;
    info!("parquet written");
    Ok(())
}

/// Write by extension: `.parquet` as Parquet, anything else as CSV.
pub fn write_file(table: &Table, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("parquet") => write_parquet(table, path),
        _ => write_csv_file(table, path),
    }
}

/// `promo_data_non_cigarette_monthly.csv` from `("promo_data", ["Non Cigarette", "Monthly"])`.
pub fn export_file_name(stem: &str, parts: &[&str]) -> String {
    let mut name = stem.to_string();
    for part in parts {
        name.push('_');
        name.push_str(&slug(part));
    }
    name.push_str(".csv");
    name
}

fn slug(part: &str) -> String {
    part.trim().to_lowercase().replace(' ', "_")
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
