use thiserror::Error;

use crate::sheet::SheetRegion;

/// Everything the load → filter → aggregate pipeline can report.
///
/// None of these are retried: input is a static local file, so a failure
/// halts the render and is shown to the user as its `Display` text.
#[derive(Debug, Error)]
pub enum DashError {
    #[error("sheet `{sheet}` not found in workbook (available: {})", available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("region {region} does not fit sheet `{sheet}` ({rows} rows x {cols} columns)")]
    MalformedRegion {
        sheet: String,
        region: SheetRegion,
        rows: usize,
        cols: usize,
    },

    #[error("sheet `{sheet}` yields {found} columns but {expected} names were given")]
    ColumnCount {
        sheet: String,
        expected: usize,
        found: usize,
    },

    #[error("unknown period `{label}` at row {row}")]
    UnknownPeriod { label: String, row: usize },

    #[error("no rows match the current filter")]
    EmptyResultSet,

    #[error("ratio {numerator}/{denominator} is undefined: zero or missing denominator")]
    UndefinedRatio {
        numerator: String,
        denominator: String,
    },

    #[error("column `{0}` is missing")]
    MissingColumn(String),

    #[error("column `{column}` has type {found}, expected {expected}")]
    ColumnType {
        column: String,
        expected: String,
        found: String,
    },

    #[error("workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DashError>;
