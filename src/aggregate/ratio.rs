use arrow::array::{ArrayRef, Float64Array};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{fold, AggOp};
use crate::error::{DashError, Result};
use crate::table::Table;

/// `numerator / denominator`, or `None` when either side is missing or the
/// denominator is zero. Never infinite, never a silent zero.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// Like [`ratio`] but an undefined result is an `UndefinedRatio` error
/// naming both columns.
pub fn checked_ratio(
    numerator: Option<f64>,
    denominator: Option<f64>,
    numerator_name: &str,
    denominator_name: &str,
) -> Result<f64> {
    ratio(numerator, denominator).ok_or_else(|| DashError::UndefinedRatio {
        numerator: numerator_name.to_string(),
        denominator: denominator_name.to_string(),
    })
}

/// Append `output = numerator / denominator`, row by row. Undefined rows
/// are null.
///
/// On an aggregated table this is the sum-then-divide ratio of each group.
pub fn derive_ratio(
    table: &Table,
    numerator: &str,
    denominator: &str,
    output: &str,
) -> Result<Table> {
    let num = table.f64_column(numerator)?;
    let den = table.f64_column(denominator)?;
    let values: Float64Array = num
        .iter()
        .zip(den.iter())
        .map(|(n, d)| ratio(n, d))
        .collect();
    table.with_column(output, Arc::new(values) as ArrayRef)
}

/// How a ratio KPI is reported over several rows.
///
/// `SumThenDivide` is `Σ numerator / Σ denominator`; it weighs every row by
/// its denominator and is the default. `MeanOfRows` averages the per-row
/// ratios; it over-weights small rows and only exists to reproduce legacy
/// figures on purpose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioPolicy {
    #[default]
    SumThenDivide,
    MeanOfRows,
}

impl RatioPolicy {
    /// Resolve one ratio over all rows of `table`.
    ///
    /// Under `SumThenDivide` each column is summed over its own present
    /// values; rows are not paired, so a numerator whose denominator is
    /// missing still counts toward the numerator total.
    pub fn resolve(self, table: &Table, numerator: &str, denominator: &str) -> Result<f64> {
        let num = table.f64_values(numerator)?;
        let den = table.f64_values(denominator)?;
        let value = match self {
            RatioPolicy::SumThenDivide => ratio(fold(AggOp::Sum, num), fold(AggOp::Sum, den)),
            RatioPolicy::MeanOfRows => fold(
                AggOp::Mean,
                num.into_iter().zip(den).map(|(n, d)| ratio(n, d)),
            ),
        };
        value.ok_or_else(|| DashError::UndefinedRatio {
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
        })
    }

    /// Like [`RatioPolicy::resolve`] but undefined becomes `None`.
    pub fn resolve_opt(self, table: &Table, numerator: &str, denominator: &str) -> Result<Option<f64>> {
        match self.resolve(table, numerator, denominator) {
            Ok(v) => Ok(Some(v)),
            Err(DashError::UndefinedRatio { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
