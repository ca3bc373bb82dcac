use arrow::{array::UInt32Array, compute::take_record_batch};
use chrono::Month;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{DashError, Result};
use crate::schema::columns::{CATEGORY, PERIOD};
use crate::table::Table;

static PERIOD_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z]+)\s+(\d{4})\s*$").expect("static regex"));

/// The ordered set of month labels a `period` column may hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodDomain {
    labels: Vec<String>,
}

impl PeriodDomain {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// `"January <year>"` through `"December <year>"`.
    pub fn calendar_year(year: i32) -> Self {
        let mut month = Month::January;
        let mut labels = Vec::with_capacity(12);
        for _ in 0..12 {
            labels.push(format!("{} {}", month.name(), year));
            month = month.succ();
        }
        Self { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rank of `label` in the domain.
    pub fn ordinal(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        self.labels.iter().position(|l| l == label)
    }
}

impl Default for PeriodDomain {
    fn default() -> Self {
        Self::calendar_year(2025)
    }
}

/// Split `"March 2025"` into its month and year.
pub fn parse_period_label(label: &str) -> Option<(Month, i32)> {
    let caps = PERIOD_LABEL.captures(label)?;
    let month = caps[1].parse::<Month>().ok()?;
    let year = caps[2].parse::<i32>().ok()?;
    Some((month, year))
}

/// `"March 2025"` → `"March"`; labels that are not month-year pass through.
pub fn month_label(label: &str) -> String {
    match parse_period_label(label) {
        Some((month, _)) => month.name().to_string(),
        None => label.trim().to_string(),
    }
}

/// `"March 2025"` → `"Mar"`.
pub fn short_month_label(label: &str) -> String {
    match parse_period_label(label) {
        Some((month, _)) => month.name()[..3].to_string(),
        None => label.trim().to_string(),
    }
}

/// Ordinal of every row's period. A null or out-of-domain label is an
/// `UnknownPeriod` error: dropping it would silently corrupt the sums.
pub fn period_ordinals(table: &Table, domain: &PeriodDomain) -> Result<Vec<usize>> {
    let periods = table.utf8_column(PERIOD)?;
    periods
        .iter()
        .enumerate()
        .map(|(row, label)| {
            label
                .and_then(|l| domain.ordinal(l))
                .ok_or_else(|| DashError::UnknownPeriod {
                    label: label.unwrap_or("<missing>").to_string(),
                    row,
                })
        })
        .collect()
}

/// Sort by (category ascending, period ordinal ascending). Ties keep their
/// input order.
#[instrument(level = "debug", skip_all, fields(rows = table.num_rows()))]
pub fn order_by_period(table: &Table, domain: &PeriodDomain) -> Result<Table> {
    let ordinals = period_ordinals(table, domain)?;
    let categories = table.i64_values(CATEGORY)?;
    let mut idx: Vec<u32> = (0..table.num_rows() as u32).collect();
    idx.sort_by_key(|&i| {
        let cat = categories[i as usize];
        (cat.is_none(), cat, ordinals[i as usize])
    });
    take_rows(table, idx)
}

/// Sort by category ascending, stable, nulls last.
pub fn order_by_category(table: &Table) -> Result<Table> {
    let categories = table.i64_values(CATEGORY)?;
    let mut idx: Vec<u32> = (0..table.num_rows() as u32).collect();
    idx.sort_by_key(|&i| {
        let cat = categories[i as usize];
        (cat.is_none(), cat)
    });
    take_rows(table, idx)
}

pub(crate) fn take_rows(table: &Table, idx: Vec<u32>) -> Result<Table> {
    let indices = UInt32Array::from(idx);
    Ok(Table::new(take_record_batch(table.batch(), &indices)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use std::sync::Arc;

    fn monthly(rows: &[(i64, &str)]) -> Table {
        Table::from_columns(vec![
            (
                CATEGORY.into(),
                Arc::new(Int64Array::from(rows.iter().map(|r| r.0).collect::<Vec<_>>()))
                    as ArrayRef,
            ),
            (
                PERIOD.into(),
                Arc::new(StringArray::from(rows.iter().map(|r| r.1).collect::<Vec<_>>()))
                    as ArrayRef,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn calendar_domain() {
        let d = PeriodDomain::calendar_year(2025);
        assert_eq!(d.len(), 12);
        assert_eq!(d.labels()[0], "January 2025");
        assert_eq!(d.labels()[11], "December 2025");
        assert_eq!(d.ordinal(" March 2025 "), Some(2));
        assert_eq!(d.ordinal("March 2024"), None);
    }

    #[test]
    fn labels() {
        assert_eq!(parse_period_label("September 2025"), Some((Month::September, 2025)));
        assert_eq!(month_label("September 2025"), "September");
        assert_eq!(short_month_label("September 2025"), "Sep");
        assert_eq!(short_month_label("Q3"), "Q3");
    }

    #[test]
    fn any_input_order_sorts_to_calendar_order() {
        let domain = PeriodDomain::calendar_year(2025);
        // reverse order, two categories interleaved
        let mut rows = Vec::new();
        for label in domain.labels().iter().rev() {
            rows.push((14, label.as_str()));
            rows.push((11, label.as_str()));
        }
        let sorted = order_by_period(&monthly(&rows), &domain).unwrap();

        let cats = sorted.i64_values(CATEGORY).unwrap();
        let periods = sorted.utf8_values(PERIOD).unwrap();
        for (i, label) in domain.labels().iter().enumerate() {
            assert_eq!(cats[i], Some(11));
            assert_eq!(periods[i].as_deref(), Some(label.as_str()));
            assert_eq!(cats[i + 12], Some(14));
            assert_eq!(periods[i + 12].as_deref(), Some(label.as_str()));
        }
    }

    #[test]
    fn unknown_period_is_reported() {
        let domain = PeriodDomain::calendar_year(2025);
        let t = monthly(&[(11, "January 2025"), (11, "Janvier 2025")]);
        match order_by_period(&t, &domain) {
            Err(DashError::UnknownPeriod { label, row }) => {
                assert_eq!(label, "Janvier 2025");
                assert_eq!(row, 1);
            }
            other => panic!("expected UnknownPeriod, got {:?}", other),
        }
    }
}
