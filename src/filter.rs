use arrow::{
    array::{Array, BooleanArray},
    compute::filter_record_batch,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

use crate::error::{DashError, Result};
use crate::schema::columns::{CATEGORY, PERIOD};
use crate::table::Table;

/// User-chosen inclusion sets for one render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub categories: BTreeSet<i64>,
    /// Only applied to tables that carry a `period` column.
    #[serde(default)]
    pub periods: Option<BTreeSet<String>>,
}

impl Selection {
    pub fn new<I: IntoIterator<Item = i64>>(categories: I) -> Self {
        Self {
            categories: categories.into_iter().collect(),
            periods: None,
        }
    }

    pub fn with_periods<I, S>(mut self, periods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.periods = Some(periods.into_iter().map(Into::into).collect());
        self
    }
}

/// Outcome of a filter pass. An empty result is a normal state the caller
/// decides how to present.
#[derive(Debug, Clone, PartialEq)]
pub enum Filtered {
    Rows(Table),
    /// Nothing matched; carries a zero-row table with the input schema.
    Empty(Table),
}

impl Filtered {
    pub fn is_empty(&self) -> bool {
        matches!(self, Filtered::Empty(_))
    }

    pub fn table(&self) -> &Table {
        match self {
            Filtered::Rows(t) | Filtered::Empty(t) => t,
        }
    }

    /// The matching rows, or `EmptyResultSet` for callers that halt on it.
    pub fn require_rows(self) -> Result<Table> {
        match self {
            Filtered::Rows(t) => Ok(t),
            Filtered::Empty(_) => Err(DashError::EmptyResultSet),
        }
    }
}

/// Distinct categories of `table`, ascending.
pub fn categories_in(table: &Table) -> Result<BTreeSet<i64>> {
    Ok(table.i64_column(CATEGORY)?.iter().flatten().collect())
}

/// Keep rows whose category is selected and, when the table has a period
/// column and the selection names periods, whose period is selected.
#[instrument(level = "debug", skip_all, fields(rows = table.num_rows()))]
pub fn apply(table: &Table, selection: &Selection) -> Result<Filtered> {
    let categories = table.i64_column(CATEGORY)?;
    let periods = match (&selection.periods, table.has_column(PERIOD)) {
        (Some(set), true) => Some((set, table.utf8_column(PERIOD)?)),
        _ => None,
    };

    let mask: BooleanArray = (0..table.num_rows())
        .map(|row| {
            let cat_ok = categories.is_valid(row)
                && selection.categories.contains(&categories.value(row));
            let period_ok = match &periods {
                Some((set, col)) => col.is_valid(row) && set.contains(col.value(row)),
                None => true,
            };
            Some(cat_ok && period_ok)
        })
        .collect();

    let kept = if mask.true_count() == table.num_rows() {
        table.clone()
    } else {
        Table::new(filter_record_batch(table.batch(), &mask)?)
    };
    debug!(kept = kept.num_rows(), "filtered");

    if kept.is_empty() {
        Ok(Filtered::Empty(kept))
    } else {
        Ok(Filtered::Rows(kept))
    }
}
