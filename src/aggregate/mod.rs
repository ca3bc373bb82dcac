//! Group-by over canonical tables.
//!
//! Missing values follow one rule set everywhere:
//! - `Sum` skips nulls; a group with no values sums to null.
//! - `Mean` skips nulls in both numerator and count; no values → null.
//! - `First` takes the first non-null value in row order.
//! - `Count` counts non-null cells.
//!
//! Ratios are derived after aggregation, see [`ratio`].

pub mod ratio;

pub use ratio::{checked_ratio, derive_ratio, ratio, RatioPolicy};

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{instrument, warn};

use crate::error::Result;
use crate::process::order::period_ordinals;
use crate::process::PeriodDomain;
use crate::schema::columns::{CATEGORY, PERIOD};
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggOp {
    Sum,
    Mean,
    First,
    Count,
}

/// One output column of an aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agg {
    pub column: String,
    pub op: AggOp,
    pub output: String,
}

impl Agg {
    pub fn new(column: &str, op: AggOp) -> Self {
        Self {
            column: column.to_string(),
            op,
            output: column.to_string(),
        }
    }

    pub fn sum(column: &str) -> Self {
        Self::new(column, AggOp::Sum)
    }

    pub fn mean(column: &str) -> Self {
        Self::new(column, AggOp::Mean)
    }

    pub fn first(column: &str) -> Self {
        Self::new(column, AggOp::First)
    }

    pub fn count(column: &str) -> Self {
        Self::new(column, AggOp::Count)
    }

    pub fn alias(mut self, output: &str) -> Self {
        self.output = output.to_string();
        self
    }
}

/// What rows are grouped by. Period grouping needs the domain to validate
/// labels and to order groups chronologically.
#[derive(Debug, Clone, Copy)]
pub enum GroupKey<'a> {
    Category,
    Period(&'a PeriodDomain),
    CategoryPeriod(&'a PeriodDomain),
}

impl GroupKey<'_> {
    fn domain(&self) -> Option<&PeriodDomain> {
        match self {
            GroupKey::Category => None,
            GroupKey::Period(d) | GroupKey::CategoryPeriod(d) => Some(d),
        }
    }

    fn has_category(&self) -> bool {
        matches!(self, GroupKey::Category | GroupKey::CategoryPeriod(_))
    }
}

/// Group `table` by `key` and fold each column in `aggs`.
///
/// Output has the key columns (`category`, `period`) followed by one
/// column per `Agg`, one row per distinct key in natural order: category
/// ascending, then period in domain order. `Count` yields `Int64`, every
/// other op `Float64`.
#[instrument(level = "debug", skip_all, fields(rows = table.num_rows(), key = ?key))]
pub fn aggregate(table: &Table, key: GroupKey<'_>, aggs: &[Agg]) -> Result<Table> {
    let n = table.num_rows();
    let categories: Vec<Option<i64>> = if key.has_category() {
        table.i64_values(CATEGORY)?
    } else {
        vec![Some(0); n]
    };
    let ordinals: Vec<Option<usize>> = match key.domain() {
        Some(domain) => period_ordinals(table, domain)?
            .into_iter()
            .map(Some)
            .collect(),
        None => vec![None; n],
    };

    let mut groups: BTreeMap<(i64, Option<usize>), Vec<usize>> = BTreeMap::new();
    let mut skipped = 0usize;
    for row in 0..n {
        let Some(cat) = categories[row] else {
            skipped += 1;
            continue;
        };
        groups.entry((cat, ordinals[row])).or_default().push(row);
    }
    if skipped > 0 {
        warn!(skipped, "rows without a category left out of aggregation");
    }

    let mut columns: Vec<(String, ArrayRef)> = Vec::with_capacity(aggs.len() + 2);
    if key.has_category() {
        let cats: Int64Array = groups.keys().map(|(c, _)| Some(*c)).collect();
        columns.push((CATEGORY.to_string(), Arc::new(cats)));
    }
    if let Some(domain) = key.domain() {
        let labels: StringArray = groups
            .keys()
            .map(|(_, o)| o.map(|i| domain.labels()[i].as_str()))
            .collect();
        columns.push((PERIOD.to_string(), Arc::new(labels)));
    }

    for agg in aggs {
        let array: ArrayRef = match agg.op {
            AggOp::Count => {
                let source = table.column(&agg.column)?;
                let counts: Int64Array = groups
                    .values()
                    .map(|rows| Some(rows.iter().filter(|&&r| source.is_valid(r)).count() as i64))
                    .collect();
                Arc::new(counts)
            }
            op => {
                let values = table.f64_values(&agg.column)?;
                let folded: Float64Array = groups
                    .values()
                    .map(|rows| fold(op, rows.iter().map(|&r| values[r])))
                    .collect();
                Arc::new(folded)
            }
        };
        columns.push((agg.output.clone(), array));
    }

    Table::from_columns(columns)
}

/// Fold one group's values.
pub fn fold<I>(op: AggOp, values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut present = values.into_iter().flatten();
    match op {
        AggOp::First => present.next(),
        AggOp::Count => Some(present.count() as f64),
        AggOp::Sum | AggOp::Mean => {
            let (sum, count) = present.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            match (op, count) {
                (_, 0) => None,
                (AggOp::Mean, c) => Some(sum / c as f64),
                _ => Some(sum),
            }
        }
    }
}

/// Fold a whole column of `table`.
pub fn column_total(table: &Table, column: &str, op: AggOp) -> Result<Option<f64>> {
    Ok(fold(op, table.f64_values(column)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::columns::*;

    fn opt(v: &[Option<f64>]) -> ArrayRef {
        Arc::new(Float64Array::from(v.to_vec()))
    }

    fn monthly() -> Table {
        Table::from_columns(vec![
            (
                CATEGORY.into(),
                Arc::new(Int64Array::from(vec![14, 11, 11, 14, 11])) as ArrayRef,
            ),
            (
                PERIOD.into(),
                Arc::new(StringArray::from(vec![
                    "February 2025",
                    "February 2025",
                    "January 2025",
                    "January 2025",
                    "January 2025",
                ])) as ArrayRef,
            ),
            (
                SALES_AMOUNT.into(),
                opt(&[Some(40.0), Some(20.0), Some(10.0), Some(30.0), None]),
            ),
            (
                VISIT_CUSTOMER.into(),
                opt(&[Some(100.0), Some(100.0), Some(80.0), Some(80.0), None]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn fold_rules() {
        let vals = [Some(1.0), None, Some(3.0)];
        assert_eq!(fold(AggOp::Sum, vals), Some(4.0));
        assert_eq!(fold(AggOp::Mean, vals), Some(2.0));
        assert_eq!(fold(AggOp::First, [None, Some(7.0), Some(8.0)]), Some(7.0));
        assert_eq!(fold(AggOp::Count, vals), Some(2.0));
        assert_eq!(fold(AggOp::Sum, [None, None]), None);
        assert_eq!(fold(AggOp::Mean, Vec::new()), None);
    }

    #[test]
    fn groups_by_category_and_period_in_natural_order() {
        let domain = PeriodDomain::calendar_year(2025);
        let out = aggregate(
            &monthly(),
            GroupKey::CategoryPeriod(&domain),
            &[Agg::sum(SALES_AMOUNT), Agg::count(SALES_AMOUNT).alias("n")],
        )
        .unwrap();

        assert_eq!(out.column_names(), vec![CATEGORY, PERIOD, SALES_AMOUNT, "n"]);
        assert_eq!(
            out.i64_values(CATEGORY).unwrap(),
            vec![Some(11), Some(11), Some(14), Some(14)]
        );
        assert_eq!(
            out.utf8_values(PERIOD).unwrap(),
            vec![
                Some("January 2025".to_string()),
                Some("February 2025".to_string()),
                Some("January 2025".to_string()),
                Some("February 2025".to_string()),
            ]
        );
        // category 11 January: 10 + missing
        assert_eq!(
            out.f64_values(SALES_AMOUNT).unwrap(),
            vec![Some(10.0), Some(20.0), Some(30.0), Some(40.0)]
        );
        assert_eq!(
            out.i64_values("n").unwrap(),
            vec![Some(1), Some(1), Some(1), Some(1)]
        );
    }

    #[test]
    fn groups_by_period_only() {
        let domain = PeriodDomain::calendar_year(2025);
        let out = aggregate(
            &monthly(),
            GroupKey::Period(&domain),
            &[Agg::sum(SALES_AMOUNT), Agg::mean(VISIT_CUSTOMER)],
        )
        .unwrap();
        assert_eq!(out.column_names(), vec![PERIOD, SALES_AMOUNT, VISIT_CUSTOMER]);
        assert_eq!(
            out.f64_values(SALES_AMOUNT).unwrap(),
            vec![Some(40.0), Some(60.0)]
        );
        assert_eq!(
            out.f64_values(VISIT_CUSTOMER).unwrap(),
            vec![Some(80.0), Some(100.0)]
        );
    }

    #[test]
    fn all_missing_group_stays_missing() {
        let t = Table::from_columns(vec![
            (CATEGORY.into(), Arc::new(Int64Array::from(vec![11, 14])) as ArrayRef),
            (NOC.into(), opt(&[None, Some(5.0)])),
        ])
        .unwrap();
        let out = aggregate(&t, GroupKey::Category, &[Agg::sum(NOC), Agg::first(NOC)]).unwrap();
        assert_eq!(out.f64_values(NOC).unwrap(), vec![None, Some(5.0)]);
    }

    #[test]
    fn empty_table_gives_empty_groups() {
        let t = Table::from_columns(vec![
            (CATEGORY.into(), Arc::new(Int64Array::from(Vec::<i64>::new())) as ArrayRef),
            (NOC.into(), opt(&[])),
        ])
        .unwrap();
        let out = aggregate(&t, GroupKey::Category, &[Agg::sum(NOC)]).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.column_names(), vec![CATEGORY, NOC]);
    }
}
