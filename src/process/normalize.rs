use arrow::{
    array::{Array, BooleanArray},
    compute::filter_record_batch,
    datatypes::{Field, Schema},
    record_batch::RecordBatch,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::process::convert::{coerce_columns, NumericKind};
use crate::table::Table;

/// How one sheet variant maps onto its canonical schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeSpec {
    /// legacy header → canonical name
    #[serde(default)]
    pub renames: BTreeMap<String, String>,
    /// canonical names coerced to nullable `Float64`
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    /// canonical names coerced to nullable `Int64`
    #[serde(default)]
    pub integer_columns: Vec<String>,
    /// rows with a null in any of these are dropped
    #[serde(default)]
    pub required_columns: Vec<String>,
}

/// Reconcile a raw table with its canonical schema:
///
/// 1) rename legacy headers,
/// 2) coerce numeric columns, failures becoming nulls,
/// 3) drop rows that are entirely blank or lack a required value.
///
/// Running it on its own output changes nothing.
#[instrument(level = "debug", skip_all, fields(rows = table.num_rows()))]
pub fn normalize(table: &Table, spec: &NormalizeSpec) -> Result<Table> {
    let renamed = rename_columns(table, &spec.renames)?;

    let targets: Vec<(String, NumericKind)> = spec
        .numeric_columns
        .iter()
        .map(|c| (c.clone(), NumericKind::Float))
        .chain(
            spec.integer_columns
                .iter()
                .map(|c| (c.clone(), NumericKind::Integer)),
        )
        .collect();
    let coerced = coerce_columns(&renamed, &targets)?;

    let kept = drop_incomplete_rows(&coerced, &spec.required_columns)?;
    debug!(
        dropped = coerced.num_rows() - kept.num_rows(),
        "normalized"
    );
    Ok(kept)
}

/// Rename columns found in `renames`. A rename whose target already exists
/// is skipped so that no two columns share a name.
pub fn rename_columns(table: &Table, renames: &BTreeMap<String, String>) -> Result<Table> {
    let schema = table.schema();
    let mut names: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();

    for (i, field) in schema.fields().iter().enumerate() {
        let Some(target) = renames.get(field.name()) else {
            continue;
        };
        if target == field.name() {
            continue;
        }
        if names.iter().any(|n| n == target) {
            warn!(from = %field.name(), to = %target, "rename target already present; keeping both names");
            continue;
        }
        names[i] = target.clone();
    }

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .zip(&names)
        .map(|(f, name)| Field::new(name, f.data_type().clone(), f.is_nullable()))
        .collect();
    let batch = RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        table.batch().columns().to_vec(),
    )?;
    Ok(Table::new(batch))
}

/// Keep rows that have at least one non-null cell and a value in every
/// `required` column present in the table.
pub fn drop_incomplete_rows(table: &Table, required: &[String]) -> Result<Table> {
    let batch = table.batch();
    let required_cols: Vec<_> = required
        .iter()
        .filter_map(|name| batch.column_by_name(name))
        .collect();

    let mask: BooleanArray = (0..batch.num_rows())
        .map(|row| {
            let any = batch.columns().iter().any(|c| c.is_valid(row));
            let complete = required_cols.iter().all(|c| c.is_valid(row));
            Some(any && complete)
        })
        .collect();

    if mask.true_count() == batch.num_rows() {
        return Ok(table.clone());
    }
    Ok(Table::new(filter_record_batch(batch, &mask)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, StringArray};

    fn raw_qty() -> Table {
        let col = |v: Vec<Option<&str>>| Arc::new(StringArray::from(v)) as ArrayRef;
        Table::from_columns(vec![
            ("Cat".into(), col(vec![Some("11"), None, None, Some("14")])),
            (
                "Nama Promo".into(),
                col(vec![Some("Promo A"), None, Some("Orphan"), Some("Promo B")]),
            ),
            (
                "Total Count".into(),
                col(vec![Some("120"), None, Some("3"), Some("oops")]),
            ),
        ])
        .unwrap()
    }

    fn spec() -> NormalizeSpec {
        NormalizeSpec {
            renames: BTreeMap::from([
                ("Cat".to_string(), "category".to_string()),
                ("Nama Promo".to_string(), "promo_name".to_string()),
                ("Total Count".to_string(), "total_count".to_string()),
            ]),
            numeric_columns: vec!["total_count".into()],
            integer_columns: vec!["category".into()],
            required_columns: vec!["category".into()],
        }
    }

    #[test]
    fn renames_coerces_and_drops() {
        let t = normalize(&raw_qty(), &spec()).unwrap();
        assert_eq!(t.column_names(), vec!["category", "promo_name", "total_count"]);
        // blank row and category-less row are gone
        assert_eq!(t.i64_values("category").unwrap(), vec![Some(11), Some(14)]);
        assert_eq!(t.f64_values("total_count").unwrap(), vec![Some(120.0), None]);
    }

    #[test]
    fn idempotent() {
        let once = normalize(&raw_qty(), &spec()).unwrap();
        let twice = normalize(&once, &spec()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rename_never_duplicates_names() {
        let col = |v: Vec<Option<&str>>| Arc::new(StringArray::from(v)) as ArrayRef;
        let t = Table::from_columns(vec![
            ("Jumlah Promo".into(), col(vec![Some("1")])),
            ("qty_promo".into(), col(vec![Some("2")])),
        ])
        .unwrap();
        let renames = BTreeMap::from([("Jumlah Promo".to_string(), "qty_promo".to_string())]);
        let out = rename_columns(&t, &renames).unwrap();
        assert_eq!(out.column_names(), vec!["Jumlah Promo", "qty_promo"]);
    }
}
