use arrow::{
    array::{Array, ArrayRef, Float64Builder, Int64Builder, StringArray},
    compute::cast,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::error::Result;
use crate::process::utils;
use crate::table::Table;

/// Target type of a coerced column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericKind {
    Float,
    Integer,
}

impl NumericKind {
    pub fn data_type(self) -> DataType {
        match self {
            NumericKind::Float => DataType::Float64,
            NumericKind::Integer => DataType::Int64,
        }
    }
}

/// Convert the listed columns to their numeric type.
///
/// Text cells that do not parse become nulls and are counted, never zero.
/// Columns already of the target type pass through untouched, and columns
/// absent from the table are skipped.
pub fn coerce_columns(table: &Table, targets: &[(String, NumericKind)]) -> Result<Table> {
    let batch = table.batch();
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut out = Vec::with_capacity(batch.num_columns());

    for (arr, fld) in batch.columns().iter().zip(schema.fields()) {
        let target = targets
            .iter()
            .find(|(name, _)| name == fld.name())
            .map(|(_, kind)| *kind);

        let converted = match target {
            Some(kind) if arr.data_type() != &kind.data_type() => {
                coerce_array(fld.name(), arr, kind)?
            }
            _ => arr.clone(),
        };
        fields.push(Field::new(fld.name(), converted.data_type().clone(), true));
        out.push(converted);
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), out)?;
    Ok(Table::new(batch))
}

fn coerce_array(name: &str, arr: &ArrayRef, kind: NumericKind) -> Result<ArrayRef> {
    let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() else {
        // numeric → numeric widening/narrowing
        return Ok(cast(arr, &kind.data_type())?);
    };

    let mut failures = 0usize;
    let converted: ArrayRef = match kind {
        NumericKind::Float => {
            let mut b = Float64Builder::with_capacity(sarr.len());
            for opt in sarr.iter() {
                let v = opt.and_then(utils::parse_number);
                if opt.is_some() && v.is_none() {
                    failures += 1;
                }
                b.append_option(v);
            }
            Arc::new(b.finish())
        }
        NumericKind::Integer => {
            let mut b = Int64Builder::with_capacity(sarr.len());
            for opt in sarr.iter() {
                let v = opt.and_then(utils::parse_integer);
                if opt.is_some() && v.is_none() {
                    failures += 1;
                }
                b.append_option(v);
            }
            Arc::new(b.finish())
        }
    };

    if failures > 0 {
        warn!(column = name, failures, "non-numeric cells coerced to missing");
    }
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> Table {
        Table::from_columns(vec![
            (
                "Category".into(),
                Arc::new(StringArray::from(vec![Some("11"), Some("14.0"), Some("x")])) as ArrayRef,
            ),
            (
                "Sales Amount".into(),
                Arc::new(StringArray::from(vec![Some("1500"), Some("-"), None])) as ArrayRef,
            ),
            (
                "Promo Name".into(),
                Arc::new(StringArray::from(vec![Some("A"), Some("B"), Some("C")])) as ArrayRef,
            ),
        ])
        .unwrap()
    }

    fn targets() -> Vec<(String, NumericKind)> {
        vec![
            ("Category".into(), NumericKind::Integer),
            ("Sales Amount".into(), NumericKind::Float),
            ("Not There".into(), NumericKind::Float),
        ]
    }

    #[test]
    fn failures_become_missing() {
        let t = coerce_columns(&raw(), &targets()).unwrap();
        assert_eq!(t.i64_values("Category").unwrap(), vec![Some(11), Some(14), None]);
        assert_eq!(t.f64_values("Sales Amount").unwrap(), vec![Some(1500.0), None, None]);
        assert_eq!(t.utf8_column("Promo Name").unwrap().len(), 3);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let once = coerce_columns(&raw(), &targets()).unwrap();
        let twice = coerce_columns(&once, &targets()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn integer_columns_widen_to_float() {
        let t = coerce_columns(&raw(), &[("Category".into(), NumericKind::Integer)]).unwrap();
        let t = coerce_columns(&t, &[("Category".into(), NumericKind::Float)]).unwrap();
        assert_eq!(t.f64_values("Category").unwrap(), vec![Some(11.0), Some(14.0), None]);
    }
}
