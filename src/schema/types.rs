// src/schema/types.rs

use arrow::datatypes::{DataType, Field, Schema};
use serde::Serialize;
use std::sync::Arc;

use super::columns::*;
use crate::error::{DashError, Result};
use crate::table::Table;

/// Role of a canonical column, which fixes its Arrow type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnKind {
    /// small integer identifier
    Category,
    /// nullable numeric measure
    Measure,
    /// nullable whole-number tally
    Count,
    /// free text (promo name, month label)
    Label,
}

impl ColumnKind {
    pub fn data_type(self) -> DataType {
        match self {
            ColumnKind::Category => DataType::Int64,
            ColumnKind::Measure => DataType::Float64,
            ColumnKind::Count => DataType::Int64,
            ColumnKind::Label => DataType::Utf8,
        }
    }
}

/// A single canonical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

/// The column set a table must expose before it reaches the filter and
/// aggregation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanonicalSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl CanonicalSchema {
    pub fn arrow_schema(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| Field::new(c.name, c.kind.data_type(), true))
                .collect::<Vec<_>>(),
        )
    }

    /// Check presence and type of every canonical column, then reorder so
    /// canonical columns come first (in schema order) followed by any extra
    /// source columns in their original order.
    pub fn conform(&self, table: &Table) -> Result<Table> {
        let schema = table.schema();
        for c in self.columns {
            let field = schema
                .field_with_name(c.name)
                .map_err(|_| DashError::MissingColumn(c.name.to_string()))?;
            if field.data_type() != &c.kind.data_type() {
                return Err(DashError::ColumnType {
                    column: c.name.to_string(),
                    expected: c.kind.data_type().to_string(),
                    found: field.data_type().to_string(),
                });
            }
        }

        let mut order: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
        for f in schema.fields() {
            if !order.contains(&f.name().as_str()) {
                order.push(f.name().as_str());
            }
        }
        table.select(&order)
    }

    pub fn empty_table(&self) -> Table {
        Table::empty(Arc::new(self.arrow_schema()))
    }
}

pub const YEARLY_SUMMARY: CanonicalSchema = CanonicalSchema {
    name: "yearly_summary",
    columns: &[
        col(CATEGORY, ColumnKind::Category),
        col(SALES_AMOUNT, ColumnKind::Measure),
        col(NOC, ColumnKind::Measure),
        col(QTY_PROMO, ColumnKind::Measure),
        col(CONTRIBUTION_RATIO, ColumnKind::Measure),
        col(NET_SALES, ColumnKind::Measure),
        col(VISIT_CUSTOMER, ColumnKind::Measure),
    ],
};

pub const MONTHLY_SUMMARY: CanonicalSchema = CanonicalSchema {
    name: "monthly_summary",
    columns: &[
        col(CATEGORY, ColumnKind::Category),
        col(PERIOD, ColumnKind::Label),
        col(SALES_AMOUNT, ColumnKind::Measure),
        col(NOC, ColumnKind::Measure),
        col(QTY_PROMO, ColumnKind::Measure),
        col(CONTRIBUTION_RATIO, ColumnKind::Measure),
        col(NET_SALES, ColumnKind::Measure),
        col(VISIT_CUSTOMER, ColumnKind::Measure),
    ],
};

/// Per-promo rows of the ended-promo `Sales` sheet.
pub const ENDED_SALES: CanonicalSchema = CanonicalSchema {
    name: "ended_sales",
    columns: &[
        col(CATEGORY, ColumnKind::Category),
        col(PROMO_NAME, ColumnKind::Label),
        col(TOTAL_COUNT, ColumnKind::Measure),
        col(TOTAL_CLAIM, ColumnKind::Measure),
        col(NOC, ColumnKind::Measure),
        col(SALES_AMOUNT, ColumnKind::Measure),
        col(NET_SALES, ColumnKind::Measure),
        col(CONTRIBUTION_RATIO, ColumnKind::Measure),
    ],
};

/// Per-promo rows of the ended-promo `Qty` sheet.
pub const ENDED_QTY: CanonicalSchema = CanonicalSchema {
    name: "ended_qty",
    columns: &[
        col(CATEGORY, ColumnKind::Category),
        col(PROMO_NAME, ColumnKind::Label),
        col(TOTAL_COUNT, ColumnKind::Measure),
        col(TOTAL_CLAIM, ColumnKind::Measure),
        col(NOC, ColumnKind::Measure),
    ],
};

/// Per-category summary block that some ended-promo workbooks carry below
/// the per-promo block.
pub const CATEGORY_BLOCK: CanonicalSchema = CanonicalSchema {
    name: "category_block",
    columns: &[
        col(CATEGORY, ColumnKind::Category),
        col(PROMO_COUNT, ColumnKind::Count),
        col(TOTAL_COUNT, ColumnKind::Measure),
        col(TOTAL_CLAIM, ColumnKind::Measure),
        col(NOC, ColumnKind::Measure),
        col(SALES_AMOUNT, ColumnKind::Measure),
        col(NET_SALES, ColumnKind::Measure),
        col(CONTRIBUTION_RATIO, ColumnKind::Measure),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};

    #[test]
    fn conform_reorders_and_keeps_extras() {
        let t = Table::from_columns(vec![
            ("No".into(), Arc::new(StringArray::from(vec!["1"])) as ArrayRef),
            (NOC.into(), Arc::new(Float64Array::from(vec![5.0])) as ArrayRef),
            (TOTAL_CLAIM.into(), Arc::new(Float64Array::from(vec![2.0])) as ArrayRef),
            (TOTAL_COUNT.into(), Arc::new(Float64Array::from(vec![4.0])) as ArrayRef),
            (PROMO_NAME.into(), Arc::new(StringArray::from(vec!["A"])) as ArrayRef),
            (CATEGORY.into(), Arc::new(Int64Array::from(vec![11])) as ArrayRef),
        ])
        .unwrap();

        let c = ENDED_QTY.conform(&t).unwrap();
        assert_eq!(
            c.column_names(),
            vec![CATEGORY, PROMO_NAME, TOTAL_COUNT, TOTAL_CLAIM, NOC, "No"]
        );
        assert_eq!(ENDED_QTY.conform(&c).unwrap(), c);
    }

    #[test]
    fn conform_reports_missing_and_mistyped() {
        let t = Table::from_columns(vec![(
            CATEGORY.into(),
            Arc::new(StringArray::from(vec!["11"])) as ArrayRef,
        )])
        .unwrap();
        assert!(matches!(
            ENDED_QTY.conform(&t),
            Err(DashError::ColumnType { column, .. }) if column == CATEGORY
        ));

        let t = Table::from_columns(vec![(
            CATEGORY.into(),
            Arc::new(Int64Array::from(vec![11])) as ArrayRef,
        )])
        .unwrap();
        assert!(matches!(
            ENDED_QTY.conform(&t),
            Err(DashError::MissingColumn(c)) if c == PROMO_NAME
        ));
    }

    #[test]
    fn empty_table_matches_schema() {
        let t = MONTHLY_SUMMARY.empty_table();
        assert!(t.is_empty());
        assert_eq!(MONTHLY_SUMMARY.conform(&t).unwrap(), t);
    }
}
