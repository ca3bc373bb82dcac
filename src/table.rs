use arrow::{
    array::{Array, ArrayRef, Float64Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use crate::error::{DashError, Result};

/// An ordered set of rows sharing one schema.
///
/// Wraps a single Arrow `RecordBatch`. Arrow nulls are the missing-value
/// marker for every column; a `Table` is never mutated in place, every
/// transformation returns a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    batch: RecordBatch,
}

impl Table {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// A zero-row table with `schema`.
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            batch: RecordBatch::new_empty(schema),
        }
    }

    /// Build a table from named columns. Every field is nullable.
    pub fn from_columns(columns: Vec<(String, ArrayRef)>) -> Result<Self> {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, arr)| Field::new(name, arr.data_type().clone(), true))
            .collect();
        let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, arr)| arr).collect();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(Self { batch })
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.batch.column_by_name(name).is_some()
    }

    pub fn column(&self, name: &str) -> Result<&ArrayRef> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| DashError::MissingColumn(name.to_string()))
    }

    pub fn f64_column(&self, name: &str) -> Result<&Float64Array> {
        let arr = self.column(name)?;
        arr.as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| type_error(name, DataType::Float64, arr.data_type()))
    }

    pub fn i64_column(&self, name: &str) -> Result<&Int64Array> {
        let arr = self.column(name)?;
        arr.as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| type_error(name, DataType::Int64, arr.data_type()))
    }

    pub fn utf8_column(&self, name: &str) -> Result<&StringArray> {
        let arr = self.column(name)?;
        arr.as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| type_error(name, DataType::Utf8, arr.data_type()))
    }

    /// Values of a `Float64` column, nulls as `None`.
    pub fn f64_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.f64_column(name)?.iter().collect())
    }

    pub fn i64_values(&self, name: &str) -> Result<Vec<Option<i64>>> {
        Ok(self.i64_column(name)?.iter().collect())
    }

    pub fn utf8_values(&self, name: &str) -> Result<Vec<Option<String>>> {
        Ok(self
            .utf8_column(name)?
            .iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }

    /// Return a copy with `array` stored under `name`, replacing an existing
    /// column of that name or appending a new one.
    pub fn with_column(&self, name: &str, array: ArrayRef) -> Result<Table> {
        let schema = self.batch.schema();
        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        let mut columns = self.batch.columns().to_vec();
        let field = Field::new(name, array.data_type().clone(), true);

        match schema.index_of(name) {
            Ok(idx) => {
                fields[idx] = field;
                columns[idx] = array;
            }
            Err(_) => {
                fields.push(field);
                columns.push(array);
            }
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(Table { batch })
    }

    /// Project `names`, in that order.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let schema = self.batch.schema();
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let idx = schema
                .index_of(name)
                .map_err(|_| DashError::MissingColumn(name.to_string()))?;
            indices.push(idx);
        }
        Ok(Table {
            batch: self.batch.project(&indices)?,
        })
    }
}

fn type_error(name: &str, expected: DataType, found: &DataType) -> DashError {
    DashError::ColumnType {
        column: name.to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
    }
}
