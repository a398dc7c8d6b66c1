//! # **Table Module** - *A schema-ordered set of columns*
//!
//! A `Table` couples a [`Schema`] to the [`Column`]s the decode visitor
//! produced for it. Unlike a single `RecordBatch`, a `Table`'s columns may
//! each hold a different number of underlying batches (one dictionary
//! column can accumulate delta batches the others never see) but must all
//! report the same row count.

use std::fmt;
use std::sync::Arc;

use crate::batch::ScalarValue;
use crate::column::Column;
use crate::error::{ArrowIpcError, Result};
use crate::field::Field;
use crate::schema::Schema;

#[derive(Clone, Debug)]
pub struct Table {
    schema: Schema,
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Builds a table from a schema and matching columns, checked for
    /// row-count agreement and for fields lining up 1:1 with the schema.
    pub fn new(schema: Schema, columns: Vec<Column>) -> Result<Self> {
        if schema.fields.len() != columns.len() {
            return Err(ArrowIpcError::invalid_argument(format!(
                "schema has {} fields but {} columns were supplied",
                schema.fields.len(),
                columns.len()
            )));
        }
        for (field, col) in schema.fields.iter().zip(&columns) {
            if field.name != col.field().name {
                eprintln!(
                    "lightstream-ipc: table column order mismatch: schema field '{}' paired with column '{}'",
                    field.name,
                    col.field().name
                );
            }
        }
        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        for col in &columns {
            if col.len() != n_rows {
                return Err(ArrowIpcError::invalid_argument(format!(
                    "column '{}' has {} rows, expected {n_rows} to match the rest of the table",
                    col.field().name,
                    col.len()
                )));
            }
        }
        Ok(Self { schema, columns, n_rows })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        let idx = self.schema.index_of(name)?;
        Ok(&self.columns[idx])
    }

    pub fn column_at(&self, index: usize) -> Result<&Column> {
        self.columns.get(index).ok_or_else(|| {
            ArrowIpcError::invalid_argument(format!("column index {index} out of bounds for a table with {} columns", self.columns.len()))
        })
    }

    /// Reads row `i` across every column, in schema order.
    pub fn row(&self, i: usize) -> Result<Vec<ScalarValue<'_>>> {
        if i >= self.n_rows {
            return Err(ArrowIpcError::invalid_argument(format!("row {i} out of bounds for a table of {} rows", self.n_rows)));
        }
        self.columns.iter().map(|c| c.at(i)).collect()
    }

    /// Projects a subset of columns by name, in the order requested.
    /// Retained columns are shared by reference (their batches are
    /// `Arc`-backed), so selecting never re-materializes a dictionary.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let mut fields = Vec::with_capacity(names.len());
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let idx = self.schema.index_of(name)?;
            fields.push(self.schema.fields[idx].clone());
            columns.push(self.columns[idx].clone());
        }
        Ok(Table { schema: Schema { version: self.schema.version, fields, metadata: self.schema.metadata.clone() }, columns, n_rows: self.n_rows })
    }

    /// Projects a subset of columns by index, optionally renaming each one
    /// (`None` keeps the original name).
    pub fn select_at(&self, indices: &[usize], rename: Option<&[&str]>) -> Result<Table> {
        if let Some(names) = rename {
            if names.len() != indices.len() {
                return Err(ArrowIpcError::invalid_argument("rename list must have one entry per selected index"));
            }
        }
        let mut fields = Vec::with_capacity(indices.len());
        let mut columns = Vec::with_capacity(indices.len());
        for (k, &idx) in indices.iter().enumerate() {
            let col = self.column_at(idx)?.clone();
            let mut field = self.schema.fields[idx].clone();
            if let Some(names) = rename {
                field.name = names[k].to_string();
            }
            fields.push(field);
            columns.push(col);
        }
        Ok(Table { schema: Schema { version: self.schema.version, fields, metadata: self.schema.metadata.clone() }, columns, n_rows: self.n_rows })
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.schema.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn fields(&self) -> &[Field] {
        &self.schema.fields
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Table [{} rows x {} cols]", self.n_rows, self.columns.len())?;
        for field in &self.schema.fields {
            writeln!(f, "  {field}")?;
        }
        Ok(())
    }
}

/// Builds a table directly from whole [`crate::batch::Batch`] columns, one
/// batch per column (the common case right after decoding a single
/// `RecordBatch` message).
pub fn table_from_columns(schema: Schema, batches: Vec<crate::batch::Batch>) -> Result<Table> {
    if schema.fields.len() != batches.len() {
        return Err(ArrowIpcError::invalid_argument(format!(
            "schema has {} fields but {} column batches were supplied",
            schema.fields.len(),
            batches.len()
        )));
    }
    let columns = schema
        .fields
        .iter()
        .cloned()
        .zip(batches)
        .map(|(field, batch)| Column::new(field, vec![batch]))
        .collect();
    Table::new(schema, columns)
}

/// Appends a second table's batches onto this one's columns, field-by-field,
/// after checking every field lines up by name, type, and nullability.
pub fn concat_tables(first: &Table, second: &Table) -> Result<Table> {
    if first.schema.fields.len() != second.schema.fields.len() {
        return Err(ArrowIpcError::invalid_argument("cannot concatenate tables with a different number of columns"));
    }
    let mut columns = Vec::with_capacity(first.columns.len());
    for (a, b) in first.columns.iter().zip(&second.columns) {
        if a.field().name != b.field().name || a.field().dtype != b.field().dtype || a.field().nullable != b.field().nullable {
            return Err(ArrowIpcError::invalid_argument(format!(
                "cannot concatenate column '{}' with column '{}': field definitions differ",
                a.field().name,
                b.field().name
            )));
        }
        let mut batches: Vec<Arc<crate::batch::Batch>> = a.batches().to_vec();
        batches.extend(b.batches().iter().cloned());
        columns.push(Column::from_shared(a.field().clone(), batches));
    }
    Table::new(first.schema.clone(), columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{Batch, PrimitiveBatch};
    use crate::buffer::Buffer;
    use crate::datatype::DataType;

    fn sample_table() -> Table {
        let schema = Schema::new(vec![
            Field::new("id", DataType::int32(), false, None),
            Field::new("score", DataType::int64(), false, None),
        ]);
        let id = Batch::Int32(PrimitiveBatch::new(Buffer::from(vec![1, 2, 3]), None));
        let score = Batch::Int64(PrimitiveBatch::new(Buffer::from(vec![10i64, 20, 30]), None));
        table_from_columns(schema, vec![id, score]).unwrap()
    }

    #[test]
    fn row_reads_every_column_in_schema_order() {
        let table = sample_table();
        let row = table.row(1).unwrap();
        assert_eq!(row, vec![ScalarValue::Int(2), ScalarValue::Int(20)]);
    }

    #[test]
    fn mismatched_row_counts_are_rejected() {
        let schema = Schema::new(vec![
            Field::new("a", DataType::int32(), false, None),
            Field::new("b", DataType::int32(), false, None),
        ]);
        let a = Column::new(schema.fields[0].clone(), vec![Batch::Int32(PrimitiveBatch::new(Buffer::from(vec![1, 2]), None))]);
        let b = Column::new(schema.fields[1].clone(), vec![Batch::Int32(PrimitiveBatch::new(Buffer::from(vec![1]), None))]);
        assert!(Table::new(schema, vec![a, b]).is_err());
    }

    #[test]
    fn select_preserves_order_and_shares_columns() {
        let table = sample_table();
        let projected = table.select(&["score", "id"]).unwrap();
        assert_eq!(projected.field_names(), vec!["score", "id"]);
        assert_eq!(projected.row(0).unwrap(), vec![ScalarValue::Int(10), ScalarValue::Int(1)]);
    }

    #[test]
    fn select_at_can_rename() {
        let table = sample_table();
        let projected = table.select_at(&[0], Some(&["renamed_id"])).unwrap();
        assert_eq!(projected.field_names(), vec!["renamed_id"]);
    }

    #[test]
    fn concat_appends_batches_per_column() {
        let a = sample_table();
        let b = sample_table();
        let combined = concat_tables(&a, &b).unwrap();
        assert_eq!(combined.n_rows(), 6);
        assert_eq!(combined.row(3).unwrap(), vec![ScalarValue::Int(1), ScalarValue::Int(10)]);
    }
}
