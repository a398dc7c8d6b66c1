//! # **Builder Module** - *Construct batches, columns, and tables from ordinary values*
//!
//! The inverse of [`crate::decode`]: instead of turning wire bytes into
//! [`crate::batch::Batch`]es, this module turns plain [`Value`] rows into
//! them. [`table_from_arrays`] is the top-level entry point; it infers a
//! type per column when none is supplied, splits each column into batches
//! of at most `max_batch_rows`, and resolves dictionary sharing across
//! columns in a single finalization pass once every column has finished
//! interning.

pub mod binary;
pub mod dictionary;
pub mod infer;
pub mod nested;
pub mod primitive;
pub mod validity;

use std::sync::Arc;

use crate::batch::Batch;
use crate::column::Column;
use crate::datatype::DataType;
use crate::error::{ArrowIpcError, Result};
use crate::field::Field;
use crate::hashmap::HashMap;
use crate::schema::Schema;
use crate::table::Table;

use dictionary::{build_index_batch, wrap_dictionary_batch, DictionaryBuilder};
use infer::infer_type;

/// An ordinary in-memory value a builder can turn into batch storage.
/// Dates, timestamps, durations, and interval ticks are all represented as
/// `Int` (already in the unit the target type expects); see
/// [`primitive::pack_day_time`]-style helpers for the interval packing
/// convention when round-tripping a decoded value back through a builder.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
    Utf8(String),
    List(Vec<Value>),
    Struct(Vec<(String, Value)>),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ColumnBuilderOptions {
    /// Bounds the row count of each batch this column is split into. `None`
    /// emits the whole column as a single batch.
    pub max_batch_rows: Option<usize>,
}

/// Shared state for dictionaries declared under a non-negative id: every
/// column whose `DataType::Dictionary` names the same id interns into the
/// same builder, so a value one column already saw reuses that column's
/// index instead of creating a duplicate entry.
#[derive(Default)]
pub(crate) struct BuilderContext {
    shared: HashMap<i64, DictionaryBuilder>,
}

impl BuilderContext {
    /// Positive dictionary ids are shared across columns, but only when
    /// every column declaring that id agrees on `value_type`/`ordered` —
    /// spec requires positive ids to be unique, so a later column
    /// supplying a different shape is a caller error, not something to
    /// silently paper over by keeping the first-registered builder.
    fn builder_for(&mut self, id: i64, value_type: &DataType, ordered: bool) -> Result<&mut DictionaryBuilder> {
        if let Some(existing) = self.shared.get(&id) {
            if existing.value_type() != value_type || existing.ordered() != ordered {
                return Err(ArrowIpcError::invalid_argument(format!(
                    "dictionary id {id} already registered with a different value_type/ordered"
                )));
            }
        }
        Ok(self.shared.entry(id).or_insert_with(|| DictionaryBuilder::new(value_type.clone(), ordered)))
    }
}

/// Function-pointer form of [`build_value_batch`], threaded into the
/// nested-type builders so they can recurse into child types without
/// capturing `ctx` in a closure (two sibling children would otherwise need
/// two simultaneous mutable borrows of the same context).
pub(crate) type Recurse = fn(&DataType, &[Value], &mut BuilderContext) -> Result<Batch>;

/// Recursively builds one [`Batch`] of `dtype` from `values`, dispatching
/// to the per-layout builder in [`primitive`], [`binary`], [`nested`], or
/// [`dictionary`]. Dictionary columns with a non-negative id intern through
/// `ctx` instead of building their own isolated values batch.
fn build_value_batch(dtype: &DataType, values: &[Value], ctx: &mut BuilderContext) -> Result<Batch> {
    match dtype {
        DataType::Null => Ok(Batch::Null { len: values.len() }),
        DataType::Boolean => primitive::build_boolean(values),
        DataType::Int { bit_width, signed } => primitive::build_int(*bit_width, *signed, values),
        DataType::Float { bit_width } => primitive::build_float(*bit_width, values),
        DataType::Decimal { bit_width, precision, scale } => primitive::build_decimal(*bit_width, *precision, *scale, values),
        DataType::Date { unit } => primitive::build_date(*unit, values),
        DataType::Time { bit_width, unit } => primitive::build_time(*bit_width, *unit, values),
        DataType::Timestamp { .. } => primitive::build_timestamp(values),
        DataType::Duration { .. } => primitive::build_duration(values),
        DataType::Interval { unit } => primitive::build_interval(*unit, values),
        DataType::Binary { large } => binary::build_binary(*large, values),
        DataType::Utf8 { large } => binary::build_utf8(*large, values),
        DataType::FixedSizeBinary { byte_width } => primitive::build_fixed_size_binary(*byte_width, values),
        DataType::List { field, large } => nested::build_list(field, *large, values, ctx, build_value_batch),
        DataType::FixedSizeList { field, size } => nested::build_fixed_size_list(field, *size, values, ctx, build_value_batch),
        DataType::Struct { fields } => nested::build_struct(fields, values, ctx, build_value_batch),
        DataType::Union { mode, fields, type_ids } => nested::build_union(*mode, fields, type_ids, values, ctx, build_value_batch),
        DataType::Map { entries, keys_sorted } => nested::build_map(entries, *keys_sorted, values, ctx, build_value_batch),
        DataType::RunEndEncoded { run_ends, values: values_field } => {
            nested::build_run_end_encoded(run_ends, values_field, values, ctx, build_value_batch)
        }
        DataType::Dictionary { value_type, index_type, ordered, id } => {
            build_dictionary_batch(value_type, index_type, *ordered, *id, values, ctx)
        }
        DataType::BinaryView | DataType::Utf8View | DataType::ListView { .. } => Err(ArrowIpcError::unsupported(format!(
            "the builder does not synthesize the {dtype} view layout; construct it directly or decode it from IPC bytes"
        ))),
    }
}

fn build_dictionary_batch(
    value_type: &DataType,
    index_type: &DataType,
    ordered: bool,
    id: i64,
    values: &[Value],
    ctx: &mut BuilderContext,
) -> Result<Batch> {
    if id >= 0 {
        let indices: Vec<i64> = {
            let builder = ctx.builder_for(id, value_type, ordered)?;
            values.iter().map(|v| builder.intern(v.clone())).collect()
        };
        let index_batch = build_index_batch(index_type, &indices)?;
        // The values batch is a placeholder here; the real, shared values
        // batch is substituted during `finalize_shared_dictionaries` once
        // every column referencing this id has finished interning.
        Ok(wrap_dictionary_batch(id, ordered, index_batch, Batch::Null { len: 0 }))
    } else {
        let mut local = DictionaryBuilder::new(value_type.clone(), ordered);
        let indices: Vec<i64> = values.iter().map(|v| local.intern(v.clone())).collect();
        let index_batch = build_index_batch(index_type, &indices)?;
        let (_, values_batch, _) = local.finalize(|dtype, rows| build_value_batch(dtype, rows, ctx))?;
        Ok(wrap_dictionary_batch(id, ordered, index_batch, values_batch))
    }
}

/// Replaces every placeholder shared-dictionary values batch in `batch`
/// with the real, finalized one for its id.
fn substitute_shared_values(batch: Batch, finalized: &HashMap<i64, Arc<Batch>>) -> Batch {
    match batch {
        Batch::Dictionary(mut d) => {
            if let Some(values) = finalized.get(&d.id) {
                d.values = values.clone();
            }
            Batch::Dictionary(d)
        }
        other => other,
    }
}

fn split_into_batches(dtype: &DataType, values: &[Value], max_rows: Option<usize>, ctx: &mut BuilderContext) -> Result<Vec<Batch>> {
    let chunk_size = max_rows.filter(|n| *n > 0).unwrap_or(values.len().max(1));
    if values.is_empty() {
        return Ok(vec![build_value_batch(dtype, values, ctx)?]);
    }
    values.chunks(chunk_size).map(|chunk| build_value_batch(dtype, chunk, ctx)).collect()
}

/// Builds a single column from a name, an optional explicit type (inferred
/// from the data when omitted), and its values.
pub fn column_from_values(name: impl Into<String>, dtype: Option<DataType>, values: &[Value], options: ColumnBuilderOptions) -> Result<Column> {
    let dtype = match dtype {
        Some(d) => d,
        None => infer_type(values)?,
    };
    let nullable = values.iter().any(|v| matches!(v, Value::Null));
    let field = Field::new(name, dtype.clone(), nullable, None);
    let mut ctx = BuilderContext::default();
    let batches = split_into_batches(&dtype, values, options.max_batch_rows, &mut ctx)?;
    let finalized = finalize_shared_dictionaries(ctx)?;
    let batches: Vec<Batch> = batches.into_iter().map(|b| substitute_shared_values(b, &finalized)).collect();
    Ok(Column::new(field, batches))
}

/// Builds a single column from a homogeneous array of already-typed raw
/// values. Equivalent to [`column_from_values`] but named for the public
/// surface's "known element type" entry point.
pub fn column_from_array(name: impl Into<String>, dtype: DataType, values: &[Value], options: ColumnBuilderOptions) -> Result<Column> {
    column_from_values(name, Some(dtype), values, options)
}

/// Builds a whole table from named columns of values, type-inferring any
/// column whose type is not supplied and resolving dictionary sharing
/// across all of them in one finalization pass.
pub fn table_from_arrays(columns: &[(&str, Option<DataType>, &[Value])], options: ColumnBuilderOptions) -> Result<Table> {
    let mut ctx = BuilderContext::default();
    let mut fields = Vec::with_capacity(columns.len());
    let mut per_column_batches: Vec<Vec<Batch>> = Vec::with_capacity(columns.len());

    for (name, dtype, values) in columns {
        let dtype = match dtype {
            Some(d) => d.clone(),
            None => infer_type(values)?,
        };
        let nullable = values.iter().any(|v| matches!(v, Value::Null));
        fields.push(Field::new(*name, dtype.clone(), nullable, None));
        per_column_batches.push(split_into_batches(&dtype, values, options.max_batch_rows, &mut ctx)?);
    }

    let finalized = finalize_shared_dictionaries(ctx)?;
    let columns: Vec<Column> = fields
        .into_iter()
        .zip(per_column_batches)
        .map(|(field, batches)| {
            let resolved: Vec<Batch> =
                batches.into_iter().map(|b| substitute_shared_values(b, &finalized)).collect();
            Column::new(field, resolved)
        })
        .collect();

    let schema = Schema::new(fields_of(&columns));
    Table::new(schema, columns)
}

fn fields_of(columns: &[Column]) -> Vec<Field> {
    columns.iter().map(|c| c.field().clone()).collect()
}

fn finalize_shared_dictionaries(ctx: BuilderContext) -> Result<HashMap<i64, Arc<Batch>>> {
    let mut finalized = HashMap::with_capacity(ctx.shared.len());
    let mut inner_ctx = BuilderContext::default();
    for (id, builder) in ctx.shared {
        let (_, values_batch, _) = builder.finalize(|dtype, rows| build_value_batch(dtype, rows, &mut inner_ctx))?;
        finalized.insert(id, Arc::new(values_batch));
    }
    Ok(finalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_from_values_infers_int_type() {
        let values = vec![Value::Int(1), Value::Int(2), Value::Null];
        let col = column_from_values("n", None, &values, ColumnBuilderOptions::default()).unwrap();
        assert_eq!(col.len(), 3);
        assert_eq!(col.null_count(), 1);
    }

    #[test]
    fn max_batch_rows_splits_a_column_into_several_batches() {
        let values = vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4), Value::Int(5)];
        let col = column_from_values("n", None, &values, ColumnBuilderOptions { max_batch_rows: Some(2) }).unwrap();
        assert_eq!(col.batches().len(), 3);
        assert_eq!(col.len(), 5);
    }

    #[test]
    fn table_from_arrays_builds_a_multi_column_table() {
        let ids = vec![Value::Int(1), Value::Int(2)];
        let names = vec![Value::Utf8("a".to_string()), Value::Utf8("b".to_string())];
        let table = table_from_arrays(&[("id", None, &ids), ("name", None, &names)], ColumnBuilderOptions::default()).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.field_names(), vec!["id", "name"]);
    }

    #[test]
    fn shared_dictionary_id_interns_once_across_columns() {
        let dict_type = DataType::dictionary(DataType::utf8(), DataType::int32(), false, 3).unwrap();
        let col_a = vec![Value::Utf8("red".to_string()), Value::Utf8("blue".to_string())];
        let col_b = vec![Value::Utf8("blue".to_string()), Value::Utf8("red".to_string())];
        let table = table_from_arrays(
            &[("a", Some(dict_type.clone()), &col_a), ("b", Some(dict_type), &col_b)],
            ColumnBuilderOptions::default(),
        )
        .unwrap();
        assert_eq!(table.row(0).unwrap()[0], table.row(1).unwrap()[1]);
    }

    #[test]
    fn unsupported_view_layout_is_rejected() {
        let values: Vec<Value> = vec![];
        let mut ctx = BuilderContext::default();
        assert!(build_value_batch(&DataType::BinaryView, &values, &mut ctx).is_err());
    }
}
