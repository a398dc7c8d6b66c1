//! Builders for the nested layouts: List/LargeList, FixedSizeList, Struct,
//! Union, Map, and RunEndEncoded. Each one recurses into its child type(s)
//! through the `recurse` function pointer supplied by
//! [`super::build_value_batch`], threading the same dictionary-sharing
//! [`super::BuilderContext`] down into every child.

use crate::batch::{
    Batch, FixedSizeListBatch, ListBatch, MapBatch, RunEndEncodedBatch, StructBatch, UnionBatch,
};
use crate::buffer::Buffer;
use crate::datatype::UnionMode;
use crate::error::{ArrowIpcError, Result};
use crate::field::Field;

use super::primitive::type_mismatch;
use super::validity::ValidityBuilder;
use super::{BuilderContext, Recurse, Value};

fn flatten_list_rows(values: &[Value]) -> Result<(ValidityBuilder, Vec<usize>, Vec<Value>)> {
    let mut validity = ValidityBuilder::with_capacity(values.len());
    let mut lengths = Vec::with_capacity(values.len());
    let mut flattened = Vec::new();
    for v in values {
        match v {
            Value::Null => {
                validity.push(false);
                lengths.push(0);
            }
            Value::List(items) => {
                validity.push(true);
                lengths.push(items.len());
                flattened.extend(items.iter().cloned());
            }
            other => return Err(type_mismatch("List", other)),
        }
    }
    Ok((validity, lengths, flattened))
}

pub fn build_list(field: &Field, large: bool, values: &[Value], ctx: &mut BuilderContext, recurse: Recurse) -> Result<Batch> {
    let (validity, lengths, flattened) = flatten_list_rows(values)?;
    let child = recurse(&field.dtype, &flattened, ctx)?;
    if large {
        let mut offsets = Vec::with_capacity(lengths.len() + 1);
        let mut cursor = 0i64;
        offsets.push(0i64);
        for len in &lengths {
            cursor += *len as i64;
            offsets.push(cursor);
        }
        Ok(Batch::LargeList(ListBatch { offsets: Buffer::from(offsets), child: std::sync::Arc::new(child), validity: validity.finish() }))
    } else {
        let mut offsets = Vec::with_capacity(lengths.len() + 1);
        let mut cursor = 0i64;
        offsets.push(0i32);
        for len in &lengths {
            cursor += *len as i64;
            let next = i32::try_from(cursor)
                .map_err(|_| ArrowIpcError::range("list builder exceeded i32 offset range; use the large variant"))?;
            offsets.push(next);
        }
        Ok(Batch::List(ListBatch { offsets: Buffer::from(offsets), child: std::sync::Arc::new(child), validity: validity.finish() }))
    }
}

/// Builds a FixedSizeList column. Per spec: the child cursor always
/// advances by `size` even for a null row, so a null row contributes
/// `size` null placeholders to the flattened child rather than nothing.
pub fn build_fixed_size_list(field: &Field, size: i32, values: &[Value], ctx: &mut BuilderContext, recurse: Recurse) -> Result<Batch> {
    let stride = size.max(0) as usize;
    let mut validity = ValidityBuilder::with_capacity(values.len());
    let mut flattened = Vec::with_capacity(values.len() * stride);
    for v in values {
        match v {
            Value::Null => {
                validity.push(false);
                flattened.extend(std::iter::repeat(Value::Null).take(stride));
            }
            Value::List(items) => {
                if items.len() != stride {
                    return Err(ArrowIpcError::invalid_argument(format!(
                        "FixedSizeList({stride}) row has {} elements",
                        items.len()
                    )));
                }
                validity.push(true);
                flattened.extend(items.iter().cloned());
            }
            other => return Err(type_mismatch("List", other)),
        }
    }
    let child = recurse(&field.dtype, &flattened, ctx)?;
    Ok(Batch::FixedSizeList(FixedSizeListBatch { size, len: values.len(), child: std::sync::Arc::new(child), validity: validity.finish() }))
}

pub fn build_struct(fields: &[Field], values: &[Value], ctx: &mut BuilderContext, recurse: Recurse) -> Result<Batch> {
    let mut validity = ValidityBuilder::with_capacity(values.len());
    let mut per_field: Vec<Vec<Value>> = fields.iter().map(|_| Vec::with_capacity(values.len())).collect();

    for v in values {
        match v {
            Value::Null => {
                validity.push(false);
                for slot in per_field.iter_mut() {
                    slot.push(Value::Null);
                }
            }
            Value::Struct(entries) => {
                validity.push(true);
                for (i, field) in fields.iter().enumerate() {
                    let found = entries.iter().find(|(name, _)| name == &field.name).map(|(_, v)| v.clone());
                    per_field[i].push(found.unwrap_or(Value::Null));
                }
            }
            other => return Err(type_mismatch("Struct", other)),
        }
    }

    let mut children = Vec::with_capacity(fields.len());
    for (field, rows) in fields.iter().zip(per_field) {
        children.push(recurse(&field.dtype, &rows, ctx)?);
    }
    Ok(Batch::Struct(StructBatch { fields: std::sync::Arc::new(fields.to_vec()), children, len: values.len(), validity: validity.finish() }))
}

/// Classifies a union row by requiring it be a single-entry struct whose
/// one key names the active field. Sparse mode writes every child on every
/// row (nulling the ones not chosen); dense mode writes only the chosen
/// child and records its index in the offsets buffer.
pub fn build_union(mode: UnionMode, fields: &[Field], type_ids: &[i8], values: &[Value], ctx: &mut BuilderContext, recurse: Recurse) -> Result<Batch> {
    let index_of = |name: &str| fields.iter().position(|f| f.name == name);

    let mut type_id_buffer = Vec::with_capacity(values.len());
    match mode {
        UnionMode::Sparse => {
            let mut per_field: Vec<Vec<Value>> = fields.iter().map(|_| Vec::with_capacity(values.len())).collect();
            for v in values {
                let (chosen, inner) = classify(v, &index_of)?;
                type_id_buffer.push(type_ids[chosen]);
                for (i, slot) in per_field.iter_mut().enumerate() {
                    slot.push(if i == chosen { inner.clone() } else { Value::Null });
                }
            }
            let mut children = Vec::with_capacity(fields.len());
            for (field, rows) in fields.iter().zip(per_field) {
                children.push(recurse(&field.dtype, &rows, ctx)?);
            }
            Ok(Batch::Union(UnionBatch {
                mode,
                fields: std::sync::Arc::new(fields.to_vec()),
                type_ids: std::sync::Arc::new(type_ids.to_vec()),
                children,
                type_id_buffer: Buffer::from(type_id_buffer),
                value_offsets: None,
            }))
        }
        UnionMode::Dense => {
            let mut per_field: Vec<Vec<Value>> = fields.iter().map(|_| Vec::new()).collect();
            let mut value_offsets = Vec::with_capacity(values.len());
            for v in values {
                let (chosen, inner) = classify(v, &index_of)?;
                type_id_buffer.push(type_ids[chosen]);
                value_offsets.push(per_field[chosen].len() as i32);
                per_field[chosen].push(inner.clone());
            }
            let mut children = Vec::with_capacity(fields.len());
            for (field, rows) in fields.iter().zip(per_field) {
                children.push(recurse(&field.dtype, &rows, ctx)?);
            }
            Ok(Batch::Union(UnionBatch {
                mode,
                fields: std::sync::Arc::new(fields.to_vec()),
                type_ids: std::sync::Arc::new(type_ids.to_vec()),
                children,
                type_id_buffer: Buffer::from(type_id_buffer),
                value_offsets: Some(Buffer::from(value_offsets)),
            }))
        }
    }
}

fn classify<'v>(value: &'v Value, index_of: &impl Fn(&str) -> Option<usize>) -> Result<(usize, &'v Value)> {
    match value {
        Value::Struct(entries) if entries.len() == 1 => {
            let (name, inner) = &entries[0];
            let idx = index_of(name)
                .ok_or_else(|| ArrowIpcError::invalid_argument(format!("union row names unknown field '{name}'")))?;
            Ok((idx, inner))
        }
        other => Err(ArrowIpcError::invalid_argument(format!(
            "union row must be a single-field struct naming the active variant, got {other:?}"
        ))),
    }
}

/// Builds a Map column as a list of key/value structs, reusing the list
/// builder over the entries struct type.
pub fn build_map(entries_field: &Field, keys_sorted: bool, values: &[Value], ctx: &mut BuilderContext, recurse: Recurse) -> Result<Batch> {
    let list_batch = build_list(entries_field, false, values, ctx, recurse)?;
    let list = match list_batch {
        Batch::List(l) => l,
        _ => unreachable!("build_list with large=false always returns Batch::List"),
    };
    Ok(Batch::Map(MapBatch { entries_field: std::sync::Arc::new(entries_field.clone()), keys_sorted, list }))
}

/// Run-length encodes `values` (one logical value per row) into a
/// RunEndEncoded batch: a run continues while consecutive values are
/// exactly equal, breaking (and starting a new run-ends entry) the first
/// time a value differs.
pub fn build_run_end_encoded(
    run_ends_field: &Field,
    values_field: &Field,
    values: &[Value],
    ctx: &mut BuilderContext,
    recurse: Recurse,
) -> Result<Batch> {
    let mut run_ends = Vec::new();
    let mut run_values = Vec::new();
    let mut current: Option<&Value> = None;

    for (i, v) in values.iter().enumerate() {
        match current {
            Some(last) if last == v => {}
            _ => {
                if current.is_some() {
                    run_ends.push(Value::Int(i as i64));
                }
                run_values.push(v.clone());
                current = Some(v);
            }
        }
    }
    if !values.is_empty() {
        run_ends.push(Value::Int(values.len() as i64));
    }

    let run_ends_batch = recurse(&run_ends_field.dtype, &run_ends, ctx)?;
    let values_batch = recurse(&values_field.dtype, &run_values, ctx)?;
    Ok(Batch::RunEndEncoded(RunEndEncodedBatch {
        run_ends: std::sync::Arc::new(run_ends_batch),
        values: std::sync::Arc::new(values_batch),
        logical_len: values.len(),
        offset: 0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;

    fn leaf_recurse(dtype: &DataType, values: &[Value], _ctx: &mut BuilderContext) -> Result<Batch> {
        let _ = dtype;
        super::super::primitive::build_int(32, true, values)
    }

    #[test]
    fn list_offsets_track_ragged_rows() {
        let field = Field::new("item", DataType::int32(), true, None);
        let values = vec![Value::List(vec![Value::Int(1), Value::Int(2)]), Value::Null, Value::List(vec![Value::Int(3)])];
        let mut ctx = BuilderContext::default();
        let batch = build_list(&field, false, &values, &mut ctx, leaf_recurse).unwrap();
        match batch {
            Batch::List(l) => {
                assert_eq!(l.len(), 3);
                assert!(!l.is_valid(1));
            }
            _ => panic!("expected List"),
        }
    }

    #[test]
    fn run_end_encoded_breaks_on_change() {
        let run_ends_field = Field::new("run_ends", DataType::int32(), false, None);
        let values_field = Field::new("values", DataType::int32(), true, None);
        let rows = vec![Value::Int(5), Value::Int(5), Value::Int(9)];
        let mut ctx = BuilderContext::default();
        let batch = build_run_end_encoded(&run_ends_field, &values_field, &rows, &mut ctx, leaf_recurse).unwrap();
        match batch {
            Batch::RunEndEncoded(b) => {
                assert_eq!(b.logical_len, 3);
                assert_eq!(b.physical_index(0).unwrap(), 0);
                assert_eq!(b.physical_index(2).unwrap(), 1);
            }
            _ => panic!("expected RunEndEncoded"),
        }
    }
}
