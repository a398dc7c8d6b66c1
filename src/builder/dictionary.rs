//! Dictionary builder: a hash map keyed by each value's canonical string
//! form, assigning monotonically increasing integer keys as new values are
//! seen. Builders for dictionaries declared under the same positive id
//! share one of these, so a value seen in one column reuses the index a
//! sibling column already assigned it.

use std::sync::Arc;

use crate::batch::{Batch, DictionaryBatch};
use crate::datatype::DataType;
use crate::error::Result;
use crate::hashmap::HashMap;

use super::primitive::build_int;
use super::Value;

/// Renders a value the way the dictionary hashes it: scalars by their
/// textual form, arrays bracket-wrapped, objects as a stable `key:value`
/// join over their fields in the order given (callers that need
/// order-independent struct keys should sort fields before building).
pub fn canonical_key(value: &Value) -> String {
    match value {
        Value::Null => "\u{0}null".to_string(),
        Value::Boolean(b) => format!("b:{b}"),
        Value::Int(i) => format!("i:{i}"),
        Value::UInt(u) => format!("u:{u}"),
        Value::Float(f) => format!("f:{f}"),
        Value::Bytes(b) => format!("x:{}", b.iter().map(|byte| format!("{byte:02x}")).collect::<String>()),
        Value::Utf8(s) => format!("s:{s}"),
        Value::List(items) => format!("[{}]", items.iter().map(canonical_key).collect::<Vec<_>>().join(",")),
        Value::Struct(fields) => {
            format!("{{{}}}", fields.iter().map(|(k, v)| format!("{k}:{}", canonical_key(v))).collect::<Vec<_>>().join(","))
        }
    }
}

pub struct DictionaryBuilder {
    value_type: DataType,
    ordered: bool,
    keys: HashMap<String, i64>,
    entries: Vec<Value>,
}

impl DictionaryBuilder {
    pub fn new(value_type: DataType, ordered: bool) -> Self {
        Self { value_type, ordered, keys: HashMap::new(), entries: Vec::new() }
    }

    pub(crate) fn value_type(&self) -> &DataType {
        &self.value_type
    }

    pub(crate) fn ordered(&self) -> bool {
        self.ordered
    }

    /// Returns the integer index for `value`, assigning a fresh one the
    /// first time this canonical key is seen.
    pub fn intern(&mut self, value: Value) -> i64 {
        let key = canonical_key(&value);
        if let Some(existing) = self.keys.get(&key) {
            return *existing;
        }
        let idx = self.entries.len() as i64;
        self.keys.insert(key, idx);
        self.entries.push(value);
        idx
    }

    pub fn values_len(&self) -> usize {
        self.entries.len()
    }

    /// Freezes the dictionary's accumulated values into a values [`Batch`],
    /// consuming the builder. Run once per table, after every column that
    /// shares this dictionary has finished interning.
    pub fn finalize(self, build_batch: impl FnOnce(&DataType, &[Value]) -> Result<Batch>) -> Result<(DataType, Batch, bool)> {
        let values = build_batch(&self.value_type, &self.entries)?;
        Ok((self.value_type, values, self.ordered))
    }
}

/// Builds the index batch for a dictionary column once its values builder
/// has interned every row, choosing the index physical width from
/// `index_type` (always an `Int` per [`DataType::dictionary`]'s own check).
pub fn build_index_batch(index_type: &DataType, indices: &[i64]) -> Result<Batch> {
    let values: Vec<Value> = indices.iter().map(|i| Value::Int(*i)).collect();
    match index_type {
        DataType::Int { bit_width, signed } => build_int(*bit_width, *signed, &values),
        other => unreachable!("DataType::dictionary only ever accepts an Int index type, got {other}"),
    }
}

pub fn wrap_dictionary_batch(id: i64, ordered: bool, indices: Batch, values: Batch) -> Batch {
    Batch::Dictionary(DictionaryBatch { id, ordered, indices: Arc::new(indices), values: Arc::new(values) })
}
