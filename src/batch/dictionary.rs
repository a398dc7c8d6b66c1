//! `Dictionary(index_type, value_type, ordered, id)`: an indices batch over
//! a shared, out-of-band dictionary of values resolved by id from the
//! stream's running dictionary table (see
//! [`crate::decode::visitor`]).

use std::sync::Arc;

use crate::error::{ArrowIpcError, Result};

use super::Batch;

#[derive(Clone, Debug)]
pub struct DictionaryBatch {
    pub id: i64,
    pub ordered: bool,
    /// Integer indices into `values`, one of `Batch::Int{8,16,32,64}`.
    pub indices: Arc<Batch>,
    pub values: Arc<Batch>,
}

impl DictionaryBatch {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        self.indices.null_count()
    }

    pub fn is_valid(&self, i: usize) -> bool {
        self.indices.is_valid(i)
    }

    fn index_at(&self, i: usize) -> Result<Option<i64>> {
        match self.indices.as_ref() {
            Batch::Int8(b) => Ok(b.get(i).map(|v| v as i64)),
            Batch::Int16(b) => Ok(b.get(i).map(|v| v as i64)),
            Batch::Int32(b) => Ok(b.get(i).map(|v| v as i64)),
            Batch::Int64(b) => Ok(b.get(i)),
            Batch::UInt8(b) => Ok(b.get(i).map(|v| v as i64)),
            Batch::UInt16(b) => Ok(b.get(i).map(|v| v as i64)),
            Batch::UInt32(b) => Ok(b.get(i).map(|v| v as i64)),
            other => Err(ArrowIpcError::format(format!(
                "dictionary indices must be integers, found {}",
                other.datatype_name()
            ))),
        }
    }

    /// Resolves row `i` to its position within the dictionary's value batch,
    /// or `None` if the row is itself null.
    pub fn resolve(&self, i: usize) -> Result<Option<usize>> {
        match self.index_at(i)? {
            None => Ok(None),
            Some(idx) => {
                if idx < 0 || idx as usize >= self.values.len() {
                    return Err(ArrowIpcError::dictionary(format!(
                        "dictionary index {idx} out of range for {}-row dictionary",
                        self.values.len()
                    )));
                }
                Ok(Some(idx as usize))
            }
        }
    }

    pub fn slice(&self, start: usize, len: usize) -> Self {
        Self {
            id: self.id,
            ordered: self.ordered,
            indices: Arc::new(self.indices.slice(start, len)),
            values: self.values.clone(),
        }
    }
}
