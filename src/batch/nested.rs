//! Nested batch layouts: `List`/`LargeList`, the overlapping-range `*ListView`
//! variants, `FixedSizeList`, `Struct`, `Union` (sparse and dense), `Map`,
//! and `RunEndEncoded`.

use std::sync::Arc;

use crate::bitmask::Bitmask;
use crate::buffer::Buffer;
use crate::datatype::UnionMode;
use crate::error::{ArrowIpcError, Result};
use crate::field::Field;

use super::variable::Offset;
use super::validity::{is_valid, null_count, slice_validity};
use super::Batch;

#[derive(Clone, Debug)]
pub struct ListBatch<O: Offset> {
    pub offsets: Buffer<O>,
    pub child: Arc<Batch>,
    pub validity: Option<Bitmask>,
}

impl<O: Offset> ListBatch<O> {
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        null_count(&self.validity, self.len())
    }

    pub fn is_valid(&self, i: usize) -> bool {
        is_valid(&self.validity, i)
    }

    /// The child's `[start, end)` range backing row `i`.
    pub fn value_range(&self, i: usize) -> (usize, usize) {
        let start: i64 = self.offsets[i].into();
        let end: i64 = self.offsets[i + 1].into();
        (start as usize, end as usize)
    }

    pub fn slice(&self, start: usize, len: usize) -> Self
    where
        O: Clone,
    {
        Self {
            offsets: self.offsets.slice(start, len + 1),
            child: self.child.clone(),
            validity: slice_validity(&self.validity, start, len),
        }
    }
}

/// `ListView`/`LargeListView`: offsets and sizes are independent buffers, so
/// rows may reference overlapping or out-of-order child ranges.
#[derive(Clone, Debug)]
pub struct ListViewBatch<O: Offset> {
    pub offsets: Buffer<O>,
    pub sizes: Buffer<O>,
    pub child: Arc<Batch>,
    pub validity: Option<Bitmask>,
}

impl<O: Offset> ListViewBatch<O> {
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        null_count(&self.validity, self.len())
    }

    pub fn is_valid(&self, i: usize) -> bool {
        is_valid(&self.validity, i)
    }

    pub fn value_range(&self, i: usize) -> (usize, usize) {
        let start: i64 = self.offsets[i].into();
        let size: i64 = self.sizes[i].into();
        (start as usize, (start + size) as usize)
    }

    /// Slicing a list-view only narrows the offsets/sizes window; the child
    /// buffer is untouched since other rows (inside or outside the slice)
    /// may still reference overlapping ranges of it.
    pub fn slice(&self, start: usize, len: usize) -> Self
    where
        O: Clone,
    {
        Self {
            offsets: self.offsets.slice(start, len),
            sizes: self.sizes.slice(start, len),
            child: self.child.clone(),
            validity: slice_validity(&self.validity, start, len),
        }
    }
}

/// `FixedSizeList(child, size)`: every row occupies exactly `size` child
/// slots, including null rows, so the child cursor always advances by
/// `size` regardless of validity.
#[derive(Clone, Debug)]
pub struct FixedSizeListBatch {
    pub size: i32,
    pub len: usize,
    pub child: Arc<Batch>,
    pub validity: Option<Bitmask>,
}

impl FixedSizeListBatch {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn null_count(&self) -> usize {
        null_count(&self.validity, self.len)
    }

    pub fn is_valid(&self, i: usize) -> bool {
        is_valid(&self.validity, i)
    }

    pub fn value_range(&self, i: usize) -> (usize, usize) {
        let w = self.size as usize;
        (i * w, (i + 1) * w)
    }

    pub fn slice(&self, start: usize, len: usize) -> Self {
        Self {
            size: self.size,
            len,
            child: self.child.clone(),
            validity: slice_validity(&self.validity, start, len),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StructBatch {
    pub fields: Arc<Vec<Field>>,
    pub children: Vec<Batch>,
    pub len: usize,
    pub validity: Option<Bitmask>,
}

impl StructBatch {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn null_count(&self) -> usize {
        null_count(&self.validity, self.len)
    }

    pub fn is_valid(&self, i: usize) -> bool {
        is_valid(&self.validity, i)
    }

    pub fn child(&self, name: &str) -> Result<&Batch> {
        let idx = self
            .fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| ArrowIpcError::invalid_argument(format!("no struct field named '{name}'")))?;
        Ok(&self.children[idx])
    }

    pub fn slice(&self, start: usize, len: usize) -> Self {
        Self {
            fields: self.fields.clone(),
            children: self.children.iter().map(|c| c.slice(start, len)).collect(),
            len,
            validity: slice_validity(&self.validity, start, len),
        }
    }
}

/// A union's validity is carried entirely in its child arrays: there is no
/// top-level validity bitmap, so `is_valid` always returns `true` here and
/// nullability is resolved through whichever child the active `type_id`
/// selects.
#[derive(Clone, Debug)]
pub struct UnionBatch {
    pub mode: UnionMode,
    pub fields: Arc<Vec<Field>>,
    pub type_ids: Arc<Vec<i8>>,
    pub children: Vec<Batch>,
    pub type_id_buffer: Buffer<i8>,
    /// `Some` only for `UnionMode::Dense`.
    pub value_offsets: Option<Buffer<i32>>,
}

impl UnionBatch {
    pub fn len(&self) -> usize {
        self.type_id_buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn child_index_for_type_id(&self, type_id: i8) -> Result<usize> {
        self.type_ids
            .iter()
            .position(|&t| t == type_id)
            .ok_or_else(|| ArrowIpcError::format(format!("union type id {type_id} has no matching child")))
    }

    /// Returns `(child_index, index_within_child)` for row `i`.
    pub fn resolve(&self, i: usize) -> Result<(usize, usize)> {
        let type_id = self.type_id_buffer[i];
        let child_idx = self.child_index_for_type_id(type_id)?;
        let value_index = match self.mode {
            UnionMode::Sparse => i,
            UnionMode::Dense => {
                let offsets = self
                    .value_offsets
                    .as_ref()
                    .ok_or_else(|| ArrowIpcError::format("dense union missing value offsets"))?;
                offsets[i] as usize
            }
        };
        Ok((child_idx, value_index))
    }

    pub fn slice(&self, start: usize, len: usize) -> Self {
        match self.mode {
            // Sparse children are parallel to the top-level length, so they slice directly.
            UnionMode::Sparse => Self {
                mode: self.mode,
                fields: self.fields.clone(),
                type_ids: self.type_ids.clone(),
                children: self.children.iter().map(|c| c.slice(start, len)).collect(),
                type_id_buffer: self.type_id_buffer.slice(start, len),
                value_offsets: None,
            },
            // Dense children are independently packed; only the selector
            // buffers narrow, the children stay intact.
            UnionMode::Dense => Self {
                mode: self.mode,
                fields: self.fields.clone(),
                type_ids: self.type_ids.clone(),
                children: self.children.clone(),
                type_id_buffer: self.type_id_buffer.slice(start, len),
                value_offsets: self.value_offsets.as_ref().map(|o| o.slice(start, len)),
            },
        }
    }
}

/// `Map(entries, keys_sorted)`: physically a `List<Struct<key, value>>`.
#[derive(Clone, Debug)]
pub struct MapBatch {
    pub entries_field: Arc<Field>,
    pub keys_sorted: bool,
    pub list: ListBatch<i32>,
}

impl MapBatch {
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        self.list.null_count()
    }

    pub fn is_valid(&self, i: usize) -> bool {
        self.list.is_valid(i)
    }

    pub fn entries_range(&self, i: usize) -> (usize, usize) {
        self.list.value_range(i)
    }

    pub fn slice(&self, start: usize, len: usize) -> Self {
        Self {
            entries_field: self.entries_field.clone(),
            keys_sorted: self.keys_sorted,
            list: self.list.slice(start, len),
        }
    }
}

/// `RunEndEncoded(run_ends, values)`: logical row `i` resolves to the first
/// run whose cumulative end exceeds `i`, found by binary search since runs
/// are strictly increasing.
#[derive(Clone, Debug)]
pub struct RunEndEncodedBatch {
    pub run_ends: Arc<Batch>,
    pub values: Arc<Batch>,
    pub logical_len: usize,
    /// Logical index offset into `run_ends`/`values` (non-zero after slicing).
    pub offset: usize,
}

impl RunEndEncodedBatch {
    pub fn len(&self) -> usize {
        self.logical_len
    }

    pub fn is_empty(&self) -> bool {
        self.logical_len == 0
    }

    /// Binary search over `run_ends` for the run covering logical index `i`.
    pub fn physical_index(&self, i: usize) -> Result<usize> {
        if i >= self.logical_len {
            return Err(ArrowIpcError::invalid_argument(format!(
                "row {i} out of bounds for run-end-encoded batch of length {}",
                self.logical_len
            )));
        }
        let target = (i + self.offset) as i64;
        let n = run_ends_len(&self.run_ends)?;
        let (mut lo, mut hi) = (0usize, n);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let end = run_end_at(&self.run_ends, mid)?;
            if end <= target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo >= n {
            return Err(ArrowIpcError::format("run-end-encoded index exceeds the last run"));
        }
        Ok(lo)
    }

    pub fn slice(&self, start: usize, len: usize) -> Self {
        Self {
            run_ends: self.run_ends.clone(),
            values: self.values.clone(),
            logical_len: len,
            offset: self.offset + start,
        }
    }
}

fn run_ends_len(run_ends: &Batch) -> Result<usize> {
    Ok(run_ends.len())
}

fn run_end_at(run_ends: &Batch, i: usize) -> Result<i64> {
    match run_ends {
        Batch::Int32(b) => Ok(b.get(i).ok_or_else(|| ArrowIpcError::format("null run end"))? as i64),
        Batch::Int64(b) => b.get(i).ok_or_else(|| ArrowIpcError::format("null run end")),
        other => Err(ArrowIpcError::format(format!(
            "run_ends child has unexpected batch kind {}",
            other.datatype_name()
        ))),
    }
}
