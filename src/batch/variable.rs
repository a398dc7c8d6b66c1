//! Variable-length byte and string batches (`Binary`/`Utf8`, both offset
//! widths): an offsets buffer of length `len + 1` and a contiguous values
//! buffer, where row `i` occupies `values[offsets[i]..offsets[i+1]]`.

use crate::bitmask::Bitmask;
use crate::buffer::Buffer;
use crate::error::{ArrowIpcError, Result};

use super::validity::{is_valid, null_count, slice_validity};

/// `Offset` is `i32` for `Binary`/`Utf8`, `i64` for `LargeBinary`/`LargeUtf8`.
pub trait Offset: Copy + Into<i64> + TryFrom<i64> + Default + 'static {}
impl Offset for i32 {}
impl Offset for i64 {}

#[derive(Clone, Debug)]
pub struct VariableBinaryBatch<O: Offset> {
    pub offsets: Buffer<O>,
    pub values: Buffer<u8>,
    pub validity: Option<Bitmask>,
}

impl<O: Offset> VariableBinaryBatch<O> {
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

    fn bounds(&self, i: usize) -> (usize, usize) {
        let start: i64 = self.offsets[i].into();
        let end: i64 = self.offsets[i + 1].into();
        (start as usize, end as usize)
    }

    pub fn get_bytes(&self, i: usize) -> Option<&[u8]> {
        if !self.is_valid(i) {
            return None;
        }
        let (start, end) = self.bounds(i);
        Some(&self.values[start..end])
    }

    /// Interprets row `i` as UTF-8, per the `Utf8`/`LargeUtf8` contract
    /// (offsets monotonically non-decreasing; content not re-validated here,
    /// only re-decoded).
    pub fn get_str(&self, i: usize) -> Result<Option<&str>> {
        match self.get_bytes(i) {
            None => Ok(None),
            Some(bytes) => std::str::from_utf8(bytes)
                .map(Some)
                .map_err(|e| ArrowIpcError::format(format!("invalid UTF-8 at row {i}: {e}"))),
        }
    }

    pub fn slice(&self, start: usize, len: usize) -> Self
    where
        O: Clone,
    {
        Self {
            offsets: self.offsets.slice(start, len + 1),
            values: self.values.clone(),
            validity: slice_validity(&self.validity, start, len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_sliced_by_offsets() {
        let offsets: Buffer<i32> = Buffer::from(vec![0, 3, 3, 8]);
        let values: Buffer<u8> = Buffer::from(b"foobar42".to_vec());
        let batch = VariableBinaryBatch { offsets, values, validity: None };
        assert_eq!(batch.get_bytes(0), Some(&b"foo"[..]));
        assert_eq!(batch.get_bytes(1), Some(&b""[..]));
        assert_eq!(batch.get_bytes(2), Some(&b"bar42"[..]));
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn utf8_rejects_invalid_bytes() {
        let offsets: Buffer<i32> = Buffer::from(vec![0, 2]);
        let values: Buffer<u8> = Buffer::from(vec![0xFF, 0xFE]);
        let batch = VariableBinaryBatch { offsets, values, validity: None };
        assert!(batch.get_str(0).is_err());
    }
}
