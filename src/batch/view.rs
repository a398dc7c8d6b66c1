//! `BinaryView`/`Utf8View`: 16-byte view records over one or more variadic
//! data buffers, short strings inlined and long strings referenced by
//! pointer, per the Arrow columnar format's view layout.

use crate::bitmask::Bitmask;
use crate::buffer::Buffer;
use crate::bytes::{read_i32, read_u32};
use crate::error::{ArrowIpcError, Result};

use super::validity::{is_valid, null_count, slice_validity};

/// Strings/bytes up to this length are stored entirely inline in the view
/// record; longer ones store a 4-byte prefix plus an out-of-line pointer.
pub const VIEW_INLINE_THRESHOLD: usize = 12;

#[derive(Clone, Debug)]
pub struct ViewBatch {
    /// `len * 16` bytes: one fixed-layout view record per row.
    pub views: Buffer<u8>,
    /// Out-of-line variadic data buffers, indexed by each long view's
    /// `buffer_index` field.
    pub data_buffers: Vec<Buffer<u8>>,
    pub validity: Option<Bitmask>,
}

impl ViewBatch {
    pub fn len(&self) -> usize {
        self.views.len() / 16
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

    pub fn get_bytes(&self, i: usize) -> Result<Option<&[u8]>> {
        if !self.is_valid(i) {
            return Ok(None);
        }
        let rec = &self.views[i * 16..(i + 1) * 16];
        let length = read_u32(rec, 0)? as usize;
        if length <= VIEW_INLINE_THRESHOLD {
            Ok(Some(&rec[4..4 + length]))
        } else {
            let buffer_index = read_i32(rec, 8)? as usize;
            let offset = read_i32(rec, 12)? as usize;
            let buf = self
                .data_buffers
                .get(buffer_index)
                .ok_or_else(|| ArrowIpcError::format(format!("view row {i} references missing data buffer {buffer_index}")))?;
            Ok(Some(&buf[offset..offset + length]))
        }
    }

    pub fn get_str(&self, i: usize) -> Result<Option<&str>> {
        match self.get_bytes(i)? {
            None => Ok(None),
            Some(bytes) => std::str::from_utf8(bytes)
                .map(Some)
                .map_err(|e| ArrowIpcError::format(format!("invalid UTF-8 at row {i}: {e}"))),
        }
    }

    pub fn slice(&self, start: usize, len: usize) -> Self {
        Self {
            views: self.views.slice(start * 16, len * 16),
            data_buffers: self.data_buffers.clone(),
            validity: slice_validity(&self.validity, start, len),
        }
    }
}

/// Builds one 16-byte view record for a value already known to live
/// entirely within a single variadic data buffer at `offset`.
pub fn encode_view_record(value: &[u8], buffer_index: i32, offset: i32) -> [u8; 16] {
    let mut rec = [0u8; 16];
    rec[0..4].copy_from_slice(&(value.len() as u32).to_le_bytes());
    if value.len() <= VIEW_INLINE_THRESHOLD {
        rec[4..4 + value.len()].copy_from_slice(value);
    } else {
        rec[4..8].copy_from_slice(&value[0..4]);
        rec[8..12].copy_from_slice(&buffer_index.to_le_bytes());
        rec[12..16].copy_from_slice(&offset.to_le_bytes());
    }
    rec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_short_value_round_trips() {
        let rec = encode_view_record(b"short", 0, 0);
        let views = Buffer::from(rec.to_vec());
        let batch = ViewBatch { views, data_buffers: vec![], validity: None };
        assert_eq!(batch.get_bytes(0).unwrap(), Some(&b"short"[..]));
    }

    #[test]
    fn out_of_line_long_value_round_trips() {
        let long_value = b"this value is definitely longer than twelve bytes";
        let data_buf: Buffer<u8> = Buffer::from(long_value.to_vec());
        let rec = encode_view_record(long_value, 0, 0);
        let views = Buffer::from(rec.to_vec());
        let batch = ViewBatch { views, data_buffers: vec![data_buf], validity: None };
        assert_eq!(batch.get_bytes(0).unwrap(), Some(&long_value[..]));
    }
}
