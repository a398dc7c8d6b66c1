//! # **FlatBuffers Reader** - *Minimal table/vtable decoder*
//!
//! This crate does not depend on the `flatbuffers` crate or generated code;
//! Arrow's IPC messages use a small enough slice of the format (tables,
//! vtables, vectors, strings, no unions-of-tables beyond what
//! [`crate::wire::message`] handles explicitly) that a direct reader is both
//! simpler and keeps the dependency stack aligned with the rest of this
//! crate's hand-rolled wire codecs.
//!
//! Every accessor takes a "slot" as the vtable-relative byte offset
//! (`4`, `6`, `8`, ...) the way generated FlatBuffers code names its
//! `VT_*` constants, not a 0-based field index.

use crate::bytes::{read_i16, read_i32, read_i8, read_u8};
use crate::error::{ArrowIpcError, Result};

/// A FlatBuffers table view over a byte slice: the absolute position of the
/// table's root `soffset_t` indirection.
#[derive(Clone, Copy, Debug)]
pub struct Table<'a> {
    pub buf: &'a [u8],
    pub pos: usize,
}

impl<'a> Table<'a> {
    pub fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Reads a root table offset: `pos = offset + i32(offset)`.
    pub fn root(buf: &'a [u8], offset: usize) -> Result<Self> {
        let delta = read_i32(buf, offset)?;
        let pos = checked_add(offset, delta)?;
        Ok(Self { buf, pos })
    }

    /// `vtable = pos - i32(pos)`.
    fn vtable_pos(&self) -> Result<usize> {
        let delta = read_i32(self.buf, self.pos)?;
        checked_sub(self.pos, delta)
    }

    fn vtable_size(&self) -> Result<i16> {
        let vt = self.vtable_pos()?;
        read_i16(self.buf, vt)
    }

    /// Absolute byte position of field `slot`, or `None` if the vtable is too
    /// short for this slot or the stored offset is zero (field absent).
    fn field_pos(&self, slot: u16) -> Result<Option<usize>> {
        let vt_size = self.vtable_size()?;
        if (slot as i16) >= vt_size {
            return Ok(None);
        }
        let vt = self.vtable_pos()?;
        let field_offset = read_i16(self.buf, vt + slot as usize)?;
        if field_offset == 0 {
            return Ok(None);
        }
        Ok(Some(self.pos + field_offset as usize))
    }

    pub fn read_bool(&self, slot: u16, default: bool) -> Result<bool> {
        match self.field_pos(slot)? {
            Some(p) => Ok(read_u8(self.buf, p)? != 0),
            None => Ok(default),
        }
    }

    pub fn read_i8(&self, slot: u16, default: i8) -> Result<i8> {
        match self.field_pos(slot)? {
            Some(p) => read_i8(self.buf, p),
            None => Ok(default),
        }
    }

    pub fn read_u8(&self, slot: u16, default: u8) -> Result<u8> {
        match self.field_pos(slot)? {
            Some(p) => read_u8(self.buf, p),
            None => Ok(default),
        }
    }

    pub fn read_i16(&self, slot: u16, default: i16) -> Result<i16> {
        match self.field_pos(slot)? {
            Some(p) => crate::bytes::read_i16(self.buf, p),
            None => Ok(default),
        }
    }

    pub fn read_i32(&self, slot: u16, default: i32) -> Result<i32> {
        match self.field_pos(slot)? {
            Some(p) => read_i32(self.buf, p),
            None => Ok(default),
        }
    }

    pub fn read_i64(&self, slot: u16, default: i64) -> Result<i64> {
        match self.field_pos(slot)? {
            Some(p) => crate::bytes::read_i64(self.buf, p),
            None => Ok(default),
        }
    }

    /// Reads a table-valued field: one `soffset_t` indirection to a nested
    /// table's root position.
    pub fn read_table(&self, slot: u16) -> Result<Option<Table<'a>>> {
        match self.field_pos(slot)? {
            Some(p) => {
                let delta = read_i32(self.buf, p)?;
                let nested_pos = checked_add(p, delta)?;
                Ok(Some(Table { buf: self.buf, pos: nested_pos }))
            }
            None => Ok(None),
        }
    }

    /// Reads a string field: `uoffset_t` to a `(length: i32)` followed by
    /// `length` UTF-8 bytes and an implicit trailing NUL (not included in
    /// `length`, not validated here).
    pub fn read_string(&self, slot: u16) -> Result<Option<&'a str>> {
        match self.field_pos(slot)? {
            Some(p) => Ok(Some(read_string_at(self.buf, p)?)),
            None => Ok(None),
        }
    }

    /// Reads a vector field header, returning a [`VectorRef`] over its
    /// `length * stride` payload. Caller supplies the element stride since
    /// this reader carries no schema of field types.
    pub fn read_vector(&self, slot: u16, stride: usize) -> Result<Option<VectorRef<'a>>> {
        match self.field_pos(slot)? {
            Some(p) => Ok(Some(read_vector_at(self.buf, p, stride)?)),
            None => Ok(None),
        }
    }
}

/// A decoded vector header: the absolute start of its `length` elements.
#[derive(Clone, Copy, Debug)]
pub struct VectorRef<'a> {
    pub buf: &'a [u8],
    pub start: usize,
    pub length: usize,
    pub stride: usize,
}

impl<'a> VectorRef<'a> {
    pub fn elem(&self, i: usize) -> &'a [u8] {
        let off = self.start + i * self.stride;
        &self.buf[off..off + self.stride]
    }

    /// Interprets element `i` as a nested table offset (used for vectors of
    /// tables, e.g. `Schema.fields` or `Footer.recordBatches`).
    pub fn table_at(&self, i: usize) -> Result<Table<'a>> {
        let off = self.start + i * self.stride;
        let delta = read_i32(self.buf, off)?;
        let pos = checked_add(off, delta)?;
        Ok(Table { buf: self.buf, pos })
    }

    /// Interprets element `i` as a string offset.
    pub fn string_at(&self, i: usize) -> Result<&'a str> {
        let off = self.start + i * self.stride;
        let delta = read_i32(self.buf, off)?;
        let pos = checked_add(off, delta)?;
        read_string_at(self.buf, pos)
    }
}

fn read_vector_at(buf: &[u8], field_pos: usize, stride: usize) -> Result<VectorRef<'_>> {
    let delta = read_i32(buf, field_pos)?;
    let vec_pos = checked_add(field_pos, delta)?;
    let length = read_i32(buf, vec_pos)?;
    if length < 0 {
        return Err(ArrowIpcError::format(format!("negative vector length {length}")));
    }
    Ok(VectorRef { buf, start: vec_pos + 4, length: length as usize, stride })
}

fn read_string_at(buf: &[u8], field_pos: usize) -> Result<&str> {
    let delta = read_i32(buf, field_pos)?;
    let str_pos = checked_add(field_pos, delta)?;
    let length = read_i32(buf, str_pos)?;
    if length < 0 {
        return Err(ArrowIpcError::format(format!("negative string length {length}")));
    }
    let start = str_pos + 4;
    let end = start + length as usize;
    let bytes = buf
        .get(start..end)
        .ok_or_else(|| ArrowIpcError::format("truncated string payload"))?;
    std::str::from_utf8(bytes).map_err(|e| ArrowIpcError::format(format!("invalid UTF-8 string: {e}")))
}

fn checked_add(base: usize, delta: i32) -> Result<usize> {
    let combined = base as i64 + delta as i64;
    if combined < 0 {
        return Err(ArrowIpcError::format("negative offset indirection"));
    }
    Ok(combined as usize)
}

fn checked_sub(base: usize, delta: i32) -> Result<usize> {
    let combined = base as i64 - delta as i64;
    if combined < 0 {
        return Err(ArrowIpcError::format("negative vtable offset"));
    }
    Ok(combined as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatbuffers::writer::Builder;

    #[test]
    fn roundtrip_scalar_fields() {
        let mut b = Builder::new();
        b.start_table();
        b.push_slot_i32(4, 42, 0);
        b.push_slot_bool(6, true, false);
        let table_pos = b.end_table();
        b.finish(table_pos);
        let buf = b.finished_bytes();

        let root = Table::root(buf, 0).unwrap();
        assert_eq!(root.read_i32(4, 0).unwrap(), 42);
        assert!(root.read_bool(6, false).unwrap());
        // absent field falls back to caller default
        assert_eq!(root.read_i32(8, -1).unwrap(), -1);
    }

    #[test]
    fn roundtrip_string_and_vector() {
        let mut b = Builder::new();
        let s = b.create_string("hello");
        let v = b.create_vector_i32(&[1, 2, 3]);
        b.start_table();
        b.push_slot_offset(4, s);
        b.push_slot_offset(6, v);
        let table_pos = b.end_table();
        b.finish(table_pos);
        let buf = b.finished_bytes();

        let root = Table::root(buf, 0).unwrap();
        assert_eq!(root.read_string(4).unwrap(), Some("hello"));
        let vec_ref = root.read_vector(6, 4).unwrap().unwrap();
        assert_eq!(vec_ref.length, 3);
        assert_eq!(read_i32(vec_ref.buf, vec_ref.start).unwrap(), 1);
    }
}
