//! # **FlatBuffers Writer** - *Arena-style builder with vtable dedup*
//!
//! Mirrors the construction direction of every FlatBuffers implementation:
//! objects are emitted back-to-front (children before the parents that
//! reference them) so a parent can always write a forward `uoffset_t` to
//! something already placed. Internally this builder accumulates bytes in
//! *reverse* into a plain growable `Vec<u8>` (so earlier writes keep stable
//! positions across reallocation) and un-reverses once at [`Builder::finish`].
//!
//! Byte-identical vtables are deduplicated against every vtable emitted so
//! far in the same buffer, the same space-saving FlatBuffers itself performs.

use std::cmp::max;

/// A reference to a previously finished object, usable as a `uoffset_t`
/// target from a later (enclosing) table, vector, or root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Offset(usize);

pub struct Builder {
    buf: Vec<u8>,
    minalign: usize,
    vtables: Vec<(Vec<u8>, usize)>,
    current_fields: Vec<(u16, usize)>,
    finished: Option<Vec<u8>>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            minalign: 1,
            vtables: Vec::new(),
            current_fields: Vec::new(),
            finished: None,
        }
    }

    #[inline]
    fn used(&self) -> usize {
        self.buf.len()
    }

    /// Pushes `bytes` so that, after the final whole-buffer reversal in
    /// [`Builder::finish`], they read back in their original left-to-right
    /// order at this position.
    fn push_bytes_raw(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().rev().copied());
    }

    fn patch_i32(&mut self, start: usize, value: i32) {
        for (i, b) in value.to_le_bytes().iter().rev().enumerate() {
            self.buf[start + i] = *b;
        }
    }

    /// Pads so the next `additional_bytes`-sized write lands `align`-aligned
    /// in the final buffer, and tracks the builder's overall minimum
    /// alignment for [`Builder::finish`].
    fn prep(&mut self, align: usize, additional_bytes: usize) {
        if align > self.minalign {
            self.minalign = align;
        }
        let needed = self.used() + additional_bytes;
        let pad = align.wrapping_sub(needed % align) % align;
        for _ in 0..pad {
            self.buf.push(0);
        }
    }

    fn push_scalar(&mut self, size: usize, bytes: &[u8]) -> usize {
        self.prep(size, 0);
        self.push_bytes_raw(bytes);
        self.used()
    }

    // --- table construction ---

    pub fn start_table(&mut self) {
        self.current_fields.clear();
    }

    pub fn push_slot_bool(&mut self, slot: u16, value: bool, default: bool) {
        if value != default {
            let u = self.push_scalar(1, &[value as u8]);
            self.current_fields.push((slot, u));
        }
    }

    pub fn push_slot_i8(&mut self, slot: u16, value: i8, default: i8) {
        if value != default {
            let u = self.push_scalar(1, &value.to_le_bytes());
            self.current_fields.push((slot, u));
        }
    }

    pub fn push_slot_u8(&mut self, slot: u16, value: u8, default: u8) {
        if value != default {
            let u = self.push_scalar(1, &value.to_le_bytes());
            self.current_fields.push((slot, u));
        }
    }

    pub fn push_slot_i16(&mut self, slot: u16, value: i16, default: i16) {
        if value != default {
            let u = self.push_scalar(2, &value.to_le_bytes());
            self.current_fields.push((slot, u));
        }
    }

    pub fn push_slot_i32(&mut self, slot: u16, value: i32, default: i32) {
        if value != default {
            let u = self.push_scalar(4, &value.to_le_bytes());
            self.current_fields.push((slot, u));
        }
    }

    pub fn push_slot_i64(&mut self, slot: u16, value: i64, default: i64) {
        if value != default {
            let u = self.push_scalar(8, &value.to_le_bytes());
            self.current_fields.push((slot, u));
        }
    }

    pub fn push_slot_f32(&mut self, slot: u16, value: f32, default: f32) {
        if value != default {
            let u = self.push_scalar(4, &value.to_le_bytes());
            self.current_fields.push((slot, u));
        }
    }

    pub fn push_slot_f64(&mut self, slot: u16, value: f64, default: f64) {
        if value != default {
            let u = self.push_scalar(8, &value.to_le_bytes());
            self.current_fields.push((slot, u));
        }
    }

    /// Writes a required table/vector/string field: a forward `uoffset_t`
    /// to `target`.
    pub fn push_slot_offset(&mut self, slot: u16, target: Offset) {
        self.prep(4, 0);
        let field_u = self.used() + 4;
        let value = field_u as i64 - target.0 as i64;
        self.push_bytes_raw(&(value as i32).to_le_bytes());
        self.current_fields.push((slot, field_u));
    }

    /// Same as [`Builder::push_slot_offset`] but omits the field entirely
    /// when `target` is `None`, matching FlatBuffers' optional-reference
    /// convention.
    pub fn push_slot_offset_opt(&mut self, slot: u16, target: Option<Offset>) {
        if let Some(t) = target {
            self.push_slot_offset(slot, t);
        }
    }

    /// Closes the current table, deduplicating its vtable against every
    /// vtable emitted so far, and returns an [`Offset`] to the table.
    pub fn end_table(&mut self) -> Offset {
        let anchor_start = self.buf.len();
        self.push_bytes_raw(&0i32.to_le_bytes());
        let anchor_u = self.used();

        let max_slot = self.current_fields.iter().map(|(s, _)| *s).max();
        let vt_len = match max_slot {
            Some(m) => m as usize + 2,
            None => 4,
        };
        let mut vt = vec![0u8; vt_len];
        vt[0..2].copy_from_slice(&(vt_len as u16).to_le_bytes());
        // Object size is advisory only (this reader never consults it); derive it
        // purely from the slot layout so identical field sets still dedup their
        // vtable regardless of incidental alignment padding elsewhere in the buffer.
        let obj_size = vt_len as u16;
        vt[2..4].copy_from_slice(&obj_size.to_le_bytes());
        for &(slot, field_u) in &self.current_fields {
            let rel = (anchor_u - field_u) as u16;
            let s = slot as usize;
            vt[s..s + 2].copy_from_slice(&rel.to_le_bytes());
        }

        let vtable_u = match self.vtables.iter().find(|(bytes, _)| *bytes == vt) {
            Some(&(_, existing_u)) => existing_u,
            None => {
                self.push_bytes_raw(&vt);
                let u = self.used();
                self.vtables.push((vt, u));
                u
            }
        };

        let delta = vtable_u as i64 - anchor_u as i64;
        self.patch_i32(anchor_start, delta as i32);
        self.current_fields.clear();
        Offset(anchor_u)
    }

    // --- strings and vectors ---

    pub fn create_string(&mut self, s: &str) -> Offset {
        self.prep(4, s.len() + 1);
        self.buf.push(0); // trailing NUL, ends up at the highest address
        self.push_bytes_raw(s.as_bytes());
        let u = self.push_scalar(4, &(s.len() as i32).to_le_bytes());
        Offset(u)
    }

    pub fn create_vector_i32(&mut self, values: &[i32]) -> Offset {
        self.prep(4, 4 * values.len() + 4);
        for &v in values.iter().rev() {
            self.push_bytes_raw(&v.to_le_bytes());
        }
        let u = self.push_scalar(4, &(values.len() as i32).to_le_bytes());
        Offset(u)
    }

    pub fn create_vector_i64(&mut self, values: &[i64]) -> Offset {
        self.prep(8, 8 * values.len() + 4);
        for &v in values.iter().rev() {
            self.push_bytes_raw(&v.to_le_bytes());
        }
        let u = self.push_scalar(4, &(values.len() as i32).to_le_bytes());
        Offset(u)
    }

    pub fn create_vector_i8(&mut self, values: &[i8]) -> Offset {
        self.prep(4, values.len() + 4);
        for &v in values.iter().rev() {
            self.buf.push(v as u8);
        }
        let u = self.push_scalar(4, &(values.len() as i32).to_le_bytes());
        Offset(u)
    }

    /// Vector of `uoffset_t`, each relative to its own slot (tables/strings).
    pub fn create_vector_offsets(&mut self, offsets: &[Offset]) -> Offset {
        self.prep(4, 4 * offsets.len() + 4);
        for &target in offsets.iter().rev() {
            self.prep(4, 0);
            let field_u = self.used() + 4;
            let value = field_u as i64 - target.0 as i64;
            self.push_bytes_raw(&(value as i32).to_le_bytes());
        }
        let u = self.push_scalar(4, &(offsets.len() as i32).to_le_bytes());
        Offset(u)
    }

    /// Vector of fixed-layout records with no vtable (e.g. `FieldNode` and
    /// `Buffer` in the IPC message body): `elements` is `count * stride`
    /// bytes, each `stride`-byte chunk already little-endian-serialized.
    pub fn create_vector_raw(&mut self, elements: &[u8], stride: usize) -> Offset {
        let count = elements.len() / stride;
        self.prep(max(8, 4), elements.len() + 4);
        for i in (0..count).rev() {
            let start = i * stride;
            self.push_bytes_raw(&elements[start..start + stride]);
        }
        let u = self.push_scalar(4, &(count as i32).to_le_bytes());
        Offset(u)
    }

    /// Finalizes the buffer: writes the root `uoffset_t` at absolute
    /// position 0 and materializes the final left-to-right byte order.
    pub fn finish(&mut self, root: Offset) {
        if self.minalign < 4 {
            self.minalign = 4;
        }
        self.prep(self.minalign, 4);
        let field_u = self.used() + 4;
        let value = field_u as i64 - root.0 as i64;
        self.push_bytes_raw(&(value as i32).to_le_bytes());
        self.finished = Some(self.buf.iter().rev().copied().collect());
    }

    pub fn finished_bytes(&self) -> &[u8] {
        self.finished.as_deref().expect("Builder::finish was not called")
    }
}
