//! # **Bytes Module** - *Little-endian scalar reads/writes*
//!
//! The lowest layer of the wire codec (component A). Every FlatBuffers and
//! Arrow-body scalar is little-endian and read unaligned; bit access on
//! validity bitmaps goes through [`crate::bitmask::bit`].

use crate::error::{ArrowIpcError, Result};

#[inline]
pub fn read_u8(buf: &[u8], pos: usize) -> Result<u8> {
    buf.get(pos).copied().ok_or_else(|| truncated("u8", pos, 1, buf.len()))
}

#[inline]
pub fn read_i8(buf: &[u8], pos: usize) -> Result<i8> {
    read_u8(buf, pos).map(|b| b as i8)
}

macro_rules! le_reader {
    ($name:ident, $ty:ty, $n:expr) => {
        #[inline]
        pub fn $name(buf: &[u8], pos: usize) -> Result<$ty> {
            let end = pos + $n;
            let slice = buf
                .get(pos..end)
                .ok_or_else(|| truncated(stringify!($ty), pos, $n, buf.len()))?;
            let mut arr = [0u8; $n];
            arr.copy_from_slice(slice);
            Ok(<$ty>::from_le_bytes(arr))
        }
    };
}

le_reader!(read_u16, u16, 2);
le_reader!(read_i16, i16, 2);
le_reader!(read_u32, u32, 4);
le_reader!(read_i32, i32, 4);
le_reader!(read_u64_raw, u64, 8);
le_reader!(read_i64_raw, i64, 8);
le_reader!(read_f32, f32, 4);
le_reader!(read_f64, f64, 8);

fn truncated(what: &str, pos: usize, need: usize, have: usize) -> ArrowIpcError {
    ArrowIpcError::format(format!(
        "truncated read of {what}: need {need} bytes at offset {pos}, buffer has {have} bytes"
    ))
}

/// The largest integer magnitude a platform `f64`/coercion path can
/// represent exactly, mirroring `Number.MAX_SAFE_INTEGER` in the source
/// ecosystem this format originates from.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;
pub const MIN_SAFE_INTEGER: i64 = -9_007_199_254_740_991;

/// Reads a 64-bit little-endian integer and coerces it into the platform's
/// native `i64` representation. Since Rust has native 64-bit integers this
/// never loses precision and always succeeds, unlike the "safe integer"
/// coercion the source format description calls for on narrower-integer
/// hosts.
#[inline]
pub fn read_i64(buf: &[u8], pos: usize) -> Result<i64> {
    read_i64_raw(buf, pos)
}

#[inline]
pub fn read_u64(buf: &[u8], pos: usize) -> Result<u64> {
    read_u64_raw(buf, pos)
}

/// Coerces a 64-bit integer into a safe `i64`/`f64`-representable range,
/// failing with [`ArrowIpcError::Range`] above `MAX_SAFE_INTEGER`. Used when
/// a caller has asked not to receive raw 64-bit values (the `useBigInt`-style
/// option turned off).
pub fn coerce_safe_integer(v: i64) -> Result<i64> {
    if v > MAX_SAFE_INTEGER || v < MIN_SAFE_INTEGER {
        Err(ArrowIpcError::range(format!(
            "value {v} exceeds the safe integer range [{MIN_SAFE_INTEGER}, {MAX_SAFE_INTEGER}]"
        )))
    } else {
        Ok(v)
    }
}

/// Reads a 128-bit little-endian integer, used for `Decimal128`/`Decimal256`
/// truncated into `i128` and for `IntervalMonthDayNano`. Read by hand rather
/// than through [`Buffer::from_shared`](crate::buffer::Buffer::from_shared)
/// since a 16-byte-aligned read is not guaranteed by the 8-byte alignment the
/// wire format promises.
#[inline]
pub fn read_i128(buf: &[u8], pos: usize) -> Result<i128> {
    let end = pos + 16;
    let slice = buf.get(pos..end).ok_or_else(|| truncated("i128", pos, 16, buf.len()))?;
    let mut arr = [0u8; 16];
    arr.copy_from_slice(slice);
    Ok(i128::from_le_bytes(arr))
}

macro_rules! le_writer {
    ($name:ident, $ty:ty) => {
        #[inline]
        pub fn $name(out: &mut Vec<u8>, value: $ty) {
            out.extend_from_slice(&value.to_le_bytes());
        }
    };
}

le_writer!(write_u8, u8);
le_writer!(write_i8, i8);
le_writer!(write_u16, u16);
le_writer!(write_i16, i16);
le_writer!(write_u32, u32);
le_writer!(write_i32, i32);
le_writer!(write_u64, u64);
le_writer!(write_i64, i64);
le_writer!(write_f32, f32);
le_writer!(write_f64, f64);

#[inline]
pub fn write_i128(out: &mut Vec<u8>, value: i128) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Rounds `size` up to the next multiple of `align` (a power of two).
#[inline]
pub fn align_to(size: usize, align: usize) -> usize {
    (size + align - 1) & !(align - 1)
}

/// Pads `buf` with zero bytes until its length is a multiple of `align`.
pub fn pad_to(buf: &mut Vec<u8>, align: usize) {
    let target = align_to(buf.len(), align);
    buf.resize(target, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn le_roundtrip() {
        let mut buf = Vec::new();
        write_i32(&mut buf, -123);
        write_u64(&mut buf, 0xDEAD_BEEF_0000_0001);
        assert_eq!(read_i32(&buf, 0).unwrap(), -123);
        assert_eq!(read_u64(&buf, 4).unwrap(), 0xDEAD_BEEF_0000_0001);
    }

    #[test]
    fn truncated_read_is_format_error() {
        let buf = [1u8, 2, 3];
        let err = read_i64(&buf, 0).unwrap_err();
        assert!(matches!(err, ArrowIpcError::Format { .. }));
    }

    #[test]
    fn safe_integer_coercion_rejects_overflow() {
        assert!(coerce_safe_integer(MAX_SAFE_INTEGER).is_ok());
        assert!(coerce_safe_integer(MAX_SAFE_INTEGER + 1).is_err());
    }

    #[test]
    fn align_to_rounds_up_to_eight() {
        assert_eq!(align_to(0, 8), 0);
        assert_eq!(align_to(1, 8), 8);
        assert_eq!(align_to(8, 8), 8);
        assert_eq!(align_to(9, 8), 16);
    }
}
