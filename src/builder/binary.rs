//! Binary/Utf8 builder: a growing offsets buffer alongside a growing byte
//! buffer. Strings are UTF-8 encoded before anything touches the byte
//! buffer, so a `Utf8Builder` can never produce an invalid `get_str`.

use crate::batch::{Batch, VariableBinaryBatch};
use crate::buffer::Buffer;
use crate::error::{ArrowIpcError, Result};

use super::primitive::type_mismatch;
use super::validity::ValidityBuilder;
use super::Value;

fn collect_bytes(values: &[Value], want_utf8: bool) -> Result<(ValidityBuilder, Vec<usize>, Vec<u8>)> {
    let mut validity = ValidityBuilder::with_capacity(values.len());
    let mut lengths = Vec::with_capacity(values.len());
    let mut bytes = Vec::new();

    for v in values {
        let chunk: &[u8] = match v {
            Value::Null => {
                validity.push(false);
                lengths.push(0);
                continue;
            }
            Value::Bytes(b) if !want_utf8 => b.as_slice(),
            Value::Utf8(s) => s.as_bytes(),
            other => return Err(type_mismatch(if want_utf8 { "Utf8" } else { "Bytes" }, other)),
        };
        validity.push(true);
        lengths.push(chunk.len());
        bytes.extend_from_slice(chunk);
    }
    Ok((validity, lengths, bytes))
}

fn offsets_i32(lengths: &[usize]) -> Result<Vec<i32>> {
    let mut offsets = Vec::with_capacity(lengths.len() + 1);
    let mut cursor = 0i64;
    offsets.push(0i32);
    for len in lengths {
        cursor += *len as i64;
        offsets.push(i32::try_from(cursor).map_err(|_| {
            ArrowIpcError::range("binary/utf8 builder exceeded i32 offset range; use the large variant")
        })?);
    }
    Ok(offsets)
}

fn offsets_i64(lengths: &[usize]) -> Vec<i64> {
    let mut offsets = Vec::with_capacity(lengths.len() + 1);
    let mut cursor = 0i64;
    offsets.push(0i64);
    for len in lengths {
        cursor += *len as i64;
        offsets.push(cursor);
    }
    offsets
}

pub fn build_binary(large: bool, values: &[Value]) -> Result<Batch> {
    let (validity, lengths, bytes) = collect_bytes(values, false)?;
    if large {
        let offsets = offsets_i64(&lengths);
        Ok(Batch::LargeBinary(VariableBinaryBatch { offsets: Buffer::from(offsets), values: Buffer::from(bytes), validity: validity.finish() }))
    } else {
        let offsets = offsets_i32(&lengths)?;
        Ok(Batch::Binary(VariableBinaryBatch { offsets: Buffer::from(offsets), values: Buffer::from(bytes), validity: validity.finish() }))
    }
}

pub fn build_utf8(large: bool, values: &[Value]) -> Result<Batch> {
    let (validity, lengths, bytes) = collect_bytes(values, true)?;
    if large {
        let offsets = offsets_i64(&lengths);
        Ok(Batch::LargeUtf8(VariableBinaryBatch { offsets: Buffer::from(offsets), values: Buffer::from(bytes), validity: validity.finish() }))
    } else {
        let offsets = offsets_i32(&lengths)?;
        Ok(Batch::Utf8(VariableBinaryBatch { offsets: Buffer::from(offsets), values: Buffer::from(bytes), validity: validity.finish() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_utf8_with_a_null_in_the_middle() {
        let values = vec![Value::Utf8("foo".to_string()), Value::Null, Value::Utf8("bar".to_string())];
        let batch = build_utf8(false, &values).unwrap();
        match batch {
            Batch::Utf8(b) => {
                assert_eq!(b.get_str(0).unwrap(), Some("foo"));
                assert_eq!(b.get_str(1).unwrap(), None);
                assert_eq!(b.get_str(2).unwrap(), Some("bar"));
            }
            _ => panic!("expected Utf8"),
        }
    }

    #[test]
    fn builds_large_binary() {
        let values = vec![Value::Bytes(vec![1, 2]), Value::Bytes(vec![3])];
        let batch = build_binary(true, &values).unwrap();
        match batch {
            Batch::LargeBinary(b) => {
                assert_eq!(b.get_bytes(0), Some(&[1u8, 2][..]));
                assert_eq!(b.get_bytes(1), Some(&[3u8][..]));
            }
            _ => panic!("expected LargeBinary"),
        }
    }
}
