//! Per-type "direct" builders: a growing typed value buffer plus a
//! [`ValidityBuilder`], one function per physical layout `Batch` needs.
//! Transform steps (Float16 packing, interval component packing) happen
//! here, at the point a native [`Value`] is pushed into the buffer, rather
//! than as a later pass.

use crate::batch::{Batch, BooleanBatch, DecimalBatch, Float16Batch, FixedSizeBinaryBatch, PrimitiveBatch};
use crate::bitmask::Bitmask;
use crate::buffer::Buffer;
use crate::datatype::{DateUnit, TimeUnit};
use crate::error::{ArrowIpcError, Result};

use super::validity::ValidityBuilder;
use super::Value;

pub(super) fn type_mismatch(expected: &str, got: &Value) -> ArrowIpcError {
    ArrowIpcError::invalid_argument(format!("expected a {expected} value, got {got:?}"))
}

fn as_i64(v: &Value) -> Result<i64> {
    match v {
        Value::Int(i) => Ok(*i),
        Value::UInt(u) => i64::try_from(*u).map_err(|_| ArrowIpcError::range("unsigned value out of i64 range")),
        Value::Boolean(b) => Ok(if *b { 1 } else { 0 }),
        other => Err(type_mismatch("integer", other)),
    }
}

fn as_u64(v: &Value) -> Result<u64> {
    match v {
        Value::UInt(u) => Ok(*u),
        Value::Int(i) if *i >= 0 => Ok(*i as u64),
        other => Err(type_mismatch("unsigned integer", other)),
    }
}

fn as_f64(v: &Value) -> Result<f64> {
    match v {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        Value::UInt(u) => Ok(*u as f64),
        other => Err(type_mismatch("float", other)),
    }
}

fn as_i128(v: &Value) -> Result<i128> {
    match v {
        Value::Int(i) => Ok(*i as i128),
        Value::UInt(u) => Ok(*u as i128),
        other => Err(type_mismatch("decimal integer", other)),
    }
}

fn build_primitive<T: Clone + Default>(
    values: &[Value],
    cast: impl Fn(&Value) -> Result<T>,
    wrap: impl Fn(PrimitiveBatch<T>) -> Batch,
) -> Result<Batch> {
    let mut validity = ValidityBuilder::with_capacity(values.len());
    let mut data = Vec::with_capacity(values.len());
    for v in values {
        match v {
            Value::Null => {
                validity.push(false);
                data.push(T::default());
            }
            other => {
                validity.push(true);
                data.push(cast(other)?);
            }
        }
    }
    Ok(wrap(PrimitiveBatch::new(Buffer::from(data), validity.finish())))
}

pub fn build_boolean(values: &[Value]) -> Result<Batch> {
    let mut validity = ValidityBuilder::with_capacity(values.len());
    let mut bits = Bitmask::with_capacity(values.len());
    for (i, v) in values.iter().enumerate() {
        match v {
            Value::Null => {
                validity.push(false);
            }
            Value::Boolean(b) => {
                validity.push(true);
                bits.set(i, *b);
            }
            other => return Err(type_mismatch("Boolean", other)),
        }
    }
    Ok(Batch::Boolean(BooleanBatch::new(bits, validity.finish())))
}

pub fn build_int(bit_width: u8, signed: bool, values: &[Value]) -> Result<Batch> {
    match (bit_width, signed) {
        (8, true) => build_primitive(values, |v| as_i64(v).map(|x| x as i8), Batch::Int8),
        (16, true) => build_primitive(values, |v| as_i64(v).map(|x| x as i16), Batch::Int16),
        (32, true) => build_primitive(values, |v| as_i64(v).map(|x| x as i32), Batch::Int32),
        (64, true) => build_primitive(values, as_i64, Batch::Int64),
        (8, false) => build_primitive(values, |v| as_u64(v).map(|x| x as u8), Batch::UInt8),
        (16, false) => build_primitive(values, |v| as_u64(v).map(|x| x as u16), Batch::UInt16),
        (32, false) => build_primitive(values, |v| as_u64(v).map(|x| x as u32), Batch::UInt32),
        (64, false) => build_primitive(values, as_u64, Batch::UInt64),
        _ => unreachable!("DataType::int validates the width before a builder ever sees it"),
    }
}

pub fn build_float(bit_width: u8, values: &[Value]) -> Result<Batch> {
    match bit_width {
        16 => build_float16(values),
        32 => build_primitive(values, |v| as_f64(v).map(|x| x as f32), Batch::Float32),
        64 => build_primitive(values, as_f64, Batch::Float64),
        _ => unreachable!("DataType::float validates the width before a builder ever sees it"),
    }
}

fn build_float16(values: &[Value]) -> Result<Batch> {
    let mut validity = ValidityBuilder::with_capacity(values.len());
    let mut bits = Vec::with_capacity(values.len());
    for v in values {
        match v {
            Value::Null => {
                validity.push(false);
                bits.push(0u16);
            }
            other => {
                validity.push(true);
                bits.push(f32_to_f16(as_f64(other)? as f32));
            }
        }
    }
    Ok(Batch::Float16(Float16Batch::new(Buffer::from(bits), validity.finish())))
}

/// Packs an `f32` to an IEEE 754 binary16 bit pattern: the inverse of
/// [`crate::batch::f16_to_f32`]. Values out of half-float range saturate to
/// signed infinity rather than erroring, matching how most encoders treat
/// float16 packing as lossy by design.
pub fn f32_to_f16(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xFF) as i32 - 127 + 15;
    let mantissa = bits & 0x7F_FFFF;

    if value.is_nan() {
        return sign | 0x7E00;
    }
    if exponent >= 0x1F {
        return sign | 0x7C00; // overflow -> signed infinity
    }
    if exponent <= 0 {
        if exponent < -10 {
            return sign; // underflows to signed zero
        }
        // subnormal: shift the implicit leading 1 into the mantissa
        let m = (mantissa | 0x80_0000) >> (1 - exponent + 13);
        return sign | (m as u16);
    }
    sign | ((exponent as u16) << 10) | ((mantissa >> 13) as u16)
}

pub fn build_decimal(bit_width: u16, precision: u8, scale: i8, values: &[Value]) -> Result<Batch> {
    let mut validity = ValidityBuilder::with_capacity(values.len());
    let mut data = Vec::with_capacity(values.len());
    for v in values {
        match v {
            Value::Null => {
                validity.push(false);
                data.push(0i128);
            }
            other => {
                validity.push(true);
                data.push(as_i128(other)?);
            }
        }
    }
    Ok(Batch::Decimal(DecimalBatch { bit_width, precision, scale, values: Buffer::from(data), validity: validity.finish() }))
}

pub fn build_date(unit: DateUnit, values: &[Value]) -> Result<Batch> {
    match unit {
        DateUnit::Day => build_primitive(values, |v| as_i64(v).map(|x| x as i32), Batch::Date32),
        DateUnit::Millisecond => build_primitive(values, as_i64, Batch::Date64),
    }
}

pub fn build_time(bit_width: u8, _unit: TimeUnit, values: &[Value]) -> Result<Batch> {
    match bit_width {
        32 => build_primitive(values, |v| as_i64(v).map(|x| x as i32), Batch::Time32),
        64 => build_primitive(values, as_i64, Batch::Time64),
        other => Err(ArrowIpcError::invalid_argument(format!("Time bit width must be 32 or 64, got {other}"))),
    }
}

pub fn build_timestamp(values: &[Value]) -> Result<Batch> {
    build_primitive(values, as_i64, Batch::Timestamp)
}

pub fn build_duration(values: &[Value]) -> Result<Batch> {
    build_primitive(values, as_i64, Batch::Duration)
}

/// Packs a two-element `[days, milliseconds]` list into the single `i64`
/// [`Batch::IntervalDayTime`] stores (first 4 bytes days, next 4 millis,
/// little-endian). A bare integer is accepted as the already-packed bit
/// pattern, for callers round-tripping a decoded value back through a builder.
fn pack_day_time(v: &Value) -> Result<i64> {
    match v {
        Value::List(items) if items.len() == 2 => {
            let days = as_i64(&items[0])? as i32;
            let millis = as_i64(&items[1])? as i32;
            let mut bytes = [0u8; 8];
            bytes[0..4].copy_from_slice(&days.to_le_bytes());
            bytes[4..8].copy_from_slice(&millis.to_le_bytes());
            Ok(i64::from_le_bytes(bytes))
        }
        other => as_i64(other),
    }
}

/// Packs a `[months, days, nanoseconds]` list into the 16-byte
/// `{i32 months, i32 days, i64 nanos}` record [`Batch::IntervalMonthDayNano`]
/// stores as a raw `i128`.
fn pack_month_day_nano(v: &Value) -> Result<i128> {
    match v {
        Value::List(items) if items.len() == 3 => {
            let months = as_i64(&items[0])? as i32;
            let days = as_i64(&items[1])? as i32;
            let nanos = as_i64(&items[2])?;
            let mut bytes = [0u8; 16];
            bytes[0..4].copy_from_slice(&months.to_le_bytes());
            bytes[4..8].copy_from_slice(&days.to_le_bytes());
            bytes[8..16].copy_from_slice(&nanos.to_le_bytes());
            Ok(i128::from_le_bytes(bytes))
        }
        other => as_i128(other),
    }
}

pub fn build_interval(unit: crate::datatype::IntervalUnit, values: &[Value]) -> Result<Batch> {
    use crate::datatype::IntervalUnit;
    match unit {
        IntervalUnit::YearMonth => build_primitive(values, |v| as_i64(v).map(|x| x as i32), Batch::IntervalYearMonth),
        IntervalUnit::DayTime => build_primitive(values, pack_day_time, Batch::IntervalDayTime),
        IntervalUnit::MonthDayNano => build_primitive(values, pack_month_day_nano, Batch::IntervalMonthDayNano),
    }
}

pub fn build_fixed_size_binary(byte_width: i32, values: &[Value]) -> Result<Batch> {
    let width = byte_width.max(0) as usize;
    let mut validity = ValidityBuilder::with_capacity(values.len());
    let mut data = Vec::with_capacity(values.len() * width);
    for v in values {
        match v {
            Value::Null => {
                validity.push(false);
                data.extend(std::iter::repeat(0u8).take(width));
            }
            Value::Bytes(b) => {
                if b.len() != width {
                    return Err(ArrowIpcError::invalid_argument(format!(
                        "FixedSizeBinary({width}) row has {} bytes",
                        b.len()
                    )));
                }
                validity.push(true);
                data.extend_from_slice(b);
            }
            other => return Err(type_mismatch("Bytes", other)),
        }
    }
    Ok(Batch::FixedSizeBinary(FixedSizeBinaryBatch { byte_width, values: Buffer::from(data), validity: validity.finish() }))
}
