//! # **Batch Module** - *The decoded, zero-copy columnar value*
//!
//! `Batch` is a tagged union with one arm per [`crate::datatype::DataType`]
//! tag: the decode visitor ([`crate::decode::visitor`]) and the builders
//! ([`crate::builder`]) both construct these, and [`crate::column::Column`]
//! concatenates same-typed batches into a logical column. Every variant
//! supports `len`, `null_count`, `is_valid`, `slice`, and (for the leaf
//! scalar-bearing types) `at`; nested types expose their children through
//! their own typed struct instead, since there is no single scalar
//! representation for a struct or list cell.

mod dictionary;
mod nested;
mod primitive;
mod validity;
mod variable;
mod view;

pub use dictionary::DictionaryBatch;
pub use nested::{FixedSizeListBatch, ListBatch, ListViewBatch, MapBatch, RunEndEncodedBatch, StructBatch, UnionBatch};
pub use primitive::{f16_to_f32, BooleanBatch, DecimalBatch, Float16Batch, FixedSizeBinaryBatch, PrimitiveBatch};
pub use variable::{Offset, VariableBinaryBatch};
pub use view::ViewBatch;

use crate::error::{ArrowIpcError, Result};

#[derive(Clone, Debug)]
pub enum Batch {
    Null { len: usize },
    Boolean(BooleanBatch),
    Int8(PrimitiveBatch<i8>),
    Int16(PrimitiveBatch<i16>),
    Int32(PrimitiveBatch<i32>),
    Int64(PrimitiveBatch<i64>),
    UInt8(PrimitiveBatch<u8>),
    UInt16(PrimitiveBatch<u16>),
    UInt32(PrimitiveBatch<u32>),
    UInt64(PrimitiveBatch<u64>),
    Float16(Float16Batch),
    Float32(PrimitiveBatch<f32>),
    Float64(PrimitiveBatch<f64>),
    Decimal(DecimalBatch),
    Date32(PrimitiveBatch<i32>),
    Date64(PrimitiveBatch<i64>),
    Time32(PrimitiveBatch<i32>),
    Time64(PrimitiveBatch<i64>),
    Timestamp(PrimitiveBatch<i64>),
    Duration(PrimitiveBatch<i64>),
    IntervalYearMonth(PrimitiveBatch<i32>),
    IntervalDayTime(PrimitiveBatch<i64>),
    IntervalMonthDayNano(PrimitiveBatch<i128>),
    FixedSizeBinary(FixedSizeBinaryBatch),
    Binary(VariableBinaryBatch<i32>),
    LargeBinary(VariableBinaryBatch<i64>),
    Utf8(VariableBinaryBatch<i32>),
    LargeUtf8(VariableBinaryBatch<i64>),
    BinaryView(ViewBatch),
    Utf8View(ViewBatch),
    List(ListBatch<i32>),
    LargeList(ListBatch<i64>),
    ListView(ListViewBatch<i32>),
    LargeListView(ListViewBatch<i64>),
    FixedSizeList(FixedSizeListBatch),
    Struct(StructBatch),
    Union(UnionBatch),
    Dictionary(DictionaryBatch),
    Map(MapBatch),
    RunEndEncoded(RunEndEncodedBatch),
}

/// A single decoded cell, for the leaf (non-nested) batch kinds. Nested
/// kinds (`List`, `Struct`, `Union`, `Map`, `RunEndEncoded`) don't have a
/// single scalar shape; use the variant's own struct (`value_range`,
/// `child`, `resolve`, ...) instead.
#[derive(Debug, PartialEq)]
pub enum ScalarValue<'a> {
    Null,
    Boolean(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(i128),
    Bytes(&'a [u8]),
    Utf8(&'a str),
}

impl Batch {
    pub fn len(&self) -> usize {
        match self {
            Batch::Null { len } => *len,
            Batch::Boolean(b) => b.len(),
            Batch::Int8(b) => b.len(),
            Batch::Int16(b) => b.len(),
            Batch::Int32(b) => b.len(),
            Batch::Int64(b) => b.len(),
            Batch::UInt8(b) => b.len(),
            Batch::UInt16(b) => b.len(),
            Batch::UInt32(b) => b.len(),
            Batch::UInt64(b) => b.len(),
            Batch::Float16(b) => b.len(),
            Batch::Float32(b) => b.len(),
            Batch::Float64(b) => b.len(),
            Batch::Decimal(b) => b.len(),
            Batch::Date32(b) => b.len(),
            Batch::Date64(b) => b.len(),
            Batch::Time32(b) => b.len(),
            Batch::Time64(b) => b.len(),
            Batch::Timestamp(b) => b.len(),
            Batch::Duration(b) => b.len(),
            Batch::IntervalYearMonth(b) => b.len(),
            Batch::IntervalDayTime(b) => b.len(),
            Batch::IntervalMonthDayNano(b) => b.len(),
            Batch::FixedSizeBinary(b) => b.len(),
            Batch::Binary(b) => b.len(),
            Batch::LargeBinary(b) => b.len(),
            Batch::Utf8(b) => b.len(),
            Batch::LargeUtf8(b) => b.len(),
            Batch::BinaryView(b) => b.len(),
            Batch::Utf8View(b) => b.len(),
            Batch::List(b) => b.len(),
            Batch::LargeList(b) => b.len(),
            Batch::ListView(b) => b.len(),
            Batch::LargeListView(b) => b.len(),
            Batch::FixedSizeList(b) => b.len,
            Batch::Struct(b) => b.len,
            Batch::Union(b) => b.len(),
            Batch::Dictionary(b) => b.len(),
            Batch::Map(b) => b.len(),
            Batch::RunEndEncoded(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        match self {
            Batch::Null { len } => *len,
            Batch::Boolean(b) => b.null_count(),
            Batch::Int8(b) => b.null_count(),
            Batch::Int16(b) => b.null_count(),
            Batch::Int32(b) => b.null_count(),
            Batch::Int64(b) => b.null_count(),
            Batch::UInt8(b) => b.null_count(),
            Batch::UInt16(b) => b.null_count(),
            Batch::UInt32(b) => b.null_count(),
            Batch::UInt64(b) => b.null_count(),
            Batch::Float16(b) => b.null_count(),
            Batch::Float32(b) => b.null_count(),
            Batch::Float64(b) => b.null_count(),
            Batch::Decimal(b) => b.null_count(),
            Batch::Date32(b) => b.null_count(),
            Batch::Date64(b) => b.null_count(),
            Batch::Time32(b) => b.null_count(),
            Batch::Time64(b) => b.null_count(),
            Batch::Timestamp(b) => b.null_count(),
            Batch::Duration(b) => b.null_count(),
            Batch::IntervalYearMonth(b) => b.null_count(),
            Batch::IntervalDayTime(b) => b.null_count(),
            Batch::IntervalMonthDayNano(b) => b.null_count(),
            Batch::FixedSizeBinary(b) => b.null_count(),
            Batch::Binary(b) => b.null_count(),
            Batch::LargeBinary(b) => b.null_count(),
            Batch::Utf8(b) => b.null_count(),
            Batch::LargeUtf8(b) => b.null_count(),
            Batch::BinaryView(b) => b.null_count(),
            Batch::Utf8View(b) => b.null_count(),
            Batch::List(b) => b.null_count(),
            Batch::LargeList(b) => b.null_count(),
            Batch::ListView(b) => b.null_count(),
            Batch::LargeListView(b) => b.null_count(),
            Batch::FixedSizeList(b) => b.null_count(),
            Batch::Struct(b) => b.null_count(),
            Batch::Union(_) => 0,
            Batch::Dictionary(b) => b.null_count(),
            Batch::Map(b) => b.null_count(),
            Batch::RunEndEncoded(_) => 0,
        }
    }

    pub fn is_valid(&self, i: usize) -> bool {
        match self {
            Batch::Null { .. } => false,
            Batch::Boolean(b) => b.is_valid(i),
            Batch::Int8(b) => b.is_valid(i),
            Batch::Int16(b) => b.is_valid(i),
            Batch::Int32(b) => b.is_valid(i),
            Batch::Int64(b) => b.is_valid(i),
            Batch::UInt8(b) => b.is_valid(i),
            Batch::UInt16(b) => b.is_valid(i),
            Batch::UInt32(b) => b.is_valid(i),
            Batch::UInt64(b) => b.is_valid(i),
            Batch::Float16(b) => b.is_valid(i),
            Batch::Float32(b) => b.is_valid(i),
            Batch::Float64(b) => b.is_valid(i),
            Batch::Decimal(b) => b.is_valid(i),
            Batch::Date32(b) => b.is_valid(i),
            Batch::Date64(b) => b.is_valid(i),
            Batch::Time32(b) => b.is_valid(i),
            Batch::Time64(b) => b.is_valid(i),
            Batch::Timestamp(b) => b.is_valid(i),
            Batch::Duration(b) => b.is_valid(i),
            Batch::IntervalYearMonth(b) => b.is_valid(i),
            Batch::IntervalDayTime(b) => b.is_valid(i),
            Batch::IntervalMonthDayNano(b) => b.is_valid(i),
            Batch::FixedSizeBinary(b) => b.is_valid(i),
            Batch::Binary(b) => b.is_valid(i),
            Batch::LargeBinary(b) => b.is_valid(i),
            Batch::Utf8(b) => b.is_valid(i),
            Batch::LargeUtf8(b) => b.is_valid(i),
            Batch::BinaryView(b) => b.is_valid(i),
            Batch::Utf8View(b) => b.is_valid(i),
            Batch::List(b) => b.is_valid(i),
            Batch::LargeList(b) => b.is_valid(i),
            Batch::ListView(b) => b.is_valid(i),
            Batch::LargeListView(b) => b.is_valid(i),
            Batch::FixedSizeList(b) => b.is_valid(i),
            Batch::Struct(b) => b.is_valid(i),
            Batch::Union(_) => true,
            Batch::Dictionary(b) => b.is_valid(i),
            Batch::Map(b) => b.is_valid(i),
            Batch::RunEndEncoded(_) => true,
        }
    }

    pub fn datatype_name(&self) -> &'static str {
        match self {
            Batch::Null { .. } => "Null",
            Batch::Boolean(_) => "Boolean",
            Batch::Int8(_) => "Int8",
            Batch::Int16(_) => "Int16",
            Batch::Int32(_) => "Int32",
            Batch::Int64(_) => "Int64",
            Batch::UInt8(_) => "UInt8",
            Batch::UInt16(_) => "UInt16",
            Batch::UInt32(_) => "UInt32",
            Batch::UInt64(_) => "UInt64",
            Batch::Float16(_) => "Float16",
            Batch::Float32(_) => "Float32",
            Batch::Float64(_) => "Float64",
            Batch::Decimal(_) => "Decimal",
            Batch::Date32(_) => "Date32",
            Batch::Date64(_) => "Date64",
            Batch::Time32(_) => "Time32",
            Batch::Time64(_) => "Time64",
            Batch::Timestamp(_) => "Timestamp",
            Batch::Duration(_) => "Duration",
            Batch::IntervalYearMonth(_) => "IntervalYearMonth",
            Batch::IntervalDayTime(_) => "IntervalDayTime",
            Batch::IntervalMonthDayNano(_) => "IntervalMonthDayNano",
            Batch::FixedSizeBinary(_) => "FixedSizeBinary",
            Batch::Binary(_) => "Binary",
            Batch::LargeBinary(_) => "LargeBinary",
            Batch::Utf8(_) => "Utf8",
            Batch::LargeUtf8(_) => "LargeUtf8",
            Batch::BinaryView(_) => "BinaryView",
            Batch::Utf8View(_) => "Utf8View",
            Batch::List(_) => "List",
            Batch::LargeList(_) => "LargeList",
            Batch::ListView(_) => "ListView",
            Batch::LargeListView(_) => "LargeListView",
            Batch::FixedSizeList(_) => "FixedSizeList",
            Batch::Struct(_) => "Struct",
            Batch::Union(_) => "Union",
            Batch::Dictionary(_) => "Dictionary",
            Batch::Map(_) => "Map",
            Batch::RunEndEncoded(_) => "RunEndEncoded",
        }
    }

    /// Reads cell `i` as a [`ScalarValue`]. Nested kinds (lists, structs,
    /// unions, maps, run-end-encoded) have no single scalar shape and
    /// return [`ArrowIpcError::Unsupported`]; use the variant's own struct.
    pub fn at(&self, i: usize) -> Result<ScalarValue<'_>> {
        if i >= self.len() {
            return Err(ArrowIpcError::invalid_argument(format!(
                "row {i} out of bounds for a batch of length {}",
                self.len()
            )));
        }
        if !self.is_valid(i) {
            return Ok(ScalarValue::Null);
        }
        Ok(match self {
            Batch::Null { .. } => ScalarValue::Null,
            Batch::Boolean(b) => ScalarValue::Boolean(b.get(i).unwrap()),
            Batch::Int8(b) => ScalarValue::Int(b.get(i).unwrap() as i64),
            Batch::Int16(b) => ScalarValue::Int(b.get(i).unwrap() as i64),
            Batch::Int32(b) => ScalarValue::Int(b.get(i).unwrap() as i64),
            Batch::Int64(b) => ScalarValue::Int(b.get(i).unwrap()),
            Batch::UInt8(b) => ScalarValue::UInt(b.get(i).unwrap() as u64),
            Batch::UInt16(b) => ScalarValue::UInt(b.get(i).unwrap() as u64),
            Batch::UInt32(b) => ScalarValue::UInt(b.get(i).unwrap() as u64),
            Batch::UInt64(b) => ScalarValue::UInt(b.get(i).unwrap()),
            Batch::Float16(b) => ScalarValue::Float(b.get(i).unwrap() as f64),
            Batch::Float32(b) => ScalarValue::Float(b.get(i).unwrap() as f64),
            Batch::Float64(b) => ScalarValue::Float(b.get(i).unwrap()),
            Batch::Decimal(b) => ScalarValue::Decimal(b.get(i).unwrap()),
            Batch::Date32(b) => ScalarValue::Int(b.get(i).unwrap() as i64),
            Batch::Date64(b) => ScalarValue::Int(b.get(i).unwrap()),
            Batch::Time32(b) => ScalarValue::Int(b.get(i).unwrap() as i64),
            Batch::Time64(b) => ScalarValue::Int(b.get(i).unwrap()),
            Batch::Timestamp(b) => ScalarValue::Int(b.get(i).unwrap()),
            Batch::Duration(b) => ScalarValue::Int(b.get(i).unwrap()),
            Batch::IntervalYearMonth(b) => ScalarValue::Int(b.get(i).unwrap() as i64),
            Batch::IntervalDayTime(b) => ScalarValue::Int(b.get(i).unwrap()),
            Batch::IntervalMonthDayNano(b) => ScalarValue::Decimal(b.get(i).unwrap()),
            Batch::FixedSizeBinary(b) => ScalarValue::Bytes(b.get(i).unwrap()),
            Batch::Binary(b) => ScalarValue::Bytes(b.get_bytes(i).unwrap()),
            Batch::LargeBinary(b) => ScalarValue::Bytes(b.get_bytes(i).unwrap()),
            Batch::Utf8(b) => ScalarValue::Utf8(b.get_str(i)?.unwrap()),
            Batch::LargeUtf8(b) => ScalarValue::Utf8(b.get_str(i)?.unwrap()),
            Batch::BinaryView(b) => ScalarValue::Bytes(b.get_bytes(i)?.unwrap()),
            Batch::Utf8View(b) => ScalarValue::Utf8(b.get_str(i)?.unwrap()),
            Batch::Dictionary(b) => {
                let resolved = b.resolve(i)?.expect("validity already checked above");
                return b.values.at(resolved);
            }
            other @ (Batch::List(_)
            | Batch::LargeList(_)
            | Batch::ListView(_)
            | Batch::LargeListView(_)
            | Batch::FixedSizeList(_)
            | Batch::Struct(_)
            | Batch::Union(_)
            | Batch::Map(_)
            | Batch::RunEndEncoded(_)) => {
                return Err(ArrowIpcError::unsupported(format!(
                    "{} has no single scalar cell shape; use its typed accessor",
                    other.datatype_name()
                )));
            }
        })
    }

    pub fn slice(&self, start: usize, len: usize) -> Batch {
        match self {
            Batch::Null { .. } => Batch::Null { len },
            Batch::Boolean(b) => Batch::Boolean(b.slice(start, len)),
            Batch::Int8(b) => Batch::Int8(b.slice(start, len)),
            Batch::Int16(b) => Batch::Int16(b.slice(start, len)),
            Batch::Int32(b) => Batch::Int32(b.slice(start, len)),
            Batch::Int64(b) => Batch::Int64(b.slice(start, len)),
            Batch::UInt8(b) => Batch::UInt8(b.slice(start, len)),
            Batch::UInt16(b) => Batch::UInt16(b.slice(start, len)),
            Batch::UInt32(b) => Batch::UInt32(b.slice(start, len)),
            Batch::UInt64(b) => Batch::UInt64(b.slice(start, len)),
            Batch::Float16(b) => Batch::Float16(b.slice(start, len)),
            Batch::Float32(b) => Batch::Float32(b.slice(start, len)),
            Batch::Float64(b) => Batch::Float64(b.slice(start, len)),
            Batch::Decimal(b) => Batch::Decimal(b.slice(start, len)),
            Batch::Date32(b) => Batch::Date32(b.slice(start, len)),
            Batch::Date64(b) => Batch::Date64(b.slice(start, len)),
            Batch::Time32(b) => Batch::Time32(b.slice(start, len)),
            Batch::Time64(b) => Batch::Time64(b.slice(start, len)),
            Batch::Timestamp(b) => Batch::Timestamp(b.slice(start, len)),
            Batch::Duration(b) => Batch::Duration(b.slice(start, len)),
            Batch::IntervalYearMonth(b) => Batch::IntervalYearMonth(b.slice(start, len)),
            Batch::IntervalDayTime(b) => Batch::IntervalDayTime(b.slice(start, len)),
            Batch::IntervalMonthDayNano(b) => Batch::IntervalMonthDayNano(b.slice(start, len)),
            Batch::FixedSizeBinary(b) => Batch::FixedSizeBinary(b.slice(start, len)),
            Batch::Binary(b) => Batch::Binary(b.slice(start, len)),
            Batch::LargeBinary(b) => Batch::LargeBinary(b.slice(start, len)),
            Batch::Utf8(b) => Batch::Utf8(b.slice(start, len)),
            Batch::LargeUtf8(b) => Batch::LargeUtf8(b.slice(start, len)),
            Batch::BinaryView(b) => Batch::BinaryView(b.slice(start, len)),
            Batch::Utf8View(b) => Batch::Utf8View(b.slice(start, len)),
            Batch::List(b) => Batch::List(b.slice(start, len)),
            Batch::LargeList(b) => Batch::LargeList(b.slice(start, len)),
            Batch::ListView(b) => Batch::ListView(b.slice(start, len)),
            Batch::LargeListView(b) => Batch::LargeListView(b.slice(start, len)),
            Batch::FixedSizeList(b) => Batch::FixedSizeList(b.slice(start, len)),
            Batch::Struct(b) => Batch::Struct(b.slice(start, len)),
            Batch::Union(b) => Batch::Union(b.slice(start, len)),
            Batch::Dictionary(b) => Batch::Dictionary(b.slice(start, len)),
            Batch::Map(b) => Batch::Map(b.slice(start, len)),
            Batch::RunEndEncoded(b) => Batch::RunEndEncoded(b.slice(start, len)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmask::Bitmask;
    use crate::buffer::Buffer;

    #[test]
    fn at_resolves_through_a_dictionary() {
        let values = Batch::Utf8(VariableBinaryBatch {
            offsets: Buffer::from(vec![0i32, 3, 6]),
            values: Buffer::from(b"fooBaz".to_vec()),
            validity: None,
        });
        let indices = Batch::Int32(PrimitiveBatch::new(Buffer::from(vec![1, 0]), None));
        let dict = Batch::Dictionary(DictionaryBatch {
            id: 1,
            ordered: false,
            indices: std::sync::Arc::new(indices),
            values: std::sync::Arc::new(values),
        });
        assert_eq!(dict.at(0).unwrap(), ScalarValue::Utf8("Baz"));
        assert_eq!(dict.at(1).unwrap(), ScalarValue::Utf8("foo"));
    }

    #[test]
    fn null_rows_short_circuit_to_scalar_null() {
        let mut mask = Bitmask::new_set_all(2, true);
        mask.set(0, false);
        let batch = Batch::Int32(PrimitiveBatch::new(Buffer::from(vec![0, 7]), Some(mask)));
        assert_eq!(batch.at(0).unwrap(), ScalarValue::Null);
        assert_eq!(batch.at(1).unwrap(), ScalarValue::Int(7));
    }

    #[test]
    fn nested_kinds_reject_generic_scalar_access() {
        let batch = Batch::Struct(StructBatch {
            fields: std::sync::Arc::new(vec![]),
            children: vec![],
            len: 1,
            validity: None,
        });
        assert!(matches!(batch.at(0), Err(ArrowIpcError::Unsupported { .. })));
    }
}
