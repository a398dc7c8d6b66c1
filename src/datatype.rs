//! # **DataType Module** - *The closed Arrow type system*
//!
//! A tagged union over every logical type this crate can carry, rather than
//! a per-variant class hierarchy: the number and order of buffers and
//! children a batch needs is a pure function of a `DataType` tag, and the
//! decode visitor ([`crate::decode::visitor`]) and builders
//! ([`crate::builder`]) both dispatch on it exactly once, in one place,
//! instead of once per type implementation.
//!
//! Canonical constructors (`DataType::int32()`, `DataType::float64()`, ...)
//! are provided for the common cases; the parameterized variants
//! (`Int`, `Float`, `Decimal`, `Time`, ...) exist so the closed set stays
//! genuinely closed instead of growing one variant per bit width.

use std::fmt;
use std::sync::Arc;

use crate::error::{ArrowIpcError, Result};
use crate::field::Field;

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeUnit::Second => "Second",
            TimeUnit::Millisecond => "Millisecond",
            TimeUnit::Microsecond => "Microsecond",
            TimeUnit::Nanosecond => "Nanosecond",
        })
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum IntervalUnit {
    YearMonth,
    DayTime,
    MonthDayNano,
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntervalUnit::YearMonth => "YearMonth",
            IntervalUnit::DayTime => "DayTime",
            IntervalUnit::MonthDayNano => "MonthDayNano",
        })
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum UnionMode {
    Sparse,
    Dense,
}

/// Closed set of Arrow logical types.
#[derive(PartialEq, Clone, Debug)]
pub enum DataType {
    Null,
    Boolean,
    Int { bit_width: u8, signed: bool },
    Float { bit_width: u8 },
    Decimal { bit_width: u16, precision: u8, scale: i8 },
    /// 32-bit day count (`unit == Day`) or 64-bit millisecond count
    /// (`unit == Millisecond`) since the Unix epoch.
    Date { unit: DateUnit },
    Time { bit_width: u8, unit: TimeUnit },
    Timestamp { unit: TimeUnit, timezone: Option<String> },
    Duration { unit: TimeUnit },
    Interval { unit: IntervalUnit },
    Binary { large: bool },
    Utf8 { large: bool },
    BinaryView,
    Utf8View,
    FixedSizeBinary { byte_width: i32 },
    List { field: Arc<Field>, large: bool },
    ListView { field: Arc<Field>, large: bool },
    FixedSizeList { field: Arc<Field>, size: i32 },
    Struct { fields: Arc<Vec<Field>> },
    Union { mode: UnionMode, fields: Arc<Vec<Field>>, type_ids: Arc<Vec<i8>> },
    Dictionary { value_type: Box<DataType>, index_type: Box<DataType>, ordered: bool, id: i64 },
    Map { entries: Arc<Field>, keys_sorted: bool },
    RunEndEncoded { run_ends: Arc<Field>, values: Arc<Field> },
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum DateUnit {
    Day,
    Millisecond,
}

const VALID_INT_WIDTHS: [u8; 4] = [8, 16, 32, 64];
const VALID_DECIMAL_WIDTHS: [u16; 4] = [32, 64, 128, 256];
const VALID_FLOAT_WIDTHS: [u8; 3] = [16, 32, 64];

impl DataType {
    pub fn int(bit_width: u8, signed: bool) -> Result<Self> {
        if !VALID_INT_WIDTHS.contains(&bit_width) {
            return Err(ArrowIpcError::invalid_argument(format!(
                "integer bit width must be one of 8/16/32/64, got {bit_width}"
            )));
        }
        Ok(DataType::Int { bit_width, signed })
    }

    pub fn float(bit_width: u8) -> Result<Self> {
        if !VALID_FLOAT_WIDTHS.contains(&bit_width) {
            return Err(ArrowIpcError::invalid_argument(format!(
                "float bit width must be one of 16/32/64, got {bit_width}"
            )));
        }
        Ok(DataType::Float { bit_width })
    }

    pub fn decimal(bit_width: u16, precision: u8, scale: i8) -> Result<Self> {
        if !VALID_DECIMAL_WIDTHS.contains(&bit_width) {
            return Err(ArrowIpcError::invalid_argument(format!(
                "decimal bit width must be one of 32/64/128/256, got {bit_width}"
            )));
        }
        Ok(DataType::Decimal { bit_width, precision, scale })
    }

    pub fn dictionary(value_type: DataType, index_type: DataType, ordered: bool, id: i64) -> Result<Self> {
        if !matches!(index_type, DataType::Int { .. }) {
            return Err(ArrowIpcError::invalid_argument(
                "dictionary index type must be an integer type",
            ));
        }
        Ok(DataType::Dictionary {
            value_type: Box::new(value_type),
            index_type: Box::new(index_type),
            ordered,
            id,
        })
    }

    pub fn run_end_encoded(run_ends: Field, values: Field) -> Result<Self> {
        if !matches!(run_ends.dtype, DataType::Int { .. }) {
            return Err(ArrowIpcError::invalid_argument(
                "run-end-encoded's first child (run_ends) must be an integer type",
            ));
        }
        Ok(DataType::RunEndEncoded { run_ends: Arc::new(run_ends), values: Arc::new(values) })
    }

    pub fn union(
        mode: UnionMode,
        fields: Vec<Field>,
        type_ids: Option<Vec<i8>>,
    ) -> Result<Self> {
        let type_ids = match type_ids {
            Some(ids) => {
                if ids.len() != fields.len() {
                    return Err(ArrowIpcError::invalid_argument(
                        "union type_ids length must match the number of children",
                    ));
                }
                ids
            }
            None => (0..fields.len() as i8).collect(),
        };
        Ok(DataType::Union { mode, fields: Arc::new(fields), type_ids: Arc::new(type_ids) })
    }

    pub fn struct_(fields: Vec<Field>) -> Self {
        DataType::Struct { fields: Arc::new(fields) }
    }

    pub fn map(entries: Field, keys_sorted: bool) -> Self {
        DataType::Map { entries: Arc::new(entries), keys_sorted }
    }

    // Canonical spellings, per the closed-set convention.
    pub fn int8() -> Self { DataType::Int { bit_width: 8, signed: true } }
    pub fn int16() -> Self { DataType::Int { bit_width: 16, signed: true } }
    pub fn int32() -> Self { DataType::Int { bit_width: 32, signed: true } }
    pub fn int64() -> Self { DataType::Int { bit_width: 64, signed: true } }
    pub fn uint8() -> Self { DataType::Int { bit_width: 8, signed: false } }
    pub fn uint16() -> Self { DataType::Int { bit_width: 16, signed: false } }
    pub fn uint32() -> Self { DataType::Int { bit_width: 32, signed: false } }
    pub fn uint64() -> Self { DataType::Int { bit_width: 64, signed: false } }
    pub fn float16() -> Self { DataType::Float { bit_width: 16 } }
    pub fn float32() -> Self { DataType::Float { bit_width: 32 } }
    pub fn float64() -> Self { DataType::Float { bit_width: 64 } }
    pub fn utf8() -> Self { DataType::Utf8 { large: false } }
    pub fn large_utf8() -> Self { DataType::Utf8 { large: true } }
    pub fn binary() -> Self { DataType::Binary { large: false } }
    pub fn large_binary() -> Self { DataType::Binary { large: true } }
    pub fn date_day() -> Self { DataType::Date { unit: DateUnit::Day } }
    pub fn date_millisecond() -> Self { DataType::Date { unit: DateUnit::Millisecond } }
    pub fn timestamp(unit: TimeUnit, timezone: Option<String>) -> Self {
        DataType::Timestamp { unit, timezone }
    }

    pub fn list(field: Field) -> Self {
        DataType::List { field: Arc::new(field), large: false }
    }
    pub fn large_list(field: Field) -> Self {
        DataType::List { field: Arc::new(field), large: true }
    }
    pub fn fixed_size_list(field: Field, size: i32) -> Self {
        DataType::FixedSizeList { field: Arc::new(field), size }
    }

    /// True for the multi-buffer "view" layouts (16-byte inline-or-pointer
    /// records plus out-of-line variadic data buffers).
    pub fn is_view_layout(&self) -> bool {
        matches!(self, DataType::BinaryView | DataType::Utf8View | DataType::ListView { .. })
    }

    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            DataType::List { .. }
                | DataType::ListView { .. }
                | DataType::FixedSizeList { .. }
                | DataType::Struct { .. }
                | DataType::Union { .. }
                | DataType::Map { .. }
                | DataType::RunEndEncoded { .. }
        )
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, DataType::Dictionary { .. })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Null => f.write_str("Null"),
            DataType::Boolean => f.write_str("Boolean"),
            DataType::Int { bit_width, signed } => {
                write!(f, "{}{}", if *signed { "Int" } else { "UInt" }, bit_width)
            }
            DataType::Float { bit_width } => write!(f, "Float{bit_width}"),
            DataType::Decimal { bit_width, precision, scale } => {
                write!(f, "Decimal{bit_width}({precision}, {scale})")
            }
            DataType::Date { unit } => write!(f, "Date({unit:?})"),
            DataType::Time { bit_width, unit } => write!(f, "Time{bit_width}({unit})"),
            DataType::Timestamp { unit, timezone } => match timezone {
                Some(tz) => write!(f, "Timestamp({unit}, {tz})"),
                None => write!(f, "Timestamp({unit})"),
            },
            DataType::Duration { unit } => write!(f, "Duration({unit})"),
            DataType::Interval { unit } => write!(f, "Interval({unit})"),
            DataType::Binary { large } => write!(f, "{}Binary", if *large { "Large" } else { "" }),
            DataType::Utf8 { large } => write!(f, "{}Utf8", if *large { "Large" } else { "" }),
            DataType::BinaryView => f.write_str("BinaryView"),
            DataType::Utf8View => f.write_str("Utf8View"),
            DataType::FixedSizeBinary { byte_width } => write!(f, "FixedSizeBinary({byte_width})"),
            DataType::List { field, large } => {
                write!(f, "{}List<{}>", if *large { "Large" } else { "" }, field.dtype)
            }
            DataType::ListView { field, large } => {
                write!(f, "{}ListView<{}>", if *large { "Large" } else { "" }, field.dtype)
            }
            DataType::FixedSizeList { field, size } => {
                write!(f, "FixedSizeList<{}>({size})", field.dtype)
            }
            DataType::Struct { fields } => write!(f, "Struct({} fields)", fields.len()),
            DataType::Union { mode, fields, .. } => write!(f, "{mode:?}Union({} fields)", fields.len()),
            DataType::Dictionary { value_type, index_type, .. } => {
                write!(f, "Dictionary<{index_type}, {value_type}>")
            }
            DataType::Map { entries, .. } => write!(f, "Map<{}>", entries.dtype),
            DataType::RunEndEncoded { values, .. } => write!(f, "RunEndEncoded<{}>", values.dtype),
        }
    }
}
