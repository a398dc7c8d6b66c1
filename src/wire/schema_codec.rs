//! `Schema`/`Field`/`KeyValue`/`DictionaryEncoding` FlatBuffers tables,
//! translated to and from [`crate::datatype::DataType`] and
//! [`crate::schema::Schema`].

use std::sync::Arc;

use crate::datatype::{DataType, DateUnit, IntervalUnit, TimeUnit, UnionMode};
use crate::error::{ArrowIpcError, Result};
use crate::field::{Field, Metadata};
use crate::flatbuffers::reader::Table;
use crate::flatbuffers::writer::{Builder, Offset};
use crate::schema::{MetadataVersion, Schema};

use super::type_tag;

// ---------- decode ----------

fn time_unit_from_i16(v: i16) -> Result<TimeUnit> {
    Ok(match v {
        0 => TimeUnit::Second,
        1 => TimeUnit::Millisecond,
        2 => TimeUnit::Microsecond,
        3 => TimeUnit::Nanosecond,
        other => return Err(ArrowIpcError::format(format!("unknown TimeUnit {other}"))),
    })
}

fn time_unit_to_i16(u: TimeUnit) -> i16 {
    match u {
        TimeUnit::Second => 0,
        TimeUnit::Millisecond => 1,
        TimeUnit::Microsecond => 2,
        TimeUnit::Nanosecond => 3,
    }
}

/// Reads `custom_metadata` in wire order. Entries are appended as found in
/// the FlatBuffers vector rather than collected into a sorted map, since a
/// faithful round-trip must preserve producer ordering, not just contents.
pub fn decode_metadata(table: &Table, slot: u16) -> Result<Metadata> {
    let mut out = Vec::new();
    if let Some(vec) = table.read_vector(slot, 4)? {
        for i in 0..vec.length {
            let kv = vec.table_at(i)?;
            let key = kv.read_string(4)?.unwrap_or_default().to_string();
            let value = kv.read_string(6)?.unwrap_or_default().to_string();
            out.push((key, value));
        }
    }
    Ok(out)
}

pub fn decode_field(table: &Table) -> Result<Field> {
    let name = table.read_string(4)?.unwrap_or_default().to_string();
    let nullable = table.read_bool(6, false)?;
    let type_type = table.read_u8(8, type_tag::NONE)?;
    let type_table = table
        .read_table(10)?
        .ok_or_else(|| ArrowIpcError::format("field missing its type table"))?;

    let children = match table.read_vector(14, 4)? {
        Some(vec) => (0..vec.length)
            .map(|i| decode_field(&vec.table_at(i)?))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let mut dtype = decode_type(type_type, &type_table, children)?;

    if let Some(dict_table) = table.read_table(12)? {
        let id = dict_table.read_i64(4, 0)?;
        let is_ordered = dict_table.read_bool(8, false)?;
        // A DictionaryEncoding with no indexType child is a legacy producer
        // quirk; default to the common case (signed Int32), matching how
        // `isOrdered` already defaults to false above.
        let index_type = match dict_table.read_table(6)? {
            Some(index_table) => {
                let bit_width = index_table.read_i32(4, 32)?;
                let signed = index_table.read_bool(6, true)?;
                DataType::int(bit_width as u8, signed)?
            }
            None => DataType::int(32, true)?,
        };
        dtype = DataType::dictionary(dtype, index_type, is_ordered, id)?;
    }

    let metadata = decode_metadata(table, 16)?;
    Ok(Field { name, dtype, nullable, metadata })
}

fn decode_type(type_type: u8, t: &Table, mut children: Vec<Field>) -> Result<DataType> {
    Ok(match type_type {
        type_tag::NULL => DataType::Null,
        type_tag::BOOL => DataType::Boolean,
        type_tag::INT => {
            let bit_width = t.read_i32(4, 32)?;
            let signed = t.read_bool(6, true)?;
            DataType::int(bit_width as u8, signed)?
        }
        type_tag::FLOATING_POINT => {
            let precision = t.read_i16(4, 1)?;
            let bit_width = match precision {
                0 => 16,
                1 => 32,
                2 => 64,
                other => return Err(ArrowIpcError::format(format!("unknown float precision {other}"))),
            };
            DataType::float(bit_width)?
        }
        type_tag::BINARY => DataType::Binary { large: false },
        type_tag::LARGE_BINARY => DataType::Binary { large: true },
        type_tag::UTF8 => DataType::Utf8 { large: false },
        type_tag::LARGE_UTF8 => DataType::Utf8 { large: true },
        type_tag::BINARY_VIEW => DataType::BinaryView,
        type_tag::UTF8_VIEW => DataType::Utf8View,
        type_tag::DECIMAL => {
            let precision = t.read_i32(4, 18)? as u8;
            let scale = t.read_i32(6, 0)? as i8;
            let bit_width = t.read_i32(8, 128)? as u16;
            DataType::decimal(bit_width, precision, scale)?
        }
        type_tag::DATE => {
            let unit = match t.read_i16(4, 1)? {
                0 => DateUnit::Day,
                1 => DateUnit::Millisecond,
                other => return Err(ArrowIpcError::format(format!("unknown DateUnit {other}"))),
            };
            DataType::Date { unit }
        }
        type_tag::TIME => {
            let unit = time_unit_from_i16(t.read_i16(4, 1)?)?;
            let bit_width = t.read_i32(6, 32)? as u8;
            DataType::Time { bit_width, unit }
        }
        type_tag::TIMESTAMP => {
            let unit = time_unit_from_i16(t.read_i16(4, 0)?)?;
            let timezone = t.read_string(6)?.map(|s| s.to_string());
            DataType::Timestamp { unit, timezone }
        }
        type_tag::DURATION => {
            let unit = time_unit_from_i16(t.read_i16(4, 0)?)?;
            DataType::Duration { unit }
        }
        type_tag::INTERVAL => {
            let unit = match t.read_i16(4, 0)? {
                0 => IntervalUnit::YearMonth,
                1 => IntervalUnit::DayTime,
                2 => IntervalUnit::MonthDayNano,
                other => return Err(ArrowIpcError::format(format!("unknown IntervalUnit {other}"))),
            };
            DataType::Interval { unit }
        }
        type_tag::FIXED_SIZE_BINARY => {
            let byte_width = t.read_i32(4, 0)?;
            DataType::FixedSizeBinary { byte_width }
        }
        type_tag::LIST => {
            let field = children.pop().ok_or_else(|| ArrowIpcError::format("List missing its child field"))?;
            DataType::List { field: Arc::new(field), large: false }
        }
        type_tag::LARGE_LIST => {
            let field = children.pop().ok_or_else(|| ArrowIpcError::format("LargeList missing its child field"))?;
            DataType::List { field: Arc::new(field), large: true }
        }
        type_tag::LIST_VIEW => {
            let field = children.pop().ok_or_else(|| ArrowIpcError::format("ListView missing its child field"))?;
            DataType::ListView { field: Arc::new(field), large: false }
        }
        type_tag::LARGE_LIST_VIEW => {
            let field = children
                .pop()
                .ok_or_else(|| ArrowIpcError::format("LargeListView missing its child field"))?;
            DataType::ListView { field: Arc::new(field), large: true }
        }
        type_tag::FIXED_SIZE_LIST => {
            let size = t.read_i32(4, 0)?;
            let field = children
                .pop()
                .ok_or_else(|| ArrowIpcError::format("FixedSizeList missing its child field"))?;
            DataType::FixedSizeList { field: Arc::new(field), size }
        }
        type_tag::STRUCT => DataType::Struct { fields: Arc::new(children) },
        type_tag::UNION => {
            let mode = match t.read_i16(4, 0)? {
                0 => UnionMode::Sparse,
                1 => UnionMode::Dense,
                other => return Err(ArrowIpcError::format(format!("unknown UnionMode {other}"))),
            };
            let type_ids = match t.read_vector(6, 4)? {
                Some(vec) => (0..vec.length).map(|i| crate::bytes::read_i32(vec.elem(i), 0).map(|v| v as i8)).collect::<Result<Vec<_>>>()?,
                None => (0..children.len() as i8).collect(),
            };
            DataType::Union { mode, fields: Arc::new(children), type_ids: Arc::new(type_ids) }
        }
        type_tag::MAP => {
            let keys_sorted = t.read_bool(4, false)?;
            let entries = children.pop().ok_or_else(|| ArrowIpcError::format("Map missing its entries field"))?;
            DataType::Map { entries: Arc::new(entries), keys_sorted }
        }
        type_tag::RUN_END_ENCODED => {
            if children.len() != 2 {
                return Err(ArrowIpcError::format("RunEndEncoded requires exactly two children"));
            }
            let values = children.pop().unwrap();
            let run_ends = children.pop().unwrap();
            DataType::run_end_encoded(run_ends, values)?
        }
        other => return Err(ArrowIpcError::unsupported(format!("unknown Type tag {other}"))),
    })
}

pub fn decode_schema(table: &Table) -> Result<Schema> {
    let fields = match table.read_vector(6, 4)? {
        Some(vec) => (0..vec.length)
            .map(|i| decode_field(&vec.table_at(i)?))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    let metadata = decode_metadata(table, 8)?;
    Ok(Schema { version: MetadataVersion::V5, fields, metadata })
}

// ---------- encode ----------

pub(crate) fn encode_metadata(b: &mut Builder, metadata: &Metadata) -> Option<Offset> {
    if metadata.is_empty() {
        return None;
    }
    let entries: Vec<Offset> = metadata
        .iter()
        .map(|(k, v)| {
            let key = b.create_string(k);
            let value = b.create_string(v);
            b.start_table();
            b.push_slot_offset(4, key);
            b.push_slot_offset(6, value);
            b.end_table()
        })
        .collect();
    Some(b.create_vector_offsets(&entries))
}

struct EncodedType {
    type_type: u8,
    type_offset: Offset,
    children: Vec<Offset>,
}

fn encode_type(b: &mut Builder, dtype: &DataType) -> Result<EncodedType> {
    Ok(match dtype {
        DataType::Null => {
            b.start_table();
            EncodedType { type_type: type_tag::NULL, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Boolean => {
            b.start_table();
            EncodedType { type_type: type_tag::BOOL, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Int { bit_width, signed } => {
            b.start_table();
            b.push_slot_i32(4, *bit_width as i32, 0);
            b.push_slot_bool(6, *signed, false);
            EncodedType { type_type: type_tag::INT, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Float { bit_width } => {
            let precision = match bit_width {
                16 => 0,
                32 => 1,
                64 => 2,
                other => return Err(ArrowIpcError::invalid_argument(format!("bad float bit width {other}"))),
            };
            b.start_table();
            b.push_slot_i16(4, precision, -1);
            EncodedType { type_type: type_tag::FLOATING_POINT, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Decimal { bit_width, precision, scale } => {
            b.start_table();
            b.push_slot_i32(4, *precision as i32, -1);
            b.push_slot_i32(6, *scale as i32, -999);
            b.push_slot_i32(8, *bit_width as i32, -1);
            EncodedType { type_type: type_tag::DECIMAL, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Date { unit } => {
            let u = match unit {
                DateUnit::Day => 0,
                DateUnit::Millisecond => 1,
            };
            b.start_table();
            b.push_slot_i16(4, u, -1);
            EncodedType { type_type: type_tag::DATE, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Time { bit_width, unit } => {
            b.start_table();
            b.push_slot_i16(4, time_unit_to_i16(*unit), -1);
            b.push_slot_i32(6, *bit_width as i32, 0);
            EncodedType { type_type: type_tag::TIME, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Timestamp { unit, timezone } => {
            let tz = timezone.as_ref().map(|s| b.create_string(s));
            b.start_table();
            b.push_slot_i16(4, time_unit_to_i16(*unit), -1);
            b.push_slot_offset_opt(6, tz);
            EncodedType { type_type: type_tag::TIMESTAMP, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Duration { unit } => {
            b.start_table();
            b.push_slot_i16(4, time_unit_to_i16(*unit), -1);
            EncodedType { type_type: type_tag::DURATION, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Interval { unit } => {
            let u = match unit {
                IntervalUnit::YearMonth => 0,
                IntervalUnit::DayTime => 1,
                IntervalUnit::MonthDayNano => 2,
            };
            b.start_table();
            b.push_slot_i16(4, u, -1);
            EncodedType { type_type: type_tag::INTERVAL, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Binary { large: false } => {
            b.start_table();
            EncodedType { type_type: type_tag::BINARY, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Binary { large: true } => {
            b.start_table();
            EncodedType { type_type: type_tag::LARGE_BINARY, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Utf8 { large: false } => {
            b.start_table();
            EncodedType { type_type: type_tag::UTF8, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Utf8 { large: true } => {
            b.start_table();
            EncodedType { type_type: type_tag::LARGE_UTF8, type_offset: b.end_table(), children: vec![] }
        }
        DataType::BinaryView => {
            b.start_table();
            EncodedType { type_type: type_tag::BINARY_VIEW, type_offset: b.end_table(), children: vec![] }
        }
        DataType::Utf8View => {
            b.start_table();
            EncodedType { type_type: type_tag::UTF8_VIEW, type_offset: b.end_table(), children: vec![] }
        }
        DataType::FixedSizeBinary { byte_width } => {
            b.start_table();
            b.push_slot_i32(4, *byte_width, 0);
            EncodedType { type_type: type_tag::FIXED_SIZE_BINARY, type_offset: b.end_table(), children: vec![] }
        }
        DataType::List { field, large } => {
            b.start_table();
            let tag = if *large { type_tag::LARGE_LIST } else { type_tag::LIST };
            EncodedType { type_type: tag, type_offset: b.end_table(), children: vec![encode_field(b, field)?] }
        }
        DataType::ListView { field, large } => {
            b.start_table();
            let tag = if *large { type_tag::LARGE_LIST_VIEW } else { type_tag::LIST_VIEW };
            EncodedType { type_type: tag, type_offset: b.end_table(), children: vec![encode_field(b, field)?] }
        }
        DataType::FixedSizeList { field, size } => {
            b.start_table();
            b.push_slot_i32(4, *size, 0);
            EncodedType {
                type_type: type_tag::FIXED_SIZE_LIST,
                type_offset: b.end_table(),
                children: vec![encode_field(b, field)?],
            }
        }
        DataType::Struct { fields } => {
            let children = fields.iter().map(|f| encode_field(b, f)).collect::<Result<Vec<_>>>()?;
            b.start_table();
            EncodedType { type_type: type_tag::STRUCT, type_offset: b.end_table(), children }
        }
        DataType::Union { mode, fields, type_ids } => {
            let children = fields.iter().map(|f| encode_field(b, f)).collect::<Result<Vec<_>>>()?;
            let ids_vec = b.create_vector_i32(&type_ids.iter().map(|&x| x as i32).collect::<Vec<_>>());
            b.start_table();
            b.push_slot_i16(4, if *mode == UnionMode::Dense { 1 } else { 0 }, -1);
            b.push_slot_offset(6, ids_vec);
            EncodedType { type_type: type_tag::UNION, type_offset: b.end_table(), children }
        }
        DataType::Map { entries, keys_sorted } => {
            let child = encode_field(b, entries)?;
            b.start_table();
            b.push_slot_bool(4, *keys_sorted, false);
            EncodedType { type_type: type_tag::MAP, type_offset: b.end_table(), children: vec![child] }
        }
        DataType::RunEndEncoded { run_ends, values } => {
            let re = encode_field(b, run_ends)?;
            let va = encode_field(b, values)?;
            b.start_table();
            EncodedType { type_type: type_tag::RUN_END_ENCODED, type_offset: b.end_table(), children: vec![re, va] }
        }
        DataType::Dictionary { value_type, .. } => return encode_type(b, value_type),
    })
}

pub fn encode_field(b: &mut Builder, field: &Field) -> Result<Offset> {
    let name = b.create_string(&field.name);
    let encoded = encode_type(b, &field.dtype)?;
    let children_vec = if encoded.children.is_empty() {
        None
    } else {
        Some(b.create_vector_offsets(&encoded.children))
    };
    let dictionary = if let DataType::Dictionary { index_type, ordered, id, .. } = &field.dtype {
        let (bit_width, signed) = match index_type.as_ref() {
            DataType::Int { bit_width, signed } => (*bit_width, *signed),
            _ => unreachable!("DataType::dictionary validated index_type is Int"),
        };
        b.start_table();
        b.push_slot_i32(4, bit_width as i32, 0);
        b.push_slot_bool(6, signed, false);
        let index_table = b.end_table();
        b.start_table();
        b.push_slot_i64(4, *id, 0);
        b.push_slot_offset(6, index_table);
        b.push_slot_bool(8, *ordered, false);
        Some(b.end_table())
    } else {
        None
    };
    let metadata = encode_metadata(b, &field.metadata);

    b.start_table();
    b.push_slot_offset(4, name);
    b.push_slot_bool(6, field.nullable, false);
    b.push_slot_u8(8, encoded.type_type, type_tag::NONE);
    b.push_slot_offset(10, encoded.type_offset);
    b.push_slot_offset_opt(12, dictionary);
    b.push_slot_offset_opt(14, children_vec);
    b.push_slot_offset_opt(16, metadata);
    Ok(b.end_table())
}

pub fn encode_schema(b: &mut Builder, schema: &Schema) -> Result<Offset> {
    let fields = schema.fields.iter().map(|f| encode_field(b, f)).collect::<Result<Vec<_>>>()?;
    let fields_vec = b.create_vector_offsets(&fields);
    let metadata = encode_metadata(b, &schema.metadata);

    b.start_table();
    b.push_slot_i16(4, 0, -1); // endianness: always little
    b.push_slot_offset(6, fields_vec);
    b.push_slot_offset_opt(8, metadata);
    Ok(b.end_table())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_field_round_trips() {
        let mut b = Builder::new();
        let schema = Schema::new(vec![
            Field::new("id", DataType::int64(), false, None),
            Field::new("name", DataType::utf8(), true, None),
        ]);
        let off = encode_schema(&mut b, &schema).unwrap();
        b.finish(off);
        let buf = b.finished_bytes();
        let root = Table::root(buf, 0).unwrap();
        let decoded = decode_schema(&root).unwrap();
        assert_eq!(decoded.fields.len(), 2);
        assert_eq!(decoded.fields[0].name, "id");
        assert_eq!(decoded.fields[0].dtype, DataType::int64());
        assert!(!decoded.fields[0].nullable);
        assert_eq!(decoded.fields[1].dtype, DataType::utf8());
        assert!(decoded.fields[1].nullable);
    }

    #[test]
    fn nested_list_of_struct_round_trips() {
        let mut b = Builder::new();
        let inner = DataType::struct_(vec![
            Field::new("x", DataType::float64(), false, None),
            Field::new("y", DataType::float64(), false, None),
        ]);
        let schema = Schema::new(vec![Field::new(
            "points",
            DataType::list(Field::new("item", inner, true, None)),
            true,
            None,
        )]);
        let off = encode_schema(&mut b, &schema).unwrap();
        b.finish(off);
        let buf = b.finished_bytes();
        let root = Table::root(buf, 0).unwrap();
        let decoded = decode_schema(&root).unwrap();
        match &decoded.fields[0].dtype {
            DataType::List { field, large } => {
                assert!(!large);
                match &field.dtype {
                    DataType::Struct { fields } => assert_eq!(fields.len(), 2),
                    other => panic!("expected struct child, got {other:?}"),
                }
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn dictionary_field_round_trips() {
        let mut b = Builder::new();
        let dtype = DataType::dictionary(DataType::utf8(), DataType::int32(), false, 7).unwrap();
        let schema = Schema::new(vec![Field::new("cat", dtype, true, None)]);
        let off = encode_schema(&mut b, &schema).unwrap();
        b.finish(off);
        let buf = b.finished_bytes();
        let root = Table::root(buf, 0).unwrap();
        let decoded = decode_schema(&root).unwrap();
        match &decoded.fields[0].dtype {
            DataType::Dictionary { value_type, index_type, id, .. } => {
                assert_eq!(**value_type, DataType::utf8());
                assert_eq!(**index_type, DataType::int32());
                assert_eq!(*id, 7);
            }
            other => panic!("expected dictionary, got {other:?}"),
        }
    }

    #[test]
    fn metadata_round_trips_in_order() {
        let mut b = Builder::new();
        let meta = vec![
            ("zebra".to_string(), "1".to_string()),
            ("apple".to_string(), "2".to_string()),
            ("k".to_string(), "v".to_string()),
        ];
        let schema = Schema::new(vec![Field::new("a", DataType::int32(), false, None)]).with_metadata(meta.clone());
        let off = encode_schema(&mut b, &schema).unwrap();
        b.finish(off);
        let buf = b.finished_bytes();
        let root = Table::root(buf, 0).unwrap();
        let decoded = decode_schema(&root).unwrap();
        assert_eq!(decoded.metadata, meta);
    }
}
