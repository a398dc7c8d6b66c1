//! The File format's trailing directory: `ARROW1` magic at both ends of the
//! file, a `Footer` FlatBuffers table, and `Block` entries locating each
//! `Schema`/`RecordBatch`/`DictionaryBatch` message already written in
//! stream order earlier in the file.

use crate::bytes::{read_i32, read_i64};
use crate::error::{ArrowIpcError, Result};
use crate::field::Metadata;
use crate::flatbuffers::reader::Table;
use crate::flatbuffers::writer::Builder;
use crate::schema::{MetadataVersion, Schema};

use super::schema_codec;

pub const FILE_MAGIC: &[u8; 6] = b"ARROW1";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    pub offset: i64,
    pub metadata_length: i32,
    pub body_length: i64,
}

#[derive(Clone, Debug)]
pub struct Footer {
    pub version: MetadataVersion,
    pub schema: Schema,
    pub dictionaries: Vec<Block>,
    pub record_batches: Vec<Block>,
    pub metadata: Metadata,
}

/// `Block` is a fixed-layout (no vtable) 24-byte struct: `offset: i64`,
/// `metadataLength: i32` (+ 4 bytes of padding), `bodyLength: i64`.
fn decode_block(elem: &[u8]) -> Result<Block> {
    Ok(Block {
        offset: read_i64(elem, 0)?,
        metadata_length: read_i32(elem, 8)?,
        body_length: read_i64(elem, 16)?,
    })
}

fn version_from_i16(v: i16) -> Result<MetadataVersion> {
    match v {
        3 => Ok(MetadataVersion::V4),
        4 => Ok(MetadataVersion::V5),
        other => Err(ArrowIpcError::unsupported(format!("unsupported MetadataVersion {other}"))),
    }
}

fn version_to_i16(v: MetadataVersion) -> i16 {
    match v {
        MetadataVersion::V4 => 3,
        MetadataVersion::V5 => 4,
    }
}

/// Decodes a `Footer` FlatBuffers table, as found just before the trailing
/// `ARROW1` magic and 4-byte footer length.
pub fn decode_footer(bytes: &[u8]) -> Result<Footer> {
    let table = Table::root(bytes, 0)?;
    let version = version_from_i16(table.read_i16(4, 0)?)?;
    let schema_table = table
        .read_table(6)?
        .ok_or_else(|| ArrowIpcError::format("footer missing its schema"))?;
    let schema = schema_codec::decode_schema(&schema_table)?;

    let dictionaries = match table.read_vector(8, 24)? {
        Some(vec) => (0..vec.length).map(|i| decode_block(vec.elem(i))).collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    let record_batches = match table.read_vector(10, 24)? {
        Some(vec) => (0..vec.length).map(|i| decode_block(vec.elem(i))).collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    let metadata = schema_codec::decode_metadata(&table, 12)?;

    Ok(Footer { version, schema, dictionaries, record_batches, metadata })
}

fn encode_block(block: Block) -> [u8; 24] {
    let mut out = [0u8; 24];
    out[0..8].copy_from_slice(&block.offset.to_le_bytes());
    out[8..12].copy_from_slice(&block.metadata_length.to_le_bytes());
    // bytes 12..16 are Block's 4-byte padding in the real schema, left zero.
    out[16..24].copy_from_slice(&block.body_length.to_le_bytes());
    out
}

/// Builds the `Footer` FlatBuffers bytes (not yet wrapped in `ARROW1` magic
/// or length-prefixed; [`super::encode::write_file_footer`] does that).
pub fn encode_footer(
    schema: &Schema,
    dictionaries: &[Block],
    record_batches: &[Block],
    metadata: &Metadata,
) -> Result<Vec<u8>> {
    let mut b = Builder::new();
    let schema_offset = schema_codec::encode_schema(&mut b, schema)?;

    let dict_bytes: Vec<u8> = dictionaries.iter().flat_map(|blk| encode_block(*blk)).collect();
    let dict_vec = b.create_vector_raw(&dict_bytes, 24);
    let rb_bytes: Vec<u8> = record_batches.iter().flat_map(|blk| encode_block(*blk)).collect();
    let rb_vec = b.create_vector_raw(&rb_bytes, 24);
    let metadata_offset = schema_codec::encode_metadata(&mut b, metadata);

    b.start_table();
    b.push_slot_i16(4, version_to_i16(MetadataVersion::V5), -1);
    b.push_slot_offset(6, schema_offset);
    b.push_slot_offset(8, dict_vec);
    b.push_slot_offset(10, rb_vec);
    b.push_slot_offset_opt(12, metadata_offset);
    let root = b.end_table();
    b.finish(root);
    Ok(b.finished_bytes().to_vec())
}

/// Locates and strips the trailing `ARROW1` magic + 4-byte footer length,
/// returning the `Footer` FlatBuffers bytes.
pub fn extract_footer_bytes(file_bytes: &[u8]) -> Result<&[u8]> {
    if file_bytes.len() < FILE_MAGIC.len() * 2 + 4 {
        return Err(ArrowIpcError::format("file too short to contain Arrow IPC File framing"));
    }
    let end = file_bytes.len();
    if &file_bytes[end - FILE_MAGIC.len()..end] != FILE_MAGIC {
        return Err(ArrowIpcError::format("missing trailing ARROW1 magic"));
    }
    if &file_bytes[0..FILE_MAGIC.len()] != FILE_MAGIC {
        return Err(ArrowIpcError::format("missing leading ARROW1 magic"));
    }
    let len_pos = end - FILE_MAGIC.len() - 4;
    let footer_len = read_i32(file_bytes, len_pos)?;
    if footer_len <= 0 {
        return Err(ArrowIpcError::format("non-positive footer length"));
    }
    let footer_start = len_pos - footer_len as usize;
    Ok(&file_bytes[footer_start..len_pos])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::field::Field;

    #[test]
    fn footer_round_trips_with_blocks() {
        let schema = Schema::new(vec![Field::new("a", DataType::int64(), false, None)]);
        let dicts = vec![Block { offset: 8, metadata_length: 64, body_length: 16 }];
        let batches = vec![
            Block { offset: 80, metadata_length: 96, body_length: 32 },
            Block { offset: 220, metadata_length: 96, body_length: 48 },
        ];
        let bytes = encode_footer(&schema, &dicts, &batches, &Vec::new()).unwrap();
        let decoded = decode_footer(&bytes).unwrap();
        assert_eq!(decoded.schema.fields.len(), 1);
        assert_eq!(decoded.dictionaries, dicts);
        assert_eq!(decoded.record_batches, batches);
        assert!(decoded.metadata.is_empty());
    }

    #[test]
    fn footer_custom_metadata_round_trips_in_order() {
        let schema = Schema::new(vec![Field::new("a", DataType::int64(), false, None)]);
        let metadata = vec![("written_by".to_string(), "lightstream-ipc".to_string()), ("z".to_string(), "1".to_string())];
        let bytes = encode_footer(&schema, &[], &[], &metadata).unwrap();
        let decoded = decode_footer(&bytes).unwrap();
        assert_eq!(decoded.metadata, metadata);
    }

    #[test]
    fn extract_footer_bytes_rejects_missing_magic() {
        let bytes = vec![0u8; 20];
        assert!(extract_footer_bytes(&bytes).is_err());
    }
}
