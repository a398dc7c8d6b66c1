//! The `Message` envelope shared by every IPC message: a continuation
//! marker, a metadata length, a FlatBuffers `Message` table, and (for
//! `RecordBatch`/`DictionaryBatch`) a body of raw, 8-byte-aligned buffer
//! bytes immediately following the metadata.

use crate::bytes::{read_i32, read_u32};
use crate::error::{ArrowIpcError, Result};
use crate::flatbuffers::reader::Table;
use crate::flatbuffers::writer::{Builder, Offset};
use crate::schema::{MetadataVersion, Schema};

use super::batch_codec::{self, DictionaryBatchMeta, RecordBatchMeta};
use super::schema_codec;
use super::{header_tag, type_tag};

/// The 4-byte marker that precedes every message's metadata length in the
/// modern (continuation-aware) framing.
pub const CONTINUATION_MARKER: u32 = 0xFFFF_FFFF;

#[derive(Clone, Debug)]
pub enum MessageHeader {
    Schema(Schema),
    RecordBatch(RecordBatchMeta),
    DictionaryBatch(DictionaryBatchMeta),
}

#[derive(Clone, Debug)]
pub struct DecodedMessage {
    pub version: MetadataVersion,
    pub header: MessageHeader,
    pub body_length: i64,
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

/// Decodes the FlatBuffers `Message` table from `metadata` (already stripped
/// of the continuation marker and length prefix).
pub fn decode_message(metadata: &[u8]) -> Result<DecodedMessage> {
    let table = Table::root(metadata, 0)?;
    let version = version_from_i16(table.read_i16(4, 0)?)?;
    let header_type = table.read_u8(6, type_tag::NONE)?;
    let body_length = table.read_i64(10, 0)?;
    let header_table = table
        .read_table(8)?
        .ok_or_else(|| ArrowIpcError::format("message missing its header table"))?;

    let header = match header_type {
        header_tag::SCHEMA => MessageHeader::Schema(schema_codec::decode_schema(&header_table)?),
        header_tag::RECORD_BATCH => MessageHeader::RecordBatch(batch_codec::decode_record_batch(&header_table)?),
        header_tag::DICTIONARY_BATCH => {
            MessageHeader::DictionaryBatch(batch_codec::decode_dictionary_batch(&header_table)?)
        }
        other => return Err(ArrowIpcError::unsupported(format!("unknown MessageHeader tag {other}"))),
    };

    Ok(DecodedMessage { version, header, body_length })
}

/// Builds the FlatBuffers `Message` table bytes for one message, finished
/// and ready to be length-prefixed by [`super::encode`].
pub fn encode_message(header: &MessageHeader, body_length: i64) -> Result<Vec<u8>> {
    let mut b = Builder::new();
    let (header_type, header_offset): (u8, Offset) = match header {
        MessageHeader::Schema(schema) => (header_tag::SCHEMA, schema_codec::encode_schema(&mut b, schema)?),
        MessageHeader::RecordBatch(meta) => (header_tag::RECORD_BATCH, batch_codec::encode_record_batch(&mut b, meta)),
        MessageHeader::DictionaryBatch(meta) => {
            (header_tag::DICTIONARY_BATCH, batch_codec::encode_dictionary_batch(&mut b, meta))
        }
    };

    b.start_table();
    b.push_slot_i16(4, version_to_i16(MetadataVersion::V5), -1);
    b.push_slot_u8(6, header_type, header_tag::NONE);
    b.push_slot_offset(8, header_offset);
    b.push_slot_i64(10, body_length, 0);
    let root = b.end_table();
    b.finish(root);
    Ok(b.finished_bytes().to_vec())
}

/// One message parsed off a byte stream: its decoded envelope, the raw body
/// slice (empty for `Schema` messages), and the absolute position of the
/// next message.
pub struct StreamMessage<'a> {
    pub message: DecodedMessage,
    pub body: &'a [u8],
    pub next_pos: usize,
}

/// Reads one message starting at `pos`, handling both the modern
/// continuation-marker framing and the legacy pre-0.15 framing (a bare
/// `i32` metadata length with no marker). Returns `None` on the stream's
/// end-of-stream marker (a zero-length metadata field).
pub fn read_next_message(buf: &[u8], pos: usize) -> Result<Option<StreamMessage<'_>>> {
    if pos == buf.len() {
        return Ok(None);
    }
    let first = read_u32(buf, pos)?;
    let (metadata_length, metadata_start) = if first == CONTINUATION_MARKER {
        (read_i32(buf, pos + 4)?, pos + 8)
    } else {
        (first as i32, pos + 4)
    };

    if metadata_length == 0 {
        return Ok(None);
    }
    if metadata_length < 0 {
        return Err(ArrowIpcError::format(format!("negative message metadata length {metadata_length}")));
    }
    let metadata_end = metadata_start + metadata_length as usize;
    let metadata = buf
        .get(metadata_start..metadata_end)
        .ok_or_else(|| ArrowIpcError::format("truncated message metadata"))?;

    let message = decode_message(metadata)?;
    let body_len = message.body_length as usize;
    let body_start = metadata_end;
    let body_end = body_start + body_len;
    let body = buf
        .get(body_start..body_end)
        .ok_or_else(|| ArrowIpcError::format("truncated message body"))?;

    Ok(Some(StreamMessage { message, body, next_pos: body_end }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::{align_to, pad_to};
    use crate::datatype::DataType;
    use crate::field::Field;

    #[test]
    fn schema_message_round_trips_through_continuation_framing() {
        let schema = Schema::new(vec![Field::new("a", DataType::int32(), false, None)]);
        let metadata = encode_message(&MessageHeader::Schema(schema.clone()), 0).unwrap();

        let mut buf = Vec::new();
        buf.extend_from_slice(&CONTINUATION_MARKER.to_le_bytes());
        buf.extend_from_slice(&(metadata.len() as i32).to_le_bytes());
        buf.extend_from_slice(&metadata);
        pad_to(&mut buf, 8);
        assert_eq!(buf.len(), align_to(buf.len(), 8));

        let parsed = read_next_message(&buf, 0).unwrap().unwrap();
        match parsed.message.header {
            MessageHeader::Schema(decoded) => assert_eq!(decoded.fields[0].name, "a"),
            _ => panic!("expected schema header"),
        }
        assert_eq!(parsed.body.len(), 0);
    }

    #[test]
    fn zero_length_metadata_signals_end_of_stream() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&CONTINUATION_MARKER.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        assert!(read_next_message(&buf, 0).unwrap().is_none());
    }
}
