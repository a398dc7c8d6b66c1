//! Assembles whole messages and whole streams/files out of the pieces
//! [`super::message`] and [`super::footer`] know how to encode individually.
//!
//! A message on the wire is: a 4-byte continuation marker, a 4-byte
//! metadata length (counted from the marker itself, padded so the body
//! that follows starts 8-byte aligned), the metadata bytes, then the body
//! bytes (themselves padded to 8 bytes). [`Block::metadata_length`] records
//! that whole prefix, matching how the File format's footer points back
//! into the stream.

use crate::bytes;
use crate::error::Result;
use crate::schema::Schema;

use super::footer::{self, Block, FILE_MAGIC};
use super::message::{self, MessageHeader, CONTINUATION_MARKER};

/// Writes one message (continuation marker, length, metadata, body) onto
/// `out`, returning the [`Block`] locating it for callers building a File
/// footer.
pub fn write_message(out: &mut Vec<u8>, header: &MessageHeader, body: &[u8]) -> Result<Block> {
    let offset = out.len() as i64;
    let mut metadata = message::encode_message(header, body.len() as i64)?;
    bytes::pad_to(&mut metadata, 8);

    out.extend_from_slice(&CONTINUATION_MARKER.to_le_bytes());
    out.extend_from_slice(&(metadata.len() as i32).to_le_bytes());
    out.extend_from_slice(&metadata);
    out.extend_from_slice(body);
    bytes::pad_to(out, 8);

    let metadata_length = 8 + metadata.len() as i32;
    Ok(Block { offset, metadata_length, body_length: body.len() as i64 })
}

/// Writes the end-of-stream marker: a continuation marker followed by a
/// zero-length metadata field, with no body.
pub fn write_end_of_stream(out: &mut Vec<u8>) {
    out.extend_from_slice(&CONTINUATION_MARKER.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
}

/// Writes the File format's trailing directory: the `Footer` table, its
/// 4-byte length, and the closing `ARROW1` magic. Callers write the leading
/// `ARROW1` magic and the stream body themselves before calling this.
pub fn write_file_footer(out: &mut Vec<u8>, schema: &Schema, dictionaries: &[Block], record_batches: &[Block]) -> Result<()> {
    let footer_bytes = footer::encode_footer(schema, dictionaries, record_batches, &schema.metadata)?;
    out.extend_from_slice(&footer_bytes);
    out.extend_from_slice(&(footer_bytes.len() as i32).to_le_bytes());
    out.extend_from_slice(FILE_MAGIC);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::field::Field;
    use crate::schema::Schema;
    use crate::wire::batch_codec::{FieldNode, RecordBatchMeta};

    #[test]
    fn written_message_is_eight_byte_aligned_and_round_trips() {
        let schema = Schema::new(vec![Field::new("a", DataType::int32(), false, None)]);
        let mut out = Vec::new();
        let block = write_message(&mut out, &MessageHeader::Schema(schema.clone()), &[]).unwrap();
        assert_eq!(out.len() % 8, 0);
        assert_eq!(block.offset, 0);
        assert_eq!(block.body_length, 0);

        let parsed = message::read_next_message(&out, 0).unwrap().unwrap();
        match parsed.message.header {
            MessageHeader::Schema(decoded) => assert_eq!(decoded.fields[0].name, "a"),
            _ => panic!("expected schema header"),
        }
    }

    #[test]
    fn end_of_stream_marker_is_recognized() {
        let mut out = Vec::new();
        write_end_of_stream(&mut out);
        assert!(message::read_next_message(&out, 0).unwrap().is_none());
    }

    #[test]
    fn file_round_trip_with_one_record_batch() {
        let schema = Schema::new(vec![Field::new("a", DataType::int32(), false, None)]);
        let mut out = Vec::new();
        out.extend_from_slice(FILE_MAGIC);
        let schema_block = write_message(&mut out, &MessageHeader::Schema(schema.clone()), &[]).unwrap();
        let _ = schema_block;

        let body = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let meta = RecordBatchMeta {
            length: 2,
            nodes: vec![FieldNode { length: 2, null_count: 0 }],
            buffers: vec![crate::wire::batch_codec::BufferMeta { offset: 0, length: 8 }],
            compression: None,
            variadic_buffer_counts: Vec::new(),
        };
        let rb_block = write_message(&mut out, &MessageHeader::RecordBatch(meta), &body).unwrap();
        write_end_of_stream(&mut out);

        write_file_footer(&mut out, &schema, &[], &[rb_block]).unwrap();
        assert_eq!(&out[0..6], FILE_MAGIC);
        assert_eq!(&out[out.len() - 6..], FILE_MAGIC);

        let footer_bytes = footer::extract_footer_bytes(&out).unwrap();
        let decoded_footer = footer::decode_footer(footer_bytes).unwrap();
        assert_eq!(decoded_footer.record_batches.len(), 1);
        assert_eq!(decoded_footer.schema.fields.len(), 1);
    }
}
