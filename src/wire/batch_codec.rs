//! `RecordBatch`/`DictionaryBatch` FlatBuffers tables: the per-column
//! `FieldNode`/`Buffer` directories that the decode visitor
//! ([`crate::decode::visitor`]) walks against a body of raw bytes.

use crate::bytes::read_i64;
use crate::error::{ArrowIpcError, Result};
use crate::flatbuffers::reader::Table;
use crate::flatbuffers::writer::{Builder, Offset};

/// `FieldNode`: a fixed-layout (no vtable) 16-byte struct, one per column in
/// depth-first pre-order (a nested type contributes one node for itself plus
/// one for each of its children).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldNode {
    pub length: i64,
    pub null_count: i64,
}

impl FieldNode {
    pub fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..8].copy_from_slice(&self.length.to_le_bytes());
        out[8..16].copy_from_slice(&self.null_count.to_le_bytes());
        out
    }

    fn from_slice(b: &[u8]) -> Result<Self> {
        Ok(Self { length: read_i64(b, 0)?, null_count: read_i64(b, 8)? })
    }
}

/// `Buffer`: a fixed-layout 16-byte struct giving one buffer's region within
/// the message body, in depth-first pre-order matching [`FieldNode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferMeta {
    pub offset: i64,
    pub length: i64,
}

impl BufferMeta {
    pub fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..8].copy_from_slice(&self.offset.to_le_bytes());
        out[8..16].copy_from_slice(&self.length.to_le_bytes());
        out
    }

    fn from_slice(b: &[u8]) -> Result<Self> {
        Ok(Self { offset: read_i64(b, 0)?, length: read_i64(b, 8)? })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionCodec {
    Lz4Frame,
    Zstd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyCompressionMeta {
    pub codec: CompressionCodec,
    // method is always BUFFER (0) in current Arrow; carried for completeness.
    pub method: i8,
}

#[derive(Clone, Debug)]
pub struct RecordBatchMeta {
    pub length: i64,
    pub nodes: Vec<FieldNode>,
    pub buffers: Vec<BufferMeta>,
    pub compression: Option<BodyCompressionMeta>,
    /// One entry per `BinaryView`/`Utf8View` column, in the order those
    /// columns appear, counting how many out-of-line variadic data buffers
    /// that column contributed to `buffers` (beyond its validity + views
    /// buffers).
    pub variadic_buffer_counts: Vec<i64>,
}

#[derive(Clone, Debug)]
pub struct DictionaryBatchMeta {
    pub id: i64,
    pub data: RecordBatchMeta,
    pub is_delta: bool,
}

fn decode_compression(t: &Table) -> Result<BodyCompressionMeta> {
    let codec = match t.read_i8(4, 0)? {
        0 => CompressionCodec::Lz4Frame,
        1 => CompressionCodec::Zstd,
        other => return Err(ArrowIpcError::unsupported(format!("unknown compression codec id {other}"))),
    };
    let method = t.read_i8(6, 0)?;
    Ok(BodyCompressionMeta { codec, method })
}

fn encode_compression(b: &mut Builder, c: &BodyCompressionMeta) -> Offset {
    let codec = match c.codec {
        CompressionCodec::Lz4Frame => 0,
        CompressionCodec::Zstd => 1,
    };
    b.start_table();
    b.push_slot_i8(4, codec, 0);
    b.push_slot_i8(6, c.method, 0);
    b.end_table()
}

pub fn decode_record_batch(t: &Table) -> Result<RecordBatchMeta> {
    let length = t.read_i64(4, 0)?;
    let nodes = match t.read_vector(6, 16)? {
        Some(vec) => (0..vec.length).map(|i| FieldNode::from_slice(vec.elem(i))).collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    let buffers = match t.read_vector(8, 16)? {
        Some(vec) => (0..vec.length).map(|i| BufferMeta::from_slice(vec.elem(i))).collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    let compression = match t.read_table(10)? {
        Some(ct) => Some(decode_compression(&ct)?),
        None => None,
    };
    let variadic_buffer_counts = match t.read_vector(12, 8)? {
        Some(vec) => (0..vec.length).map(|i| read_i64(vec.elem(i), 0)).collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    Ok(RecordBatchMeta { length, nodes, buffers, compression, variadic_buffer_counts })
}

pub fn encode_record_batch(b: &mut Builder, meta: &RecordBatchMeta) -> Offset {
    let node_bytes: Vec<u8> = meta.nodes.iter().flat_map(|n| n.to_bytes()).collect();
    let nodes_vec = b.create_vector_raw(&node_bytes, 16);
    let buf_bytes: Vec<u8> = meta.buffers.iter().flat_map(|buf| buf.to_bytes()).collect();
    let buffers_vec = b.create_vector_raw(&buf_bytes, 16);
    let compression_offset = meta.compression.as_ref().map(|c| encode_compression(b, c));
    let variadic_vec = if meta.variadic_buffer_counts.is_empty() {
        None
    } else {
        Some(b.create_vector_i64(&meta.variadic_buffer_counts))
    };

    b.start_table();
    b.push_slot_i64(4, meta.length, 0);
    b.push_slot_offset(6, nodes_vec);
    b.push_slot_offset(8, buffers_vec);
    b.push_slot_offset_opt(10, compression_offset);
    b.push_slot_offset_opt(12, variadic_vec);
    b.end_table()
}

pub fn decode_dictionary_batch(t: &Table) -> Result<DictionaryBatchMeta> {
    let id = t.read_i64(4, 0)?;
    let data_table = t
        .read_table(6)?
        .ok_or_else(|| ArrowIpcError::format("dictionary batch missing its RecordBatch body"))?;
    let data = decode_record_batch(&data_table)?;
    let is_delta = t.read_bool(8, false)?;
    Ok(DictionaryBatchMeta { id, data, is_delta })
}

pub fn encode_dictionary_batch(b: &mut Builder, meta: &DictionaryBatchMeta) -> Offset {
    let data_offset = encode_record_batch(b, &meta.data);
    b.start_table();
    b.push_slot_i64(4, meta.id, 0);
    b.push_slot_offset(6, data_offset);
    b.push_slot_bool(8, meta.is_delta, false);
    b.end_table()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_batch_meta_round_trips() {
        let meta = RecordBatchMeta {
            length: 3,
            nodes: vec![FieldNode { length: 3, null_count: 1 }],
            buffers: vec![BufferMeta { offset: 0, length: 8 }, BufferMeta { offset: 8, length: 24 }],
            compression: None,
            variadic_buffer_counts: Vec::new(),
        };
        let mut b = Builder::new();
        let off = encode_record_batch(&mut b, &meta);
        b.finish(off);
        let buf = b.finished_bytes();
        let root = Table::root(buf, 0).unwrap();
        let decoded = decode_record_batch(&root).unwrap();
        assert_eq!(decoded.length, 3);
        assert_eq!(decoded.nodes, meta.nodes);
        assert_eq!(decoded.buffers, meta.buffers);
        assert!(decoded.compression.is_none());
    }

    #[test]
    fn dictionary_batch_meta_round_trips() {
        let data = RecordBatchMeta {
            length: 2,
            nodes: vec![FieldNode { length: 2, null_count: 0 }],
            buffers: vec![BufferMeta { offset: 0, length: 0 }, BufferMeta { offset: 0, length: 16 }],
            compression: Some(BodyCompressionMeta { codec: CompressionCodec::Zstd, method: 0 }),
            variadic_buffer_counts: vec![2],
        };
        let meta = DictionaryBatchMeta { id: 9, data, is_delta: true };
        let mut b = Builder::new();
        let off = encode_dictionary_batch(&mut b, &meta);
        b.finish(off);
        let buf = b.finished_bytes();
        let root = Table::root(buf, 0).unwrap();
        let decoded = decode_dictionary_batch(&root).unwrap();
        assert_eq!(decoded.id, 9);
        assert!(decoded.is_delta);
        assert_eq!(decoded.data.compression, Some(BodyCompressionMeta { codec: CompressionCodec::Zstd, method: 0 }));
    }
}
