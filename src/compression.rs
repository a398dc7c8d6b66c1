//! # **Compression Module** - *Codec interface and registry, no codecs included*
//!
//! The wire format allows each `RecordBatch` body to be framed as a sequence
//! of per-buffer regions, each independently compressed. This crate defines
//! only the interface and the 8-byte length-prefix framing by which a
//! registered codec is invoked; it does not link against `lz4`, `zstd`, or
//! any other actual compression implementation. A decoder presented with a
//! compressed batch and no registered codec fails with
//! [`ArrowIpcError::Unsupported`] rather than silently passing bytes through.

use std::sync::{OnceLock, RwLock};

use crate::error::{ArrowIpcError, Result};

/// Identifies which compression scheme a `RecordBatch` body was written
/// with, per the `BodyCompressionMethod` wire enum.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum CompressionCodecId {
    Lz4Frame,
    Zstd,
}

/// A registrable (de)compressor for one [`CompressionCodecId`].
pub trait CompressionCodec: Send + Sync {
    fn id(&self) -> CompressionCodecId;
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&self, input: &[u8], decompressed_len: usize) -> Result<Vec<u8>>;
}

type Registry = RwLock<Vec<Box<dyn CompressionCodec>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(Vec::new()))
}

/// Registers (or replaces) the codec implementation for its
/// [`CompressionCodecId`], process-wide.
pub fn set_compression_codec(codec: Box<dyn CompressionCodec>) {
    let mut reg = registry().write().expect("compression codec registry poisoned");
    reg.retain(|c| c.id() != codec.id());
    reg.push(codec);
}

/// Looks up a previously registered codec. Returns `None` if nothing has
/// been registered for `id`.
pub fn get_compression_codec(id: CompressionCodecId) -> Result<()> {
    let reg = registry().read().expect("compression codec registry poisoned");
    if reg.iter().any(|c| c.id() == id) {
        Ok(())
    } else {
        Err(ArrowIpcError::unsupported(format!(
            "no compression codec registered for {id:?}"
        )))
    }
}

/// Decompresses one buffer region using the registered codec for `id`.
///
/// Per the wire format, a region is prefixed with an 8-byte little-endian
/// length. A value of `-1` means the producer chose to store the buffer
/// uncompressed because compressing it would not have been smaller; the
/// remaining bytes are the raw payload in that case.
pub fn decode_buffer_region(id: CompressionCodecId, region: &[u8]) -> Result<Vec<u8>> {
    if region.len() < 8 {
        return Err(ArrowIpcError::format("compressed buffer region shorter than its length prefix"));
    }
    let prefix = i64::from_le_bytes(region[0..8].try_into().unwrap());
    let payload = &region[8..];
    if prefix == -1 {
        return Ok(payload.to_vec());
    }
    if prefix < 0 {
        return Err(ArrowIpcError::format(format!("negative decompressed length {prefix}")));
    }
    let reg = registry().read().expect("compression codec registry poisoned");
    let codec = reg
        .iter()
        .find(|c| c.id() == id)
        .ok_or_else(|| ArrowIpcError::unsupported(format!("no compression codec registered for {id:?}")))?;
    codec.decompress(payload, prefix as usize)
}

/// Encodes one buffer region: compresses with the registered codec for `id`
/// and keeps the compressed form only if it is smaller than the original,
/// otherwise stores the original bytes with the `-1` sentinel.
pub fn encode_buffer_region(id: CompressionCodecId, raw: &[u8]) -> Result<Vec<u8>> {
    let reg = registry().read().expect("compression codec registry poisoned");
    let codec = reg
        .iter()
        .find(|c| c.id() == id)
        .ok_or_else(|| ArrowIpcError::unsupported(format!("no compression codec registered for {id:?}")))?;
    let compressed = codec.compress(raw)?;
    let mut out = Vec::with_capacity(8 + compressed.len().min(raw.len()));
    if compressed.len() < raw.len() {
        out.extend_from_slice(&(raw.len() as i64).to_le_bytes());
        out.extend_from_slice(&compressed);
    } else {
        out.extend_from_slice(&(-1i64).to_le_bytes());
        out.extend_from_slice(raw);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Passthrough;
    impl CompressionCodec for Passthrough {
        fn id(&self) -> CompressionCodecId {
            CompressionCodecId::Lz4Frame
        }
        fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
            Ok(input.to_vec())
        }
        fn decompress(&self, input: &[u8], decompressed_len: usize) -> Result<Vec<u8>> {
            if input.len() != decompressed_len {
                return Err(ArrowIpcError::format("length mismatch"));
            }
            Ok(input.to_vec())
        }
    }

    #[test]
    fn uncompressed_sentinel_passes_through() {
        let mut region = Vec::new();
        region.extend_from_slice(&(-1i64).to_le_bytes());
        region.extend_from_slice(b"hello");
        let out = decode_buffer_region(CompressionCodecId::Zstd, &region).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn missing_codec_is_unsupported() {
        let mut region = Vec::new();
        region.extend_from_slice(&(5i64).to_le_bytes());
        region.extend_from_slice(b"abcde");
        let err = decode_buffer_region(CompressionCodecId::Zstd, &region).unwrap_err();
        assert!(matches!(err, ArrowIpcError::Unsupported { .. }));
    }

    #[test]
    fn registered_codec_round_trips() {
        set_compression_codec(Box::new(Passthrough));
        let raw = b"roundtrip payload";
        let region = encode_buffer_region(CompressionCodecId::Lz4Frame, raw).unwrap();
        let out = decode_buffer_region(CompressionCodecId::Lz4Frame, &region).unwrap();
        assert_eq!(out, raw);
    }
}
