//! # **lightstream-ipc** - *Apache Arrow IPC stream and file codec*
//!
//! Decodes and encodes the Arrow Columnar IPC format: the `Schema`,
//! `RecordBatch`, and `DictionaryBatch` messages that make up both the
//! streaming wire protocol and the random-access file format, plus a small
//! builder layer for constructing batches from native values without going
//! through an intermediate array library.
//!
//! The FlatBuffers layer ([`flatbuffers`]) is hand-rolled rather than
//! generated, since the IPC format only exercises a narrow slice of
//! FlatBuffers (tables, vtables, vectors, strings); [`datatype`] and
//! [`field`]/[`schema`] define the closed Arrow type system this crate
//! understands, [`batch`] is the decoded, zero-copy columnar value, and
//! [`wire`] carries the message framing between them.

pub mod batch;
pub mod bitmask;
pub mod buffer;
pub mod builder;
pub mod bytes;
pub mod column;
pub mod compression;
pub mod datatype;
pub mod decode;
pub mod error;
pub mod field;
pub mod flatbuffers;
pub(crate) mod hashmap;
pub mod ipc;
pub mod schema;
pub mod table;
pub mod wire;

pub use batch::Batch;
pub use datatype::{DataType, IntervalUnit, TimeUnit, UnionMode};
pub use error::{ArrowIpcError, Result};
pub use field::Field;
pub use schema::{MetadataVersion, Schema};
pub use table::Table;

pub use ipc::{decode_ipc, get_compression_codec, set_compression_codec, table_from_ipc, table_to_ipc, IpcFormat};
pub use builder::{column_from_array, column_from_values, table_from_arrays, ColumnBuilderOptions, Value};
