//! Walks record batch bodies into [`crate::batch::Batch`] values and back.
//! [`crate::ipc`] drives this module message-by-message; [`crate::builder`]
//! is the inverse entry point on the encode side for callers starting from
//! native values rather than an already-assembled `Batch`.

mod visitor;

pub use visitor::{decode_record_batch_fields, encode_batches_to_body, DictionaryContext, EncodeCollector};
