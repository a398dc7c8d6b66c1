//! # **Wire Module** - *Arrow IPC message framing and bodies*
//!
//! Translates between [`crate::flatbuffers`] tables and this crate's
//! [`crate::datatype::DataType`]/[`crate::schema::Schema`]/[`crate::batch::Batch`]
//! model: [`message`] is the outer envelope every IPC message shares,
//! [`schema_codec`] handles `Schema`/`Field`, [`batch_codec`] handles
//! `RecordBatch`/`DictionaryBatch` bodies, [`footer`] handles the File
//! format's trailing directory, and [`encode`] assembles full messages for
//! writing.

pub mod batch_codec;
pub mod encode;
pub mod footer;
pub mod message;
pub mod schema_codec;

/// Arrow's `Type` union tags (`Schema.fbs`), the discriminant carried
/// alongside every `Field.type_type`.
pub mod type_tag {
    pub const NONE: u8 = 0;
    pub const NULL: u8 = 1;
    pub const INT: u8 = 2;
    pub const FLOATING_POINT: u8 = 3;
    pub const BINARY: u8 = 4;
    pub const UTF8: u8 = 5;
    pub const BOOL: u8 = 6;
    pub const DECIMAL: u8 = 7;
    pub const DATE: u8 = 8;
    pub const TIME: u8 = 9;
    pub const TIMESTAMP: u8 = 10;
    pub const INTERVAL: u8 = 11;
    pub const LIST: u8 = 12;
    pub const STRUCT: u8 = 13;
    pub const UNION: u8 = 14;
    pub const FIXED_SIZE_BINARY: u8 = 15;
    pub const FIXED_SIZE_LIST: u8 = 16;
    pub const MAP: u8 = 17;
    pub const DURATION: u8 = 18;
    pub const LARGE_BINARY: u8 = 19;
    pub const LARGE_UTF8: u8 = 20;
    pub const LARGE_LIST: u8 = 21;
    pub const RUN_END_ENCODED: u8 = 22;
    pub const BINARY_VIEW: u8 = 23;
    pub const UTF8_VIEW: u8 = 24;
    pub const LIST_VIEW: u8 = 25;
    pub const LARGE_LIST_VIEW: u8 = 26;
}

/// `MessageHeader` union tags (`Message.fbs`).
pub mod header_tag {
    pub const NONE: u8 = 0;
    pub const SCHEMA: u8 = 1;
    pub const DICTIONARY_BATCH: u8 = 2;
    pub const RECORD_BATCH: u8 = 3;
}
