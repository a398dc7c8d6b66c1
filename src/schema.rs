//! # **Schema Module** - *The decoded Schema message*
//!
//! Holds the ordered [`Field`] list plus schema-level metadata carried by the
//! IPC `Schema` message (component B). Endianness is always little on the
//! wire this crate speaks; a schema declaring big-endian is rejected at
//! decode time rather than represented here.

use crate::error::{ArrowIpcError, Result};
use crate::field::{Field, Metadata};

/// The metadata version a `Schema` message was written against. Only V4 and
/// V5 appear in practice; this crate decodes both and always encodes V5.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum MetadataVersion {
    V4,
    V5,
}

#[derive(PartialEq, Clone, Debug)]
pub struct Schema {
    pub version: MetadataVersion,
    pub fields: Vec<Field>,
    pub metadata: Metadata,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { version: MetadataVersion::V5, fields, metadata: Vec::new() }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Index of the first field with this name. Duplicate field names
    /// resolve to the first match, matching how every downstream lookup
    /// (Table::column, decode visitor) addresses fields by name.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| ArrowIpcError::invalid_argument(format!("no field named '{name}' in schema")))
    }

    pub fn field(&self, name: &str) -> Result<&Field> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;

    #[test]
    fn duplicate_names_resolve_to_first() {
        let schema = Schema::new(vec![
            Field::new("a", DataType::int32(), false, None),
            Field::new("a", DataType::utf8(), true, None),
        ]);
        assert_eq!(schema.index_of("a").unwrap(), 0);
    }

    #[test]
    fn missing_field_is_invalid_argument() {
        let schema = Schema::new(vec![Field::new("a", DataType::int32(), false, None)]);
        assert!(matches!(
            schema.field("zzz").unwrap_err(),
            ArrowIpcError::InvalidArgument { .. }
        ));
    }
}
