//! # **Field Module** - *Named, typed, nullable column slots*
//!
//! A `Field` names one slot in a [`crate::schema::Schema`] or a nested type's
//! child list: a `DataType`, a nullability flag, and an ordered string-keyed
//! metadata map carried through unmodified on round-trip.

use std::fmt;

use crate::datatype::DataType;

/// Key/value pairs in wire order. A `BTreeMap` would silently re-sort
/// `custom_metadata` alphabetically on every round-trip, which producers
/// that rely on metadata ordering (e.g. pandas' index reconstruction) don't
/// tolerate.
pub type Metadata = Vec<(String, String)>;

#[derive(PartialEq, Clone, Debug)]
pub struct Field {
    pub name: String,
    pub dtype: DataType,
    pub nullable: bool,
    pub metadata: Metadata,
}

impl Field {
    pub fn new(
        name: impl Into<String>,
        dtype: DataType,
        nullable: bool,
        metadata: Option<Metadata>,
    ) -> Self {
        Self {
            name: name.into(),
            dtype,
            nullable,
            metadata: metadata.unwrap_or_default(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}{}",
            self.name,
            self.dtype,
            if self.nullable { "" } else { " NOT NULL" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_marks_non_nullable() {
        let f = Field::new("id", DataType::int32(), false, None);
        assert_eq!(f.to_string(), "id: Int32 NOT NULL");
    }

    #[test]
    fn metadata_defaults_to_empty() {
        let f = Field::new("x", DataType::utf8(), true, None);
        assert!(f.metadata.is_empty());
    }
}
