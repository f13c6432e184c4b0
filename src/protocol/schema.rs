//! Field schema extraction
//!
//! Every message type declares its fields once, in order, as a static list of
//! [`FieldDescriptor`]s. [`FieldSchema::extract`] turns that list into the two
//! ordered name sequences the codec and the envelope work with. The result is
//! cached per type by the [`message!`](crate::message) macro, so instantiation
//! never pays for it again.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::SchemaError;
use super::{Error, Result};

/// One declared data field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: &'static str,
    column: bool,
}

impl FieldDescriptor {
    /// Describe a field
    #[must_use]
    pub const fn new(name: &'static str, column: bool) -> Self {
        Self { name, column }
    }

    /// Field name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the host indexes this field as its own column
    #[must_use]
    pub const fn is_column(&self) -> bool {
        self.column
    }
}

/// Ordered field names of a message type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    all_fields: Vec<&'static str>,
    column_fields: Vec<&'static str>,
}

impl FieldSchema {
    /// Derive the schema from a declared field list.
    ///
    /// Order is first occurrence; a repeated name keeps its first position and
    /// its first column flag.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the type or package name is unusable, no
    /// field is declared, or a field name is empty.
    pub fn extract(
        type_name: &str,
        package: &str,
        descriptors: &[FieldDescriptor],
    ) -> std::result::Result<Self, SchemaError> {
        let display = format!("{package}.{type_name}");

        if type_name.is_empty() || type_name.contains('.') {
            return Err(SchemaError::new(display, "type name must be a single non-empty segment"));
        }
        if package.is_empty() || package.split('.').any(str::is_empty) {
            return Err(SchemaError::new(display, "package name has an empty segment"));
        }
        if descriptors.is_empty() {
            return Err(SchemaError::new(display, "no fields declared"));
        }

        let mut all_fields = Vec::with_capacity(descriptors.len());
        let mut column_fields = Vec::new();
        for descriptor in descriptors {
            let name = descriptor.name();
            if name.is_empty() {
                return Err(SchemaError::new(display, "field with empty name"));
            }
            if all_fields.contains(&name) {
                continue;
            }
            all_fields.push(name);
            if descriptor.is_column() {
                column_fields.push(name);
            }
        }

        Ok(Self {
            all_fields,
            column_fields,
        })
    }

    /// Every data field, in declaration order
    #[must_use]
    pub fn all_fields(&self) -> &[&'static str] {
        &self.all_fields
    }

    /// Fields flagged for external indexing, in declaration order
    #[must_use]
    pub fn column_fields(&self) -> &[&'static str] {
        &self.column_fields
    }

    /// Number of declared fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.all_fields.len()
    }

    /// Always false for an extracted schema
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_fields.is_empty()
    }

    /// Position of a field in declaration order
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.all_fields.iter().position(|field| *field == name)
    }

    /// Whether `name` is a declared field
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Whether `name` is a column field
    #[must_use]
    pub fn is_column(&self, name: &str) -> bool {
        self.column_fields.iter().any(|field| *field == name)
    }
}

/// Package used when a type gives no explicit override: the last segment of
/// its declaring module path.
#[doc(hidden)]
#[must_use]
pub fn package_from_module(module_path: &'static str) -> &'static str {
    module_path.rsplit("::").next().unwrap_or(module_path)
}

#[doc(hidden)]
pub fn field_to_value<T: Serialize>(
    type_name: &'static str,
    field: &'static str,
    value: &T,
) -> Result<Value> {
    serde_json::to_value(value).map_err(|source| Error::FieldType {
        type_name,
        field,
        source,
    })
}

#[doc(hidden)]
pub fn field_from_value<T: DeserializeOwned>(
    type_name: &'static str,
    field: &'static str,
    value: Value,
) -> Result<T> {
    serde_json::from_value(value).map_err(|source| Error::FieldType {
        type_name,
        field,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: &[FieldDescriptor] = &[
        FieldDescriptor::new("id", false),
        FieldDescriptor::new("amount", true),
        FieldDescriptor::new("note", false),
    ];

    #[test]
    fn test_extract_keeps_declaration_order() {
        let schema = FieldSchema::extract("Order", "demo", ORDER).unwrap();
        assert_eq!(schema.all_fields(), &["id", "amount", "note"]);
        assert_eq!(schema.column_fields(), &["amount"]);
        assert_eq!(schema.position("note"), Some(2));
        assert!(schema.is_column("amount"));
        assert!(!schema.is_column("id"));
        assert!(!schema.contains("missing"));
    }

    #[test]
    fn test_extract_is_idempotent() {
        let first = FieldSchema::extract("Order", "demo", ORDER).unwrap();
        let second = FieldSchema::extract("Order", "demo", ORDER).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_repeated_name_keeps_first_position() {
        let fields = [
            FieldDescriptor::new("a", false),
            FieldDescriptor::new("b", true),
            FieldDescriptor::new("a", true),
        ];
        let schema = FieldSchema::extract("Dup", "demo", &fields).unwrap();
        assert_eq!(schema.all_fields(), &["a", "b"]);
        assert_eq!(schema.column_fields(), &["b"]);
    }

    #[test]
    fn test_columns_are_subset_of_fields() {
        let schema = FieldSchema::extract("Order", "demo", ORDER).unwrap();
        for column in schema.column_fields() {
            assert!(schema.contains(column));
        }
    }

    #[test]
    fn test_rejects_unusable_declarations() {
        assert!(FieldSchema::extract("Empty", "demo", &[]).is_err());
        assert!(FieldSchema::extract("", "demo", ORDER).is_err());
        assert!(FieldSchema::extract("a.B", "demo", ORDER).is_err());
        assert!(FieldSchema::extract("Order", "", ORDER).is_err());
        assert!(FieldSchema::extract("Order", "demo..x", ORDER).is_err());

        let err = FieldSchema::extract("Blank", "demo", &[FieldDescriptor::new("", false)])
            .unwrap_err();
        assert_eq!(err.type_name, "demo.Blank");
    }

    #[test]
    fn test_package_from_module() {
        assert_eq!(package_from_module("my_crate::messages::billing"), "billing");
        assert_eq!(package_from_module("billing"), "billing");
    }
}
