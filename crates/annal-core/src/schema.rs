//! Model schemas: field names, field kinds, and excluded fields.
//!
//! History tracking needs to know how to read each field of a record. Rather
//! than probing the record for attribute shapes at runtime, every tracked
//! model declares an explicit schema up front, and the serializer dispatches
//! on the field kind.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a field's value is extracted during snapshot serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Plain column value.
    Scalar,
    /// Concrete foreign key; serializes to the referenced object's id.
    ForeignKey,
    /// Many-to-many or one-to-many relation; serializes to a
    /// comma-separated list of related object ids.
    ManyValued,
    /// Reverse side of a one-to-one relation.
    ReverseOneToOne,
    /// Generic foreign key; serializes to the raw id column value.
    GenericForeignKey,
}

/// A single field declaration in a model schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name, used as the snapshot key.
    pub name: String,
    /// Extraction rule for this field.
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Schema for one tracked model: its fields in declaration order plus the
/// set of fields ignored by history tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Model name, stored alongside every historical record.
    pub model: String,
    /// Fields in declaration order. Snapshot and diff ordering follow this.
    pub fields: Vec<FieldDescriptor>,
    /// Fields configured to be ignored when detecting changes.
    #[serde(default)]
    pub excluded_fields: HashSet<String>,
}

impl ModelSchema {
    /// Create an empty schema for a model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            fields: Vec::new(),
            excluded_fields: HashSet::new(),
        }
    }

    /// Builder: add a field with an explicit kind.
    pub fn with_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDescriptor::new(name, kind));
        self
    }

    /// Builder: add a scalar field.
    pub fn scalar(self, name: impl Into<String>) -> Self {
        self.with_field(name, FieldKind::Scalar)
    }

    /// Builder: add a foreign key field.
    pub fn foreign_key(self, name: impl Into<String>) -> Self {
        self.with_field(name, FieldKind::ForeignKey)
    }

    /// Builder: add a many-valued relation field.
    pub fn many_valued(self, name: impl Into<String>) -> Self {
        self.with_field(name, FieldKind::ManyValued)
    }

    /// Builder: add a reverse one-to-one field.
    pub fn reverse_one_to_one(self, name: impl Into<String>) -> Self {
        self.with_field(name, FieldKind::ReverseOneToOne)
    }

    /// Builder: exclude a field from change detection.
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.excluded_fields.insert(name.into());
        self
    }

    /// Whether a field is excluded from history tracking.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_fields.contains(name)
    }
}
