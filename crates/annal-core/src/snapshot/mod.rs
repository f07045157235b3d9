//! Record snapshots: serializing a record's fields to stringified values.
//!
//! A snapshot is an ordered mapping from field name to stringified value,
//! taken at a point in time. Snapshots are what gets diffed and what gets
//! persisted in historical records.

mod diff;

pub use diff::{diff_fields, FieldDiff};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use thiserror::Error;

use crate::error::{AnnalError, AnnalResult};
use crate::schema::{FieldDescriptor, ModelSchema};

/// An ordered `field name -> stringified value` mapping.
///
/// `None` models SQL null. Iteration order is insertion order, which for
/// serialized snapshots is the schema's declaration order; nothing is
/// sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<(String, Option<String>)>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field value. Schemas do not produce duplicate names; if one
    /// is inserted anyway, lookup returns the first occurrence.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        self.entries.push((name.into(), value));
    }

    /// Look up a field. Outer `None` means the field is absent.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref())
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>, V: Into<Option<String>>> FromIterator<(S, V)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (S, V)>>(iter: T) -> Self {
        let mut snapshot = Snapshot::new();
        for (name, value) in iter {
            snapshot.insert(name, value.into());
        }
        snapshot
    }
}

// Snapshots persist as JSON objects. The field order is part of the
// snapshot, so (de)serialization goes through the entry list rather than a
// map type that would reorder keys.
impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = Snapshot;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of field names to nullable string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Snapshot, A::Error> {
                let mut snapshot = Snapshot::new();
                while let Some((name, value)) = access.next_entry::<String, Option<String>>()? {
                    snapshot.insert(name, value);
                }
                Ok(snapshot)
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

/// Extracted value for one field, produced by a [`FieldSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Stringified column value, or null.
    Scalar(Option<String>),
    /// Stringified id of a referenced object, or null. Used for foreign
    /// keys, reverse one-to-one relations, and generic foreign keys.
    Reference(Option<String>),
    /// Related object ids for a many-valued relation, in query order.
    Related(Vec<String>),
}

/// Failure surface for field extraction.
#[derive(Debug, Error)]
pub enum FieldAccessError {
    /// The referenced object does not exist. The serializer coerces this to
    /// a null value instead of failing the snapshot.
    #[error("related object does not exist")]
    DoesNotExist,
    /// The source could not read the field at all.
    #[error("field read failed: {0}")]
    Read(String),
}

/// The seam between history tracking and the persistence layer.
///
/// Implementations extract field values for a single record according to
/// the descriptor's [`FieldKind`]. Many-valued relations must be read from
/// the writable connection, not a read replica: history is recorded in the
/// same operation as the write, and a lagging replica would snapshot stale
/// relation members.
pub trait FieldSource {
    fn field_value(&self, field: &FieldDescriptor) -> Result<FieldValue, FieldAccessError>;
}

/// Related ids being removed in the same operation as the snapshot.
///
/// When history is recorded before a save that also clears entries from a
/// many-valued relation, the relation still contains the outgoing ids at
/// snapshot time. Registering them here keeps them out of the serialized
/// value. An entry of `None` drops the whole relation's members.
#[derive(Debug, Clone, Default)]
pub struct RemovedRelations {
    removed: HashMap<String, Option<Vec<String>>>,
}

impl RemovedRelations {
    /// Builder: exclude specific ids from a relation field.
    pub fn remove_ids<I, S>(mut self, field: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.removed.insert(
            field.into(),
            Some(ids.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Builder: treat the whole relation as cleared.
    pub fn clear_all(mut self, field: impl Into<String>) -> Self {
        self.removed.insert(field.into(), None);
        self
    }

    fn apply(&self, field: &str, ids: Vec<String>) -> Vec<String> {
        match self.removed.get(field) {
            None => ids,
            Some(None) => Vec::new(),
            Some(Some(removed)) => ids.into_iter().filter(|id| !removed.contains(id)).collect(),
        }
    }
}

/// Serialize a record into a [`Snapshot`] according to its schema.
///
/// Excluded fields are skipped. A missing related object serializes as
/// null; any other extraction failure is surfaced as a validation error.
pub fn serialize(
    source: &dyn FieldSource,
    schema: &ModelSchema,
    removed: &RemovedRelations,
) -> AnnalResult<Snapshot> {
    let mut snapshot = Snapshot::new();
    for field in &schema.fields {
        if schema.is_excluded(&field.name) {
            continue;
        }
        let value = match source.field_value(field) {
            Ok(value) => value,
            Err(FieldAccessError::DoesNotExist) => FieldValue::Reference(None),
            Err(FieldAccessError::Read(msg)) => {
                return Err(AnnalError::validation(format!(
                    "failed to read field '{}' of model '{}': {}",
                    field.name, schema.model, msg
                )));
            }
        };
        match value {
            FieldValue::Scalar(v) | FieldValue::Reference(v) => {
                snapshot.insert(&field.name, v);
            }
            FieldValue::Related(ids) => {
                let ids = removed.apply(&field.name, ids);
                snapshot.insert(&field.name, Some(ids.join(", ")));
            }
        }
    }
    Ok(snapshot)
}
