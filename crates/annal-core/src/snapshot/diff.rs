//! Field diff: which fields changed between two snapshots.

use std::collections::HashSet;

use super::Snapshot;

/// Result of diffing two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDiff {
    /// Fields whose values differ, in the current snapshot's field order.
    pub changed: Vec<String>,
    /// Fields that changed but are excluded from change detection. Kept
    /// separate so callers can still see churn on ignored fields.
    pub excluded_changed: Vec<String>,
}

impl FieldDiff {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.excluded_changed.is_empty()
    }
}

/// Compute the fields of `current` whose values differ in `previous`.
///
/// With no previous snapshot there is no prior state to compare against and
/// the diff is empty. A field absent from `previous` compares equal to a
/// null value, so a field that was null and is still null does not register
/// as changed. Field order follows `current`; nothing is sorted.
pub fn diff_fields(
    current: &Snapshot,
    previous: &Snapshot,
    excluded: &HashSet<String>,
) -> FieldDiff {
    let mut diff = FieldDiff::default();
    if previous.is_empty() {
        return diff;
    }
    for (name, value) in current.iter() {
        let previous_value = previous.get(name).flatten();
        if previous_value != value {
            if excluded.contains(name) {
                diff.excluded_changed.push(name.to_string());
            } else {
                diff.changed.push(name.to_string());
            }
        }
    }
    diff
}
