//! The authoritative working record for one session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::extracted::{FieldCandidate, Origin};
use super::schema::FieldPath;
use super::value::FieldValue;
use crate::domain::foundation::Confidence;

/// A value that has been accepted into the draft, with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedField {
    pub value: FieldValue,
    pub confidence: Confidence,
    pub origin: Origin,
    pub excerpt: Option<String>,
}

impl From<&FieldCandidate> for AcceptedField {
    fn from(candidate: &FieldCandidate) -> Self {
        Self {
            value: candidate.value.clone(),
            confidence: candidate.confidence,
            origin: candidate.origin,
            excerpt: candidate.excerpt.clone(),
        }
    }
}

/// Two sources disagree materially on a field; the user must pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConflict {
    pub field: FieldPath,
    pub current: AcceptedField,
    pub proposed: AcceptedField,
}

/// Mutated only through [`FieldMerger`](super::FieldMerger); everything
/// outside this module reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    fields: BTreeMap<FieldPath, AcceptedField>,
    conflicts: BTreeMap<FieldPath, FieldConflict>,
}

impl ProjectDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: FieldPath) -> Option<&AcceptedField> {
        self.fields.get(&path)
    }

    pub fn value(&self, path: FieldPath) -> Option<&FieldValue> {
        self.fields.get(&path).map(|field| &field.value)
    }

    pub fn contains(&self, path: FieldPath) -> bool {
        self.fields.contains_key(&path)
    }

    pub fn fields(&self) -> impl Iterator<Item = (FieldPath, &AcceptedField)> {
        self.fields.iter().map(|(path, field)| (*path, field))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn conflict(&self, path: FieldPath) -> Option<&FieldConflict> {
        self.conflicts.get(&path)
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &FieldConflict> {
        self.conflicts.values()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Flat `path -> value` JSON object, the shape the project store takes.
    pub fn to_payload(&self) -> serde_json::Map<String, serde_json::Value> {
        self.fields
            .iter()
            .map(|(path, field)| (path.as_str().to_string(), field.value.to_json()))
            .collect()
    }

    /// Payload restricted to `paths`, skipping any the draft lacks.
    pub fn payload_for(&self, paths: &[FieldPath]) -> serde_json::Map<String, serde_json::Value> {
        paths
            .iter()
            .filter_map(|path| {
                self.value(*path)
                    .map(|value| (path.as_str().to_string(), value.to_json()))
            })
            .collect()
    }

    pub(super) fn put(&mut self, path: FieldPath, field: AcceptedField) {
        self.fields.insert(path, field);
    }

    pub(super) fn put_conflict(&mut self, conflict: FieldConflict) {
        self.conflicts.insert(conflict.field, conflict);
    }

    pub(super) fn clear_conflict(&mut self, path: FieldPath) -> Option<FieldConflict> {
        self.conflicts.remove(&path)
    }

    /// Points an open conflict at the newly stored value.
    pub(super) fn refresh_conflict(&mut self, path: FieldPath, current: &AcceptedField) {
        if let Some(open) = self.conflicts.get_mut(&path) {
            open.current = current.clone();
        }
    }
}
