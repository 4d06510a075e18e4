//! Candidate field values with provenance.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::schema::FieldPath;
use super::value::FieldValue;
use crate::domain::foundation::Confidence;

/// Where a candidate value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Document,
    /// A direct statement by the user in the chat.
    Conversation,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidate {
    pub value: FieldValue,
    pub confidence: Confidence,
    pub excerpt: Option<String>,
    pub origin: Origin,
}

impl FieldCandidate {
    pub fn new(value: FieldValue, confidence: Confidence, origin: Origin) -> Self {
        Self {
            value,
            confidence,
            excerpt: None,
            origin,
        }
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }
}

/// Mapping from field path to its best candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedFieldSet {
    candidates: BTreeMap<FieldPath, FieldCandidate>,
}

impl ExtractedFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a candidate, keeping whichever of old and new scores higher.
    /// Ties keep the earlier candidate so insertion order stays irrelevant
    /// for equal inputs.
    pub fn insert(&mut self, path: FieldPath, candidate: FieldCandidate) {
        match self.candidates.get(&path) {
            Some(existing) if !candidate.confidence.exceeds(&existing.confidence) => {}
            _ => {
                self.candidates.insert(path, candidate);
            }
        }
    }

    pub fn with(mut self, path: FieldPath, candidate: FieldCandidate) -> Self {
        self.insert(path, candidate);
        self
    }

    pub fn get(&self, path: FieldPath) -> Option<&FieldCandidate> {
        self.candidates.get(&path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldPath, &FieldCandidate)> {
        self.candidates.iter().map(|(path, candidate)| (*path, candidate))
    }

    pub fn paths(&self) -> impl Iterator<Item = FieldPath> + '_ {
        self.candidates.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Folds another set into this one under the same keep-the-best rule.
    pub fn absorb(&mut self, other: ExtractedFieldSet) {
        for (path, candidate) in other.candidates {
            self.insert(path, candidate);
        }
    }
}
