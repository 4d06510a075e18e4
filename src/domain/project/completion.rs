//! Completion metric and missing fields, derived from the draft on demand.

use serde::Serialize;

use super::draft::ProjectDraft;
use super::schema::FieldPath;
use crate::domain::foundation::Percentage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    pub percentage: Percentage,
    /// Required fields that are absent, invalid, or under conflict.
    pub missing_fields: Vec<FieldPath>,
    /// Every field with an open conflict, required or not.
    pub conflicted_fields: Vec<FieldPath>,
}

impl CompletionReport {
    pub fn of(draft: &ProjectDraft) -> Self {
        let missing_fields: Vec<FieldPath> = FieldPath::required()
            .filter(|path| !counts_as_complete(draft, *path))
            .collect();
        let total = FieldPath::required_count();
        let conflicted_fields = draft.conflicts().map(|conflict| conflict.field).collect();

        Self {
            percentage: Percentage::from_ratio(total - missing_fields.len(), total),
            missing_fields,
            conflicted_fields,
        }
    }

    /// All required fields present and valid, and nothing left to resolve.
    pub fn is_ready_to_finalize(&self) -> bool {
        self.percentage.is_complete() && self.conflicted_fields.is_empty()
    }
}

fn counts_as_complete(draft: &ProjectDraft, path: FieldPath) -> bool {
    match draft.value(path) {
        Some(value) => path.validate(value).is_ok() && draft.conflict(path).is_none(),
        None => false,
    }
}
