//! Completion figures returned by every handler, and the bridge from a
//! merge outcome to the facts a reply is planned from.

use serde::Serialize;

use crate::domain::project::{CompletionReport, FieldPath, MergeOutcome};
use crate::domain::response::TurnFacts;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionView {
    pub completion_percentage: u8,
    pub missing_fields: Vec<FieldPath>,
    pub conflicted_fields: Vec<FieldPath>,
}

impl From<&CompletionReport> for CompletionView {
    fn from(report: &CompletionReport) -> Self {
        Self {
            completion_percentage: report.percentage.value(),
            missing_fields: report.missing_fields.clone(),
            conflicted_fields: report.conflicted_fields.clone(),
        }
    }
}

/// Accepted paths and plain-language rejections from one merge.
pub fn merge_facts(outcome: &MergeOutcome) -> TurnFacts {
    TurnFacts {
        newly_accepted: outcome.accepted.clone(),
        errors: outcome
            .rejected
            .iter()
            .map(|(path, err)| format!("I couldn't use the {} you gave: {}.", path.label(), err))
            .collect(),
        ..TurnFacts::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ValidationError;
    use crate::domain::project::ProjectDraft;

    #[test]
    fn view_mirrors_the_report() {
        let report = CompletionReport::of(&ProjectDraft::new());
        let view = CompletionView::from(&report);

        assert_eq!(view.completion_percentage, 0);
        assert_eq!(view.missing_fields.len(), FieldPath::required_count());
        assert!(view.conflicted_fields.is_empty());
    }

    #[test]
    fn rejections_become_error_lines() {
        let outcome = MergeOutcome {
            accepted: vec![FieldPath::Name],
            rejected: vec![(
                FieldPath::PriceMax,
                ValidationError::invalid_format("price_info.price_max", "must not be below price_min"),
            )],
            ..MergeOutcome::default()
        };

        let facts = merge_facts(&outcome);

        assert_eq!(facts.newly_accepted, vec![FieldPath::Name]);
        assert_eq!(facts.errors.len(), 1);
        assert!(facts.errors[0].contains(FieldPath::PriceMax.label()));
    }
}
