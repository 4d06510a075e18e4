//! Reconciles candidate values into the project draft.
//!
//! Rules, per field:
//!
//! - absent in the draft: accept.
//! - user statement (`Origin::Conversation`): accept, and close any open
//!   conflict on that field.
//! - same value from another source: upgrade provenance only when the
//!   candidate's confidence is strictly higher.
//! - materially different value from another source: keep the stored value
//!   and record a [`FieldConflict`].
//! - slightly different value: accept only on strictly higher confidence,
//!   and never over a user statement.
//!
//! Only a user statement or [`FieldMerger::resolve_conflict`] closes a
//! conflict. Any other replacement keeps the challenger open against the
//! new stored value.
//!
//! A candidate that fails schema validation is rejected whole; nothing about
//! that field changes. Merging is a pure function of its inputs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::draft::{AcceptedField, FieldConflict, ProjectDraft};
use super::extracted::{ExtractedFieldSet, FieldCandidate, Origin};
use super::schema::FieldPath;
use crate::domain::foundation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Relative numeric difference above which two values conflict.
    pub materiality_threshold: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            materiality_threshold: 0.20,
        }
    }
}

/// How the user settled a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    KeepCurrent,
    AcceptProposed,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MergeError {
    #[error("no open conflict on field '{0}'")]
    NoConflict(FieldPath),

    #[error("proposed value is no longer valid: {0}")]
    Invalid(#[from] ValidationError),
}

/// What a merge did, field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub accepted: Vec<FieldPath>,
    /// Same value, better provenance.
    pub upgraded: Vec<FieldPath>,
    pub unchanged: Vec<FieldPath>,
    pub conflicts: Vec<FieldPath>,
    pub rejected: Vec<(FieldPath, ValidationError)>,
}

impl MergeOutcome {
    /// True when the draft differs from what was passed in.
    pub fn changed_draft(&self) -> bool {
        !self.accepted.is_empty() || !self.upgraded.is_empty() || !self.conflicts.is_empty()
    }
}

enum Decision {
    Accept,
    Upgrade,
    Unchanged,
    Conflict,
}

#[derive(Debug, Clone, Default)]
pub struct FieldMerger {
    config: MergeConfig,
}

impl FieldMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merges `new_fields` into a copy of `draft`.
    pub fn merge(&self, draft: &ProjectDraft, new_fields: &ExtractedFieldSet) -> (ProjectDraft, MergeOutcome) {
        let mut next = draft.clone();
        let mut outcome = MergeOutcome::default();

        for (path, candidate) in new_fields.iter() {
            if let Err(err) = self.check(&next, path, candidate) {
                outcome.rejected.push((path, err));
                continue;
            }
            match self.decide(&next, path, candidate) {
                Decision::Accept => {
                    let accepted = AcceptedField::from(candidate);
                    if candidate.origin == Origin::Conversation {
                        next.clear_conflict(path);
                    } else {
                        next.refresh_conflict(path, &accepted);
                    }
                    next.put(path, accepted);
                    outcome.accepted.push(path);
                }
                Decision::Upgrade => {
                    let upgraded = AcceptedField::from(candidate);
                    next.refresh_conflict(path, &upgraded);
                    next.put(path, upgraded);
                    outcome.upgraded.push(path);
                }
                Decision::Conflict => {
                    if let Some(current) = next.get(path).cloned() {
                        next.put_conflict(FieldConflict {
                            field: path,
                            current,
                            proposed: AcceptedField::from(candidate),
                        });
                    }
                    outcome.conflicts.push(path);
                }
                Decision::Unchanged => outcome.unchanged.push(path),
            }
        }

        (next, outcome)
    }

    /// Settles an open conflict.
    pub fn resolve_conflict(
        &self,
        draft: &ProjectDraft,
        path: FieldPath,
        resolution: ConflictResolution,
    ) -> Result<ProjectDraft, MergeError> {
        let conflict = draft.conflict(path).ok_or(MergeError::NoConflict(path))?;
        let mut next = draft.clone();
        if resolution == ConflictResolution::AcceptProposed {
            let proposed = conflict.proposed.clone();
            path.validate(&proposed.value)?;
            path.validate_against(&proposed.value, |other| next.value(other).cloned())?;
            next.put(path, proposed);
        }
        next.clear_conflict(path);
        Ok(next)
    }

    fn check(&self, draft: &ProjectDraft, path: FieldPath, candidate: &FieldCandidate) -> Result<(), ValidationError> {
        path.validate(&candidate.value)?;
        path.validate_against(&candidate.value, |other| draft.value(other).cloned())
    }

    fn decide(&self, draft: &ProjectDraft, path: FieldPath, candidate: &FieldCandidate) -> Decision {
        let Some(current) = draft.get(path) else {
            return Decision::Accept;
        };
        let same = current.value.same_as(&candidate.value);

        if candidate.origin == Origin::Conversation {
            let settled = current.origin == Origin::Conversation
                && same
                && !candidate.confidence.exceeds(&current.confidence)
                && draft.conflict(path).is_none();
            return if settled { Decision::Unchanged } else { Decision::Accept };
        }

        if same {
            let better = candidate.confidence.exceeds(&current.confidence) && current.origin != Origin::Conversation;
            return if better { Decision::Upgrade } else { Decision::Unchanged };
        }

        if current.value.differs_materially(&candidate.value, self.config.materiality_threshold) {
            let already_recorded = draft
                .conflict(path)
                .is_some_and(|open| open.proposed.value.same_as(&candidate.value));
            return if already_recorded { Decision::Unchanged } else { Decision::Conflict };
        }

        if current.origin != Origin::Conversation && candidate.confidence.exceeds(&current.confidence) {
            Decision::Accept
        } else {
            Decision::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Confidence;
    use crate::domain::project::FieldValue;
    use proptest::prelude::*;

    fn candidate(value: FieldValue, confidence: f32, origin: Origin) -> FieldCandidate {
        FieldCandidate::new(value, Confidence::new(confidence), origin)
    }

    fn price(n: f64, confidence: f32, origin: Origin) -> FieldCandidate {
        candidate(FieldValue::Decimal(n), confidence, origin)
    }

    fn set(path: FieldPath, c: FieldCandidate) -> ExtractedFieldSet {
        ExtractedFieldSet::new().with(path, c)
    }

    fn merger() -> FieldMerger {
        FieldMerger::default()
    }

    mod acceptance {
        use super::*;

        #[test]
        fn absent_field_is_accepted() {
            let (draft, outcome) = merger().merge(
                &ProjectDraft::new(),
                &set(FieldPath::City, candidate(FieldValue::Text("Bogotá".into()), 0.3, Origin::Document)),
            );
            assert_eq!(outcome.accepted, vec![FieldPath::City]);
            assert_eq!(draft.value(FieldPath::City), Some(&FieldValue::Text("Bogotá".into())));
        }

        #[test]
        fn user_statement_beats_document_value() {
            let (draft, _) = merger().merge(
                &ProjectDraft::new(),
                &set(FieldPath::PriceMin, price(150_000_000.0, 0.5, Origin::Document)),
            );
            let (draft, outcome) = merger().merge(
                &draft,
                &set(FieldPath::PriceMin, price(200_000_000.0, 1.0, Origin::Conversation)),
            );
            assert_eq!(outcome.accepted, vec![FieldPath::PriceMin]);
            assert!(outcome.conflicts.is_empty());
            assert_eq!(draft.value(FieldPath::PriceMin), Some(&FieldValue::Decimal(200_000_000.0)));
        }

        #[test]
        fn user_statement_wins_even_at_lower_confidence() {
            let (draft, _) = merger().merge(
                &ProjectDraft::new(),
                &set(FieldPath::Name, candidate(FieldValue::Text("Torre A".into()), 0.95, Origin::Document)),
            );
            let (draft, _) = merger().merge(
                &draft,
                &set(FieldPath::Name, candidate(FieldValue::Text("Torre B".into()), 0.8, Origin::Conversation)),
            );
            assert_eq!(draft.value(FieldPath::Name), Some(&FieldValue::Text("Torre B".into())));
        }

        #[test]
        fn small_difference_with_higher_confidence_replaces() {
            let (draft, _) = merger().merge(
                &ProjectDraft::new(),
                &set(FieldPath::PriceMin, price(100.0, 0.5, Origin::Document)),
            );
            let (draft, outcome) = merger().merge(
                &draft,
                &set(FieldPath::PriceMin, price(110.0, 0.9, Origin::Document)),
            );
            assert_eq!(outcome.accepted, vec![FieldPath::PriceMin]);
            assert_eq!(draft.value(FieldPath::PriceMin), Some(&FieldValue::Decimal(110.0)));
        }

        #[test]
        fn small_difference_with_lower_confidence_is_ignored() {
            let (draft, _) = merger().merge(
                &ProjectDraft::new(),
                &set(FieldPath::PriceMin, price(100.0, 0.9, Origin::Document)),
            );
            let (draft, outcome) = merger().merge(
                &draft,
                &set(FieldPath::PriceMin, price(110.0, 0.5, Origin::Document)),
            );
            assert_eq!(outcome.unchanged, vec![FieldPath::PriceMin]);
            assert_eq!(draft.value(FieldPath::PriceMin), Some(&FieldValue::Decimal(100.0)));
        }

        #[test]
        fn document_never_overrides_user_statement() {
            let (draft, _) = merger().merge(
                &ProjectDraft::new(),
                &set(FieldPath::PriceMin, price(100.0, 0.6, Origin::Conversation)),
            );
            let (draft, _) = merger().merge(
                &draft,
                &set(FieldPath::PriceMin, price(105.0, 0.99, Origin::Document)),
            );
            assert_eq!(draft.value(FieldPath::PriceMin), Some(&FieldValue::Decimal(100.0)));
        }

        #[test]
        fn same_value_with_higher_confidence_upgrades_provenance() {
            let (draft, _) = merger().merge(
                &ProjectDraft::new(),
                &set(FieldPath::City, candidate(FieldValue::Text("Cali".into()), 0.5, Origin::Document)),
            );
            let (draft, outcome) = merger().merge(
                &draft,
                &set(FieldPath::City, candidate(FieldValue::Text("cali".into()), 0.9, Origin::Tool)),
            );
            assert_eq!(outcome.upgraded, vec![FieldPath::City]);
            assert_eq!(draft.get(FieldPath::City).unwrap().origin, Origin::Tool);
        }
    }

    mod conflicts {
        use super::*;

        fn conflicted() -> ProjectDraft {
            let (draft, _) = merger().merge(
                &ProjectDraft::new(),
                &set(FieldPath::PriceMax, price(300_000_000.0, 0.7, Origin::Document)),
            );
            let (draft, outcome) = merger().merge(
                &draft,
                &set(FieldPath::PriceMax, price(450_000_000.0, 0.9, Origin::Document)),
            );
            assert_eq!(outcome.conflicts, vec![FieldPath::PriceMax]);
            draft
        }

        #[test]
        fn material_disagreement_records_conflict_and_keeps_current() {
            let draft = conflicted();
            assert!(draft.has_conflicts());
            assert_eq!(draft.value(FieldPath::PriceMax), Some(&FieldValue::Decimal(300_000_000.0)));
            let conflict = draft.conflict(FieldPath::PriceMax).unwrap();
            assert_eq!(conflict.proposed.value, FieldValue::Decimal(450_000_000.0));
        }

        #[test]
        fn re_recording_same_challenger_is_noop() {
            let draft = conflicted();
            let (again, outcome) = merger().merge(
                &draft,
                &set(FieldPath::PriceMax, price(450_000_000.0, 0.9, Origin::Document)),
            );
            assert_eq!(again, draft);
            assert_eq!(outcome.unchanged, vec![FieldPath::PriceMax]);
        }

        #[test]
        fn user_statement_closes_conflict() {
            let (draft, outcome) = merger().merge(
                &conflicted(),
                &set(FieldPath::PriceMax, price(420_000_000.0, 1.0, Origin::Conversation)),
            );
            assert_eq!(outcome.accepted, vec![FieldPath::PriceMax]);
            assert!(!draft.has_conflicts());
        }

        #[test]
        fn closer_document_value_keeps_challenger_open() {
            let (draft, _) = merger().merge(
                &ProjectDraft::new(),
                &set(FieldPath::PriceMax, price(300.0, 0.5, Origin::Document)),
            );
            let (draft, outcome) = merger().merge(&draft, &set(FieldPath::PriceMax, price(450.0, 0.6, Origin::Document)));
            assert_eq!(outcome.conflicts, vec![FieldPath::PriceMax]);

            let (draft, outcome) = merger().merge(&draft, &set(FieldPath::PriceMax, price(310.0, 0.8, Origin::Document)));
            assert_eq!(outcome.accepted, vec![FieldPath::PriceMax]);
            assert_eq!(draft.value(FieldPath::PriceMax), Some(&FieldValue::Decimal(310.0)));
            let open = draft.conflict(FieldPath::PriceMax).expect("challenger survives");
            assert_eq!(open.proposed.value, FieldValue::Decimal(450.0));
            assert_eq!(open.current.value, FieldValue::Decimal(310.0));
        }

        #[test]
        fn provenance_upgrade_keeps_challenger_open() {
            let (draft, outcome) = merger().merge(
                &conflicted(),
                &set(FieldPath::PriceMax, price(300_000_000.0, 0.95, Origin::Tool)),
            );
            assert_eq!(outcome.upgraded, vec![FieldPath::PriceMax]);
            let open = draft.conflict(FieldPath::PriceMax).unwrap();
            assert_eq!(open.current.origin, Origin::Tool);
            assert_eq!(open.proposed.value, FieldValue::Decimal(450_000_000.0));
        }

        #[test]
        fn resolve_accept_proposed_swaps_value() {
            let draft = merger()
                .resolve_conflict(&conflicted(), FieldPath::PriceMax, ConflictResolution::AcceptProposed)
                .unwrap();
            assert_eq!(draft.value(FieldPath::PriceMax), Some(&FieldValue::Decimal(450_000_000.0)));
            assert!(!draft.has_conflicts());
        }

        #[test]
        fn resolve_keep_current_drops_challenger() {
            let draft = merger()
                .resolve_conflict(&conflicted(), FieldPath::PriceMax, ConflictResolution::KeepCurrent)
                .unwrap();
            assert_eq!(draft.value(FieldPath::PriceMax), Some(&FieldValue::Decimal(300_000_000.0)));
            assert!(!draft.has_conflicts());
        }

        #[test]
        fn resolve_without_conflict_fails() {
            let result = merger().resolve_conflict(&ProjectDraft::new(), FieldPath::Name, ConflictResolution::KeepCurrent);
            assert_eq!(result, Err(MergeError::NoConflict(FieldPath::Name)));
        }
    }

    mod rejection {
        use super::*;

        #[test]
        fn invalid_value_is_rejected_whole() {
            let (draft, outcome) = merger().merge(
                &ProjectDraft::new(),
                &set(FieldPath::Latitude, candidate(FieldValue::Decimal(123.0), 0.9, Origin::Document)),
            );
            assert_eq!(outcome.rejected.len(), 1);
            assert!(!draft.contains(FieldPath::Latitude));
        }

        #[test]
        fn price_max_below_existing_min_is_rejected() {
            let (draft, _) = merger().merge(
                &ProjectDraft::new(),
                &set(FieldPath::PriceMin, price(200.0, 0.9, Origin::Document)),
            );
            let (draft, outcome) = merger().merge(
                &draft,
                &set(FieldPath::PriceMax, price(100.0, 0.9, Origin::Document)),
            );
            assert_eq!(outcome.rejected[0].0, FieldPath::PriceMax);
            assert!(!draft.contains(FieldPath::PriceMax));
        }
    }

    fn arb_origin() -> impl Strategy<Value = Origin> {
        prop_oneof![Just(Origin::Document), Just(Origin::Conversation), Just(Origin::Tool)]
    }

    const CITIES: [&str; 3] = ["Bogotá", "Medellín", "Cali"];

    fn arb_set() -> impl Strategy<Value = ExtractedFieldSet> {
        let entry = (
            prop_oneof![
                Just(FieldPath::PriceMin),
                Just(FieldPath::PriceMax),
                Just(FieldPath::AreaMin),
                Just(FieldPath::TotalUnits),
                Just(FieldPath::City),
            ],
            1u32..1_000,
            0.0f32..=1.0,
            arb_origin(),
        );
        prop::collection::vec(entry, 0..6).prop_map(|entries| {
            let mut set = ExtractedFieldSet::new();
            for (path, n, confidence, origin) in entries {
                let value = match path {
                    FieldPath::TotalUnits => FieldValue::Integer(n as i64),
                    FieldPath::City => FieldValue::Text(CITIES[n as usize % CITIES.len()].to_string()),
                    _ => FieldValue::Decimal(n as f64),
                };
                set.insert(path, candidate(value, confidence, origin));
            }
            set
        })
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(base in arb_set(), incoming in arb_set()) {
            let merger = merger();
            let (draft, _) = merger.merge(&ProjectDraft::new(), &base);
            let (once, _) = merger.merge(&draft, &incoming);
            let (twice, second) = merger.merge(&once, &incoming);
            prop_assert_eq!(&once, &twice);
            prop_assert!(!second.changed_draft());
        }

        #[test]
        fn non_user_merges_never_lower_confidence(base in arb_set(), incoming in arb_set()) {
            let merger = merger();
            let (draft, _) = merger.merge(&ProjectDraft::new(), &base);
            let (next, _) = merger.merge(&draft, &incoming);
            for (path, before) in draft.fields() {
                let after = next.get(path).expect("accepted values are never removed");
                let user_stated = incoming.get(path).is_some_and(|c| c.origin == Origin::Conversation);
                if !user_stated {
                    prop_assert!(after.confidence.value() >= before.confidence.value());
                }
            }
        }

        #[test]
        fn open_conflicts_outlive_non_user_merges(
            base in arb_set(),
            challengers in arb_set(),
            incoming in arb_set(),
        ) {
            let merger = merger();
            let (draft, _) = merger.merge(&ProjectDraft::new(), &base);
            let (draft, _) = merger.merge(&draft, &challengers);
            let (next, _) = merger.merge(&draft, &incoming);
            for open in draft.conflicts() {
                let user_stated = incoming.get(open.field).is_some_and(|c| c.origin == Origin::Conversation);
                if !user_stated {
                    prop_assert!(next.conflict(open.field).is_some(), "conflict on {} dropped", open.field);
                }
            }
        }
    }
}
