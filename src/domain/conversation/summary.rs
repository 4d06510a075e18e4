//! Lossless fact sheet and the synthetic summary message built from it.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::constraints::ConstraintLedger;
use crate::domain::project::{CompletionReport, FieldPath, ProjectDraft};

/// Everything a summary must never lose: accepted values, missing fields,
/// and the user's stated constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSheet {
    pub accepted: Vec<(FieldPath, String)>,
    pub missing: Vec<FieldPath>,
    pub conflicts: Vec<FieldPath>,
    pub constraints: Vec<String>,
}

impl FactSheet {
    pub fn capture(draft: &ProjectDraft, constraints: &ConstraintLedger) -> Self {
        let report = CompletionReport::of(draft);
        Self {
            accepted: draft
                .fields()
                .map(|(path, field)| (path, field.value.to_string()))
                .collect(),
            missing: report.missing_fields,
            conflicts: report.conflicted_fields,
            constraints: constraints.entries().iter().map(|c| c.text.clone()).collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Accepted fields:\n");
        if self.accepted.is_empty() {
            out.push_str("- (none yet)\n");
        }
        for (path, value) in &self.accepted {
            let _ = writeln!(out, "- {}: {}", path, value);
        }
        let _ = writeln!(out, "Missing fields: {}", join_paths(&self.missing));
        if !self.conflicts.is_empty() {
            let _ = writeln!(out, "Unresolved conflicts: {}", join_paths(&self.conflicts));
        }
        if !self.constraints.is_empty() {
            out.push_str("User constraints:\n");
            for constraint in &self.constraints {
                let _ = writeln!(out, "- {}", constraint);
            }
        }
        out
    }
}

fn join_paths(paths: &[FieldPath]) -> String {
    if paths.is_empty() {
        return "none".to_string();
    }
    paths.iter().map(FieldPath::as_str).collect::<Vec<_>>().join(", ")
}

/// Synthetic message standing in for every message up to `covers_through`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    covers_through: u64,
    text: String,
}

impl ContextSummary {
    pub const HEADER: &'static str = "[Conversation summary]";

    /// The fact sheet is embedded verbatim; the narrative is optional colour.
    pub fn compose(covers_through: u64, facts: &FactSheet, narrative: Option<&str>) -> Self {
        let mut text = format!("{}\n{}", Self::HEADER, facts.render());
        if let Some(narrative) = narrative.map(str::trim).filter(|n| !n.is_empty()) {
            let _ = writeln!(text, "Earlier discussion: {}", narrative);
        }
        Self { covers_through, text }
    }

    pub fn covers_through(&self) -> u64 {
        self.covers_through
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
