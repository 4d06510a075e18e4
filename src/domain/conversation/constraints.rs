//! Ledger of explicit constraints and commitments the user stated.
//!
//! These survive summarization verbatim, so "only apartments" said in the
//! first minute still binds the hundredth turn.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CONSTRAINT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(?:solo|solamente|únicamente|unicamente|only|just)\b[^.!?\n]{2,120}",
        r"(?i)\b(?:nit|tax id)\b[^.!?\n]{0,40}\d[\d.\-]{5,}",
        r"(?i)\b(?:must|debe|deben|never|nunca|do not|don't|no incluir|sin)\b[^.!?\n]{2,120}",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConstraint {
    pub text: String,
    /// Sequence number of the message that stated it.
    pub stated_in: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintLedger {
    entries: Vec<UserConstraint>,
}

impl ConstraintLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans a user message and records any new constraints.
    /// Returns how many were added.
    pub fn observe(&mut self, seq: u64, message: &str) -> usize {
        let mut added = 0;
        for text in detect_constraints(message) {
            let key = normalize(&text);
            if self.entries.iter().any(|entry| normalize(&entry.text) == key) {
                continue;
            }
            self.entries.push(UserConstraint { text, stated_in: seq });
            added += 1;
        }
        added
    }

    pub fn entries(&self) -> &[UserConstraint] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Extracts constraint phrases from free text, in order of appearance.
pub fn detect_constraints(message: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = CONSTRAINT_PATTERNS
        .iter()
        .flat_map(|re| re.find_iter(message))
        .map(|m| (m.start(), m.as_str().trim().to_string()))
        .collect();
    found.sort_by_key(|(start, _)| *start);
    found.dedup_by(|a, b| a.1 == b.1);
    found.into_iter().map(|(_, text)| text).collect()
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
