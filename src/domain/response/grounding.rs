//! Grounding check for model-written replies.
//!
//! A reply may only mention numbers and proper names that appear in the
//! draft, a user message or a tool result. Names are capitalized words that
//! do not open a sentence; each must occur, case-insensitively, among the
//! words of the evidence.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::domain::project::{parse_amount, FieldPath, FieldValue, ProjectDraft};

static NUMBER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:\d[\d.,]*\d|\d)(?:\s*(?:millones|mill[oó]n|million))?").ok());

/// Capitalized words that never name a project value.
const COMMON_CAPITALIZED: &[&str] = &[
    "i", "pdf", "docx", "xlsx", "xls", "ok", "nit", "id", "cop", "usd", "january", "february", "march", "april",
    "may", "june", "july", "august", "september", "october", "november", "december", "enero", "febrero", "marzo",
    "abril", "mayo", "junio", "julio", "agosto", "septiembre", "octubre", "noviembre", "diciembre",
];

/// Numbers and words the assistant is allowed to mention in a reply.
#[derive(Debug, Clone, Default)]
pub struct GroundingEvidence {
    numbers: Vec<f64>,
    words: HashSet<String>,
}

impl GroundingEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every value in the draft, including both sides of open conflicts,
    /// plus the schema's field labels.
    pub fn from_draft(draft: &ProjectDraft) -> Self {
        let mut evidence = Self::new();
        for path in FieldPath::ALL {
            evidence.add_words(path.label());
        }
        for (_, field) in draft.fields() {
            evidence.add_value(&field.value);
        }
        for conflict in draft.conflicts() {
            evidence.add_value(&conflict.current.value);
            evidence.add_value(&conflict.proposed.value);
        }
        evidence
    }

    pub fn add_value(&mut self, value: &FieldValue) {
        match value.as_f64() {
            Some(n) => self.numbers.push(n),
            None => self.add_text(&value.to_string()),
        }
    }

    /// Numbers and words appearing in free text: user messages, tool results.
    pub fn add_text(&mut self, text: &str) {
        self.numbers.extend(numbers_in(text));
        self.add_words(text);
    }

    fn add_words(&mut self, text: &str) {
        self.words.extend(words_in(text).map(|(word, _)| word.to_lowercase()));
    }

    pub fn add_number(&mut self, n: f64) {
        self.numbers.push(n);
    }

    pub fn with_number(mut self, n: f64) -> Self {
        self.add_number(n);
        self
    }

    fn supports(&self, n: f64) -> bool {
        self.numbers
            .iter()
            .any(|known| (known - n).abs() <= 1e-6 * n.abs().max(1.0))
    }

    /// The numbers in `reply` that nothing supports.
    pub fn unsupported_numbers(&self, reply: &str) -> Vec<f64> {
        numbers_in(reply).into_iter().filter(|n| !self.supports(*n)).collect()
    }

    /// Proper names in `reply` that nothing supports, in order of appearance.
    pub fn unsupported_names(&self, reply: &str) -> Vec<String> {
        let mut unsupported: Vec<String> = Vec::new();
        for (word, sentence_start) in words_in(reply) {
            if sentence_start || !word.chars().next().is_some_and(char::is_uppercase) {
                continue;
            }
            let lower = word.to_lowercase();
            if COMMON_CAPITALIZED.contains(&lower.as_str()) || self.words.contains(&lower) {
                continue;
            }
            if !unsupported.contains(&word.to_string()) {
                unsupported.push(word.to_string());
            }
        }
        unsupported
    }

    pub fn is_grounded(&self, reply: &str) -> bool {
        self.unsupported_numbers(reply).is_empty() && self.unsupported_names(reply).is_empty()
    }
}

/// Alphanumeric words of `text`, each flagged when it opens a sentence or a
/// line.
fn words_in(text: &str) -> impl Iterator<Item = (&str, bool)> {
    let mut sentence_start = true;
    let mut start: Option<usize> = None;
    let mut words = Vec::new();
    for (i, c) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
        if c.is_alphanumeric() {
            start.get_or_insert(i);
            continue;
        }
        if let Some(from) = start.take() {
            words.push((&text[from..i], sentence_start));
            sentence_start = false;
        }
        if matches!(c, '.' | '!' | '?' | '\n' | '¿' | '¡') {
            sentence_start = true;
        }
    }
    words.into_iter()
}

fn numbers_in(text: &str) -> Vec<f64> {
    let Some(regex) = NUMBER.as_ref() else {
        return Vec::new();
    };
    regex
        .find_iter(text)
        .filter_map(|m| parse_amount(m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_quoting_known_price_is_grounded() {
        let mut evidence = GroundingEvidence::new();
        evidence.add_value(&FieldValue::Decimal(200_000_000.0));
        assert!(evidence.is_grounded("Prices start at $200.000.000."));
        assert!(evidence.is_grounded("Prices start at 200 millones."));
    }

    #[test]
    fn invented_number_is_flagged() {
        let evidence = GroundingEvidence::new().with_number(200_000_000.0);
        assert_eq!(evidence.unsupported_numbers("Units from 45 m2 at 200,000,000"), vec![45.0]);
    }

    #[test]
    fn numbers_from_user_text_count() {
        let mut evidence = GroundingEvidence::new();
        evidence.add_text("there are 120 apartments");
        assert!(evidence.is_grounded("So 120 units in total."));
    }

    #[test]
    fn prose_without_numbers_is_grounded() {
        assert!(GroundingEvidence::new().is_grounded("What city is the project in?"));
    }

    #[test]
    fn invented_city_and_builder_are_flagged() {
        let evidence = GroundingEvidence::from_draft(&ProjectDraft::new());
        let reply = "Your project is in Medellín, built by Constructora Andina.";
        assert!(!evidence.is_grounded(reply));
        assert_eq!(evidence.unsupported_names(reply), vec!["Medellín", "Constructora", "Andina"]);
    }

    #[test]
    fn names_from_user_and_tool_text_count() {
        let mut evidence = GroundingEvidence::new();
        evidence.add_text("the project is in medellín");
        evidence.add_text(r#"{"name":"Constructora Andina","tax_id":"900123456"}"#);
        assert!(evidence.is_grounded("Your project is in Medellín, built by Constructora Andina."));
    }

    #[test]
    fn sentence_openers_and_common_words_are_not_names() {
        let evidence = GroundingEvidence::new();
        assert!(evidence.is_grounded("Thanks! Could you send the PDF? I can also read DOCX files."));
        assert!(evidence.is_grounded("Great.\nWhich neighborhood is it in?"));
    }

    #[test]
    fn field_labels_are_known_words() {
        let evidence = GroundingEvidence::from_draft(&ProjectDraft::new());
        let label = FieldPath::City.label();
        let mut capitalized = label[..1].to_uppercase();
        capitalized.push_str(&label[1..]);
        assert!(evidence.is_grounded(&format!("I still need the {}.", capitalized)));
    }
}
