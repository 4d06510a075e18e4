//! Model-assisted extraction: prompt construction and scoring of the
//! model's JSON answer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use super::confidence::ConfidencePolicy;
use super::flat_text::FlatText;
use super::patterns::excerpt;
use crate::domain::project::{
    parse_amount, ExtractedFieldSet, FieldCandidate, FieldKind, FieldPath, FieldValue, Origin,
};

static NUMBER_TOKEN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\d[\d.,]*(?:\s*(?:millones|mill[oó]n|million))?").ok());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelOutputError {
    #[error("model output is not JSON: {0}")]
    NotJson(String),

    #[error("model output is not a JSON object")]
    NotAnObject,
}

/// Instructions sent with the `extraction` request.
pub fn extraction_instructions() -> String {
    let mut out = String::from(
        "You extract real-estate project data from documents. Answer with a single JSON object \
         whose keys are field paths from the list below and whose values are the field values \
         found in the text. Omit fields the text does not mention. Never guess.\n\nFields:\n",
    );
    for path in FieldPath::ALL {
        let kind = match path.kind() {
            FieldKind::Text => "text".to_string(),
            FieldKind::Integer => "integer".to_string(),
            FieldKind::Decimal => "number".to_string(),
            FieldKind::Boolean => "true/false".to_string(),
            FieldKind::YearMonth => "YYYY-MM".to_string(),
            FieldKind::TextList => "list of text".to_string(),
            FieldKind::Choice(options) => format!("one of {}", options.join(", ")),
        };
        out.push_str(&format!("- {} ({}): {}\n", path.as_str(), kind, path.label()));
    }
    out
}

/// The document body as sent to the model, cut to `max_chars`.
pub fn extraction_input(text: &FlatText, max_chars: usize) -> String {
    format!("Document text:\n\n{}", text.truncated(max_chars))
}

/// Turns the model's answer into scored candidates.
#[derive(Debug, Clone, Default)]
pub struct ModelFieldReader {
    policy: ConfidencePolicy,
}

impl ModelFieldReader {
    pub fn new(policy: ConfidencePolicy) -> Self {
        Self { policy }
    }

    /// Parses the answer and scores each value against the source text.
    ///
    /// Unknown paths and values that do not coerce to the field's kind are
    /// dropped. For conversation input only values the user actually wrote
    /// are kept.
    pub fn read(
        &self,
        answer: &str,
        source: &FlatText,
        pattern_hits: &ExtractedFieldSet,
        origin: Origin,
    ) -> Result<ExtractedFieldSet, ModelOutputError> {
        let object = parse_object(answer)?;
        let numbers = numbers_in(source);
        let mut set = ExtractedFieldSet::new();

        for (key, raw) in object {
            if raw.is_null() {
                continue;
            }
            let Ok(path) = key.parse::<FieldPath>() else {
                tracing::debug!(field = %key, "model returned unknown field");
                continue;
            };
            let value = match FieldValue::coerce(path, &raw) {
                Ok(value) => value,
                Err(err) => {
                    tracing::debug!(field = %path, error = %err, "model value rejected");
                    continue;
                }
            };

            let agrees_with_pattern = pattern_hits
                .get(path)
                .map_or(false, |hit| hit.value.same_as(&value));
            let evidence = evidence_line(&value, source, &numbers);

            let candidate = match (origin, agrees_with_pattern, evidence) {
                (Origin::Conversation, _, Some(line)) => {
                    FieldCandidate::new(value, self.policy.user(), origin).with_excerpt(excerpt(line))
                }
                (Origin::Conversation, _, None) => continue,
                (_, true, line) => with_line(FieldCandidate::new(value, self.policy.pattern(), origin), line),
                (_, false, Some(line)) => {
                    FieldCandidate::new(value, self.policy.grounded(), origin).with_excerpt(excerpt(line))
                }
                (_, false, None) => FieldCandidate::new(value, self.policy.inferred(), origin),
            };
            set.insert(path, candidate);
        }
        Ok(set)
    }
}

fn with_line(candidate: FieldCandidate, line: Option<&str>) -> FieldCandidate {
    match line {
        Some(line) => candidate.with_excerpt(excerpt(line)),
        None => candidate,
    }
}

/// Accepts a bare object, a fenced code block, or `{"fields": {...}}`.
fn parse_object(answer: &str) -> Result<Map<String, Value>, ModelOutputError> {
    let trimmed = answer.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed);
    let start = body.find('{').ok_or(ModelOutputError::NotAnObject)?;
    let end = body.rfind('}').ok_or(ModelOutputError::NotAnObject)?;
    if end < start {
        return Err(ModelOutputError::NotAnObject);
    }
    let value: Value =
        serde_json::from_str(&body[start..=end]).map_err(|e| ModelOutputError::NotJson(e.to_string()))?;
    match value {
        Value::Object(mut map) => match map.remove("fields") {
            Some(Value::Object(fields)) => Ok(fields),
            Some(other) => {
                map.insert("fields".to_string(), other);
                Ok(map)
            }
            None => Ok(map),
        },
        _ => Err(ModelOutputError::NotAnObject),
    }
}

fn numbers_in(source: &FlatText) -> Vec<(f64, usize)> {
    let Some(regex) = NUMBER_TOKEN.as_ref() else {
        return Vec::new();
    };
    source
        .lines()
        .iter()
        .enumerate()
        .flat_map(|(index, line)| {
            regex
                .find_iter(line)
                .filter_map(move |m| parse_amount(m.as_str()).map(|n| (n, index)))
        })
        .collect()
}

/// The source line that supports `value`, if any.
fn evidence_line<'a>(value: &FieldValue, source: &'a FlatText, numbers: &[(f64, usize)]) -> Option<&'a str> {
    match value {
        FieldValue::Integer(_) | FieldValue::Decimal(_) => {
            let target = value.as_f64()?;
            numbers
                .iter()
                .find(|(n, _)| (n - target).abs() < 1e-6 * target.abs().max(1.0))
                .and_then(|(_, index)| source.lines().get(*index))
                .map(String::as_str)
        }
        FieldValue::Text(text) => source.line_containing(text),
        FieldValue::List(items) => items.iter().find_map(|item| source.line_containing(item)),
        FieldValue::Bool(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Confidence;

    fn source() -> FlatText {
        FlatText::from_text("Torres del Parque\nPrecio desde $150.000.000\nUbicado en Medellín, barrio Laureles")
    }

    fn read(answer: &str) -> ExtractedFieldSet {
        ModelFieldReader::default()
            .read(answer, &source(), &ExtractedFieldSet::new(), Origin::Document)
            .unwrap()
    }

    mod parsing {
        use super::*;

        #[test]
        fn accepts_fenced_json() {
            let set = read("```json\n{\"name\": \"Torres del Parque\"}\n```");
            assert!(set.get(FieldPath::Name).is_some());
        }

        #[test]
        fn accepts_fields_wrapper() {
            let set = read(r#"{"fields": {"location.city": "Medellín"}}"#);
            assert!(set.get(FieldPath::City).is_some());
        }

        #[test]
        fn drops_unknown_paths_and_bad_values() {
            let set = read(r#"{"favourite_colour": "blue", "unit_info.bedrooms": "many", "name": null}"#);
            assert!(set.is_empty());
        }

        #[test]
        fn prose_is_an_error() {
            let err = ModelFieldReader::default()
                .read("I could not find anything.", &source(), &ExtractedFieldSet::new(), Origin::Document)
                .unwrap_err();
            assert_eq!(err, ModelOutputError::NotAnObject);
        }
    }

    mod scoring {
        use super::*;

        #[test]
        fn verbatim_text_is_grounded() {
            let set = read(r#"{"location.city": "Medellín"}"#);
            let city = set.get(FieldPath::City).unwrap();
            assert_eq!(city.confidence, Confidence::new(0.7));
            assert_eq!(city.excerpt.as_deref(), Some("Ubicado en Medellín, barrio Laureles"));
        }

        #[test]
        fn numbers_are_grounded_by_value() {
            let set = read(r#"{"price_info.price_min": 150000000}"#);
            assert_eq!(set.get(FieldPath::PriceMin).unwrap().confidence, Confidence::new(0.7));
        }

        #[test]
        fn unsupported_values_are_inferred() {
            let set = read(r#"{"location.country": "Colombia"}"#);
            let country = set.get(FieldPath::Country).unwrap();
            assert_eq!(country.confidence, Confidence::new(0.5));
            assert!(country.excerpt.is_none());
        }

        #[test]
        fn agreement_with_pattern_scores_as_pattern() {
            let hits = ExtractedFieldSet::new().with(
                FieldPath::PriceMin,
                FieldCandidate::new(FieldValue::Decimal(150_000_000.0), Confidence::new(0.9), Origin::Document),
            );
            let set = ModelFieldReader::default()
                .read(r#"{"price_info.price_min": "150 millones"}"#, &source(), &hits, Origin::Document)
                .unwrap();
            assert_eq!(set.get(FieldPath::PriceMin).unwrap().confidence, Confidence::new(0.9));
        }

        #[test]
        fn conversation_keeps_only_stated_values() {
            let said = FlatText::from_text("we are in Cali");
            let set = ModelFieldReader::default()
                .read(
                    r#"{"location.city": "Cali", "location.country": "Colombia"}"#,
                    &said,
                    &ExtractedFieldSet::new(),
                    Origin::Conversation,
                )
                .unwrap();
            assert_eq!(set.len(), 1);
            assert_eq!(set.get(FieldPath::City).unwrap().confidence, Confidence::CERTAIN);
        }
    }

    #[test]
    fn instructions_list_every_field() {
        let text = extraction_instructions();
        for path in FieldPath::ALL {
            assert!(text.contains(path.as_str()));
        }
    }
}
