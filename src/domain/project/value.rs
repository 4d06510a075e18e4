//! Typed field values and coercion from loosely-typed input.
//!
//! Values arrive as model JSON, regex captures, or user text. Coercion
//! normalizes them into the canonical form for the target field so that
//! equality and materiality checks compare like with like.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::schema::{FieldKind, FieldPath};
use crate::domain::foundation::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Coerces arbitrary JSON into a value for `path`, then validates it.
    pub fn coerce(path: FieldPath, raw: &Value) -> Result<FieldValue, ValidationError> {
        let field = path.as_str();
        let value = match path.kind() {
            FieldKind::Text => match raw {
                Value::String(s) => FieldValue::Text(collapse_whitespace(s)),
                Value::Number(n) => FieldValue::Text(n.to_string()),
                _ => return Err(mismatch(field, "text", raw)),
            },
            FieldKind::YearMonth => {
                let text = raw.as_str().ok_or_else(|| mismatch(field, "YYYY-MM", raw))?;
                FieldValue::Text(
                    parse_year_month(text)
                        .ok_or_else(|| ValidationError::invalid_format(field, "expected YYYY-MM"))?,
                )
            }
            FieldKind::Choice(_) => {
                let text = raw.as_str().ok_or_else(|| mismatch(field, "text", raw))?;
                FieldValue::Text(canonical_choice(path, text))
            }
            FieldKind::TextList => match raw {
                Value::Array(items) => FieldValue::List(
                    items
                        .iter()
                        .filter_map(|item| item.as_str().map(collapse_whitespace))
                        .filter(|item| !item.is_empty())
                        .collect(),
                ),
                Value::String(s) => FieldValue::List(split_list(s)),
                _ => return Err(mismatch(field, "list", raw)),
            },
            FieldKind::Boolean => match raw {
                Value::Bool(b) => FieldValue::Bool(*b),
                Value::String(s) => FieldValue::Bool(
                    parse_bool(s).ok_or_else(|| ValidationError::invalid_format(field, "expected yes/no"))?,
                ),
                _ => return Err(mismatch(field, "boolean", raw)),
            },
            FieldKind::Integer => {
                let n = number_from(raw).ok_or_else(|| mismatch(field, "integer", raw))?;
                if n.fract() != 0.0 {
                    return Err(ValidationError::invalid_format(field, "expected a whole number"));
                }
                FieldValue::Integer(n as i64)
            }
            FieldKind::Decimal => {
                FieldValue::Decimal(number_from(raw).ok_or_else(|| mismatch(field, "number", raw))?)
            }
        };
        path.validate(&value)?;
        Ok(value)
    }

    /// Coerces free text, as captured from a document or chat line.
    pub fn parse_text(path: FieldPath, text: &str) -> Result<FieldValue, ValidationError> {
        Self::coerce(path, &Value::String(text.to_string()))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(n) => Some(*n as f64),
            FieldValue::Decimal(n) => Some(*n),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "boolean",
            FieldValue::Integer(_) => "integer",
            FieldValue::Decimal(_) => "number",
            FieldValue::Text(_) => "text",
            FieldValue::List(_) => "list",
        }
    }

    /// Case, whitespace and list-order insensitive equality.
    pub fn same_as(&self, other: &FieldValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self.normalized() == other.normalized(),
        }
    }

    /// True when the two values disagree by more than `threshold`.
    ///
    /// Numbers compare by relative difference; everything else is material
    /// as soon as the normalized forms differ.
    pub fn differs_materially(&self, other: &FieldValue, threshold: f64) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => {
                let scale = a.abs().max(b.abs());
                if scale == 0.0 {
                    return false;
                }
                (a - b).abs() / scale > threshold
            }
            _ => !self.same_as(other),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn normalized(&self) -> String {
        match self {
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Decimal(n) => n.to_string(),
            FieldValue::Text(s) => collapse_whitespace(s).to_lowercase(),
            FieldValue::List(items) => {
                let mut items: Vec<String> =
                    items.iter().map(|item| collapse_whitespace(item).to_lowercase()).collect();
                items.sort();
                items.dedup();
                items.join("|")
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(true) => f.write_str("yes"),
            FieldValue::Bool(false) => f.write_str("no"),
            FieldValue::Integer(n) => write!(f, "{}", group_thousands(*n)),
            FieldValue::Decimal(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", group_thousands(*n as i64))
            }
            FieldValue::Decimal(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

fn mismatch(field: &str, expected: &str, raw: &Value) -> ValidationError {
    ValidationError::invalid_format(field, format!("expected {}, got {}", expected, raw))
}

fn number_from(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_list(s: &str) -> Vec<String> {
    s.replace(" y ", ",")
        .replace(" and ", ",")
        .split([',', ';', '\n'])
        .map(collapse_whitespace)
        .filter(|item| !item.is_empty())
        .collect()
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

/// Parses amounts as written in listings: `$150.000.000`, `150,000,000 COP`,
/// `1.5 millones`, `85,5`.
///
/// A lone separator followed by exactly three digits is a thousands
/// separator; otherwise it is the decimal mark.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let lower = raw.to_lowercase();
    let multiplier = if ["millones", "millón", "millon", "million", "mm"]
        .iter()
        .any(|word| lower.contains(word))
    {
        1_000_000.0
    } else {
        1.0
    };
    let cleaned: String = lower
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let cleaned = cleaned.trim_matches(|c| matches!(c, '.' | ',' | '-'));
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let negative = raw.trim_start().starts_with('-');

    let dots = cleaned.matches('.').count();
    let commas = cleaned.matches(',').count();
    let normalized = match (dots, commas) {
        (0, 0) => cleaned.to_string(),
        (_, 0) => resolve_single_separator(cleaned, '.'),
        (0, _) => resolve_single_separator(cleaned, ','),
        _ => {
            let last_dot = cleaned.rfind('.').unwrap_or(0);
            let last_comma = cleaned.rfind(',').unwrap_or(0);
            let (thousands, decimal) = if last_dot > last_comma { (',', '.') } else { ('.', ',') };
            cleaned.replace(thousands, "").replace(decimal, ".")
        }
    };
    let value: f64 = normalized.replace('-', "").parse().ok()?;
    let value = value * multiplier;
    Some(if negative { -value } else { value })
}

fn resolve_single_separator(s: &str, sep: char) -> String {
    let count = s.matches(sep).count();
    let tail_len = s.rsplit(sep).next().map_or(0, str::len);
    if count > 1 || tail_len == 3 {
        s.replace(sep, "")
    } else {
        s.replace(sep, ".")
    }
}

/// Normalizes `2026-06`, `06/2026`, `junio 2026`, `June 2026` to `YYYY-MM`.
pub fn parse_year_month(raw: &str) -> Option<String> {
    const MONTHS: [(&str, &str, u32); 12] = [
        ("enero", "january", 1),
        ("febrero", "february", 2),
        ("marzo", "march", 3),
        ("abril", "april", 4),
        ("mayo", "may", 5),
        ("junio", "june", 6),
        ("julio", "july", 7),
        ("agosto", "august", 8),
        ("septiembre", "september", 9),
        ("octubre", "october", 10),
        ("noviembre", "november", 11),
        ("diciembre", "december", 12),
    ];
    let lower = raw.trim().to_lowercase();
    let numbers: Vec<u32> = lower
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect();

    let year = numbers.iter().copied().find(|n| (1990..=2100).contains(n))?;
    let month = MONTHS
        .iter()
        .find(|(es, en, _)| lower.contains(es) || lower.contains(en))
        .map(|(_, _, m)| *m)
        .or_else(|| numbers.iter().copied().find(|n| (1..=12).contains(n)))?;
    Some(format!("{:04}-{:02}", year, month))
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "si" | "sí" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn canonical_choice(path: FieldPath, raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    match path {
        FieldPath::Status => {
            if lower.contains("preventa") || lower.contains("presale") || lower.contains("pre-sale") {
                "presale".to_string()
            } else if lower.contains("constru") {
                "under_construction".to_string()
            } else if lower.contains("entreg") || lower.contains("deliver") {
                "delivered".to_string()
            } else {
                lower
            }
        }
        FieldPath::Currency => match lower.as_str() {
            "$" | "pesos" | "cop" => "COP".to_string(),
            "us$" | "usd" | "dolares" | "dólares" | "dollars" => "USD".to_string(),
            "€" | "eur" | "euros" => "EUR".to_string(),
            _ => raw.trim().to_uppercase(),
        },
        _ => raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod amounts {
        use super::*;

        #[test]
        fn colombian_thousands_dots() {
            assert_eq!(parse_amount("$150.000.000"), Some(150_000_000.0));
        }

        #[test]
        fn english_thousands_commas() {
            assert_eq!(parse_amount("200,000,000"), Some(200_000_000.0));
        }

        #[test]
        fn millions_multiplier() {
            assert_eq!(parse_amount("1.5 millones"), Some(1_500_000.0));
            assert_eq!(parse_amount("320 millones de pesos"), Some(320_000_000.0));
        }

        #[test]
        fn decimal_comma() {
            assert_eq!(parse_amount("85,5"), Some(85.5));
        }

        #[test]
        fn mixed_separators_use_last_as_decimal() {
            assert_eq!(parse_amount("1.234.567,89"), Some(1_234_567.89));
            assert_eq!(parse_amount("1,234,567.89"), Some(1_234_567.89));
        }

        #[test]
        fn no_digits_is_none() {
            assert_eq!(parse_amount("consultar"), None);
        }
    }

    mod coercion {
        use super::*;

        #[test]
        fn decimal_field_accepts_strings() {
            let value = FieldValue::coerce(FieldPath::PriceMin, &json!("$150.000.000")).unwrap();
            assert_eq!(value, FieldValue::Decimal(150_000_000.0));
        }

        #[test]
        fn integer_field_rejects_fractions() {
            assert!(FieldValue::coerce(FieldPath::Bedrooms, &json!(2.5)).is_err());
        }

        #[test]
        fn list_field_splits_text() {
            let value = FieldValue::parse_text(FieldPath::Amenities, "piscina, gimnasio y BBQ").unwrap();
            assert_eq!(
                value,
                FieldValue::List(vec!["piscina".into(), "gimnasio".into(), "BBQ".into()])
            );
        }

        #[test]
        fn delivery_date_accepts_month_names() {
            let value = FieldValue::parse_text(FieldPath::DeliveryDate, "Junio de 2026").unwrap();
            assert_eq!(value, FieldValue::Text("2026-06".into()));
        }

        #[test]
        fn status_aliases_map_to_canonical_values() {
            let value = FieldValue::parse_text(FieldPath::Status, "En construcción").unwrap();
            assert_eq!(value, FieldValue::Text("under_construction".into()));
        }

        #[test]
        fn boolean_from_spanish_yes() {
            let value = FieldValue::parse_text(FieldPath::OffersFinancing, "Sí").unwrap();
            assert_eq!(value, FieldValue::Bool(true));
        }

        #[test]
        fn coercion_runs_validation() {
            assert!(FieldValue::coerce(FieldPath::Latitude, &json!(120)).is_err());
        }
    }

    mod comparison {
        use super::*;

        #[test]
        fn text_equality_ignores_case_and_spacing() {
            let a = FieldValue::Text("Torres  del Parque".into());
            let b = FieldValue::Text("torres del parque".into());
            assert!(a.same_as(&b));
        }

        #[test]
        fn list_equality_ignores_order() {
            let a = FieldValue::List(vec!["Pool".into(), "Gym".into()]);
            let b = FieldValue::List(vec!["gym".into(), "pool".into()]);
            assert!(a.same_as(&b));
        }

        #[test]
        fn numeric_materiality_uses_relative_difference() {
            let a = FieldValue::Decimal(100.0);
            assert!(!a.differs_materially(&FieldValue::Decimal(115.0), 0.2));
            assert!(a.differs_materially(&FieldValue::Decimal(150.0), 0.2));
        }

        #[test]
        fn integer_and_decimal_compare_numerically() {
            assert!(FieldValue::Integer(3).same_as(&FieldValue::Decimal(3.0)));
        }

        #[test]
        fn display_groups_thousands() {
            assert_eq!(FieldValue::Decimal(200_000_000.0).to_string(), "200,000,000");
            assert_eq!(FieldValue::Bool(true).to_string(), "yes");
        }
    }
}
