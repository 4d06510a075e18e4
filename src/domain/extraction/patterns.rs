//! Regex pass over flattened text.
//!
//! Labelled matches ("Ciudad: Bogotá", "precio desde $150.000.000") score
//! at pattern confidence. Bare keyword hits ("preventa", "apartamentos")
//! score at free-inference confidence. Labels are recognised in Spanish and
//! English.

use once_cell::sync::Lazy;
use regex::Regex;

use super::confidence::ConfidencePolicy;
use super::flat_text::FlatText;
use crate::domain::foundation::Confidence;
use crate::domain::project::{ExtractedFieldSet, FieldCandidate, FieldPath, FieldValue, Origin};

const AMOUNT: &str = r"((?:\$|cop|usd|us\$)?\s*\d[\d.,]*\s*(?:millones|mill[oó]n|million|mm)?)";
const EXCERPT_LIMIT: usize = 160;

#[derive(Debug, Clone, Copy)]
enum Capture {
    /// Parse the capture group with the field's coercion rules.
    Group(usize),
    /// Decimal coordinates, parsed without thousands heuristics.
    Coordinate,
    /// The match itself is the evidence for a fixed value.
    Constant(&'static str),
}

struct Rule {
    path: FieldPath,
    regex: Regex,
    capture: Capture,
    labelled: bool,
}

fn rule(path: FieldPath, pattern: &str, capture: Capture, labelled: bool) -> Option<Rule> {
    Regex::new(&format!("(?i){}", pattern)).ok().map(|regex| Rule {
        path,
        regex,
        capture,
        labelled,
    })
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Capture::*;
    use FieldPath as F;
    let amount_after = |labels: &str| format!(r"(?:{})\s*(?:is|es|de|:|-)?\s*{}", labels, AMOUNT);
    [
        rule(F::Name, r"(?:nombre del proyecto|project name|nombre)\s*(?:is|es|:|-)\s*([^\n]+)", Group(1), true),
        rule(F::Name, r"(?:proyecto|project)\s*(?::|-|se llama|is called|called)\s*([^\n]+)", Group(1), true),
        rule(F::Builder, r"(?:constructora|builder|developer)\s*(?:is|es|:|-)\s*([^\n,;]+)", Group(1), true),
        rule(F::OwnerTaxId, r"\b(?:nit|tax id)\b\D{0,15}(\d{1,3}(?:[.\s]?\d{3}){1,3}(?:-\d)?)", Group(1), true),
        rule(F::City, r"\b(?:ciudad|city)\s*(?:is|es|:|-)\s*([^\n,;.]+)", Group(1), true),
        rule(F::Department, r"\bdepartamento\s*(?:es|:|-)\s*([^\n,;.]+)", Group(1), true),
        rule(F::Neighborhood, r"\b(?:barrio|sector|neighbou?rhood)\s*(?:is|es|:|-)\s*([^\n,;.]+)", Group(1), true),
        rule(F::Address, r"\b(?:direcci[oó]n|address)\s*(?:is|es|:|-)\s*([^\n]+)", Group(1), true),
        rule(F::Latitude, r"\blat(?:itud|itude)?\s*[:=]\s*(-?\d{1,2}(?:\.\d+)?)", Coordinate, true),
        rule(F::Longitude, r"\b(?:lon(?:gitud|gitude)?|lng)\s*[:=]\s*(-?\d{1,3}(?:\.\d+)?)", Coordinate, true),
        rule(F::PricePerM2, &format!(r"(?:valor|precio|price)\s*(?:por|per)?\s*m(?:2|²|etro cuadrado)\s*(?::|-)?\s*{}", AMOUNT), Group(1), true),
        rule(F::PriceMax, &amount_after(r"precio hasta|precio m[aá]ximo|price up to|max(?:imum)? price|price max"), Group(1), true),
        rule(F::PriceMax, &format!(r"\bdesde\s*\$?\s*\d[\d.,]*\s*(?:millones)?\s*hasta\s*{}", AMOUNT), Group(1), true),
        rule(F::PriceMin, &amount_after(r"precio(?:\s+desde)?|\bdesde|price(?:\s+from)?|starting at|valor(?:\s+desde)?"), Group(1), true),
        rule(F::MaintenanceFee, &amount_after(r"administraci[oó]n|cuota de administraci[oó]n|maintenance fee|hoa"), Group(1), true),
        rule(F::Currency, r"\b(COP|USD|EUR)\b", Group(1), false),
        rule(F::AreaMin, r"\b[aá]reas?\s*(?:desde|from|de|:)?\s*(\d[\d.,]*)\s*(?:m2|m²|mts2?)?\s*(?:a|-|hasta|to)\s*(\d[\d.,]*)\s*(?:m2|m²|mts2?)", Group(1), true),
        rule(F::AreaMax, r"\b[aá]reas?\s*(?:desde|from|de|:)?\s*(\d[\d.,]*)\s*(?:m2|m²|mts2?)?\s*(?:a|-|hasta|to)\s*(\d[\d.,]*)\s*(?:m2|m²|mts2?)", Group(2), true),
        rule(F::AreaMin, r"\b(?:[aá]rea|area)\s*(?::|-)?\s*(\d[\d.,]*)\s*(?:m2|m²|mts2?)", Group(1), true),
        rule(F::TotalUnits, r"\b(\d{1,5})\s*(?:apartamentos|unidades|units|apartments|viviendas|casas|homes)\b", Group(1), true),
        rule(F::Bedrooms, r"\b(\d{1,2})\s*(?:habitaciones|alcobas|bedrooms|cuartos)\b", Group(1), true),
        rule(F::Bathrooms, r"\b(\d{1,2})\s*(?:baños|banos|bathrooms)\b", Group(1), true),
        rule(F::ParkingSpots, r"\b(\d{1,2})\s*(?:parqueaderos?|parking(?: spots?)?)\b", Group(1), true),
        rule(F::DeliveryDate, r"\b(?:fecha de entrega|entrega|delivery(?: date)?)\s*(?:estimada|expected)?\s*(?:is|es|:|-)?\s*(?:en\s+|in\s+)?([a-záéíóú]+\s+(?:de\s+)?\d{4}|\d{1,2}[/-]\d{4}|\d{4}[/-]\d{1,2})", Group(1), true),
        rule(F::Status, r"\b(preventa|pre-?sale|en construcci[oó]n|under construction|entregado|delivered)\b", Group(1), false),
        rule(F::Amenities, r"\b(?:amenidades|amenities|zonas comunes)\s*(?::|-)\s*([^\n]+)", Group(1), true),
        rule(F::UnitTypes, r"\b(?:tipos? de unidad(?:es)?|tipolog[ií]as?|unit types?)\s*(?::|-)\s*([^\n]+)", Group(1), true),
        rule(F::PetFriendly, r"\b(?:pet[- ]friendly|se admiten mascotas|acepta mascotas|pets allowed)\b", Constant("yes"), false),
        rule(F::OffersFinancing, r"\b(?:financiaci[oó]n|financiamiento|financing)\s*(?::|-)\s*(s[ií]|no|yes)\b", Group(1), true),
        rule(F::OffersFinancing, r"\b(?:financiaci[oó]n disponible|ofrece financiaci[oó]n|financing available|offers financing)\b", Constant("yes"), true),
        rule(F::DownPaymentPercent, r"\b(?:cuota inicial|down payment)\s*(?:del|of|:|-)?\s*(\d{1,2}(?:[.,]\d+)?)\s*%", Group(1), true),
        rule(F::InstallmentMonths, r"\b(\d{1,3})\s*(?:meses|months)\b", Group(1), false),
        rule(F::Phone, r"\b(?:tel[eé]fono|tel|phone|celular|whatsapp)\s*[:.\-]?\s*(\+?\d[\d\s\-()]{6,}\d)", Group(1), true),
        rule(F::Email, r"([a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,})", Group(1), true),
        rule(F::Website, r"\b((?:https?://|www\.)[^\s,;]+)", Group(1), true),
    ]
    .into_iter()
    .flatten()
    .collect()
});

static UNIT_KEYWORDS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\b(?:apartamentos?|apartaestudios?|apartments?)\b", "apartment"),
        (r"(?i)\b(?:casas?|houses?)\b", "house"),
        (r"(?i)\b(?:oficinas?|offices?)\b", "office"),
        (r"(?i)\b(?:locales? comerciales?|retail)\b", "retail"),
        (r"(?i)\b(?:lotes?|lots?)\b", "lot"),
    ]
    .iter()
    .filter_map(|(pattern, label)| Regex::new(pattern).ok().map(|re| (re, *label)))
    .collect()
});

/// Deterministic regex extractor.
#[derive(Debug, Clone, Default)]
pub struct PatternExtractor {
    policy: ConfidencePolicy,
}

impl PatternExtractor {
    pub fn new(policy: ConfidencePolicy) -> Self {
        Self { policy }
    }

    /// Runs every rule over every line. Within a path, the first labelled
    /// match wins.
    pub fn extract(&self, text: &FlatText, origin: Origin) -> ExtractedFieldSet {
        let labelled_confidence = match origin {
            Origin::Conversation => self.policy.user(),
            Origin::Document | Origin::Tool => self.policy.pattern(),
        };
        let mut set = ExtractedFieldSet::new();

        for line in text.lines() {
            for rule in RULES.iter() {
                let Some(caps) = rule.regex.captures(line) else {
                    continue;
                };
                let value = match rule.capture {
                    Capture::Group(index) => caps
                        .get(index)
                        .and_then(|m| FieldValue::parse_text(rule.path, clean(m.as_str())).ok()),
                    Capture::Coordinate => caps
                        .get(1)
                        .and_then(|m| m.as_str().parse::<f64>().ok())
                        .map(FieldValue::Decimal)
                        .filter(|value| rule.path.validate(value).is_ok()),
                    Capture::Constant(raw) => FieldValue::parse_text(rule.path, raw).ok(),
                };
                let Some(value) = value else {
                    continue;
                };
                let confidence = if rule.labelled {
                    labelled_confidence
                } else {
                    self.unlabelled(origin)
                };
                set.insert(
                    rule.path,
                    FieldCandidate::new(value, confidence, origin).with_excerpt(excerpt(line)),
                );
            }
        }

        if set.get(FieldPath::UnitTypes).is_none() {
            if let Some(candidate) = self.unit_types(text, origin) {
                set.insert(FieldPath::UnitTypes, candidate);
            }
        }
        set
    }

    fn unlabelled(&self, origin: Origin) -> Confidence {
        match origin {
            Origin::Conversation => self.policy.user(),
            Origin::Document | Origin::Tool => self.policy.inferred(),
        }
    }

    fn unit_types(&self, text: &FlatText, origin: Origin) -> Option<FieldCandidate> {
        let mut found: Vec<String> = Vec::new();
        let mut evidence: Option<&str> = None;
        for line in text.lines() {
            for (regex, label) in UNIT_KEYWORDS.iter() {
                if regex.is_match(line) && !found.iter().any(|f| f == label) {
                    found.push(label.to_string());
                    evidence.get_or_insert(line.as_str());
                }
            }
        }
        if found.is_empty() {
            return None;
        }
        let mut candidate = FieldCandidate::new(FieldValue::List(found), self.unlabelled(origin), origin);
        if let Some(line) = evidence {
            candidate = candidate.with_excerpt(excerpt(line));
        }
        Some(candidate)
    }
}

fn clean(raw: &str) -> &str {
    raw.trim().trim_end_matches(['.', ',', ';', ':'])
}

pub(crate) fn excerpt(line: &str) -> String {
    if line.chars().count() <= EXCERPT_LIMIT {
        return line.to_string();
    }
    let cut: String = line.chars().take(EXCERPT_LIMIT).collect();
    format!("{}…", cut)
}
