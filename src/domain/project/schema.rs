//! The fixed target schema for a real-estate project record.
//!
//! Every field the engine knows about is a variant of [`FieldPath`]. The
//! declaration order is significant: it is the order fields are reported
//! as missing and the order the assistant asks about them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::value::FieldValue;
use crate::domain::foundation::ValidationError;

/// Shape of the value a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Boolean,
    /// Calendar month rendered as `YYYY-MM`.
    YearMonth,
    TextList,
    /// One of a closed set of canonical values.
    Choice(&'static [&'static str]),
}

impl FieldKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Decimal)
    }
}

pub const PROJECT_STATUSES: &[&str] = &["presale", "under_construction", "delivered"];
pub const CURRENCIES: &[&str] = &["COP", "USD", "EUR"];

/// Dotted path of a field in the project record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldPath {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "description")]
    Description,
    #[serde(rename = "owner_tax_id")]
    OwnerTaxId,
    #[serde(rename = "builder")]
    Builder,
    #[serde(rename = "status")]
    Status,
    #[serde(rename = "delivery_date")]
    DeliveryDate,
    #[serde(rename = "location.country")]
    Country,
    #[serde(rename = "location.department")]
    Department,
    #[serde(rename = "location.city")]
    City,
    #[serde(rename = "location.neighborhood")]
    Neighborhood,
    #[serde(rename = "location.address")]
    Address,
    #[serde(rename = "location.latitude")]
    Latitude,
    #[serde(rename = "location.longitude")]
    Longitude,
    #[serde(rename = "price_info.currency")]
    Currency,
    #[serde(rename = "price_info.price_min")]
    PriceMin,
    #[serde(rename = "price_info.price_max")]
    PriceMax,
    #[serde(rename = "price_info.price_per_m2")]
    PricePerM2,
    #[serde(rename = "price_info.maintenance_fee")]
    MaintenanceFee,
    #[serde(rename = "unit_info.unit_types")]
    UnitTypes,
    #[serde(rename = "unit_info.total_units")]
    TotalUnits,
    #[serde(rename = "unit_info.area_min_m2")]
    AreaMin,
    #[serde(rename = "unit_info.area_max_m2")]
    AreaMax,
    #[serde(rename = "unit_info.bedrooms")]
    Bedrooms,
    #[serde(rename = "unit_info.bathrooms")]
    Bathrooms,
    #[serde(rename = "unit_info.parking_spots")]
    ParkingSpots,
    #[serde(rename = "amenities.list")]
    Amenities,
    #[serde(rename = "amenities.pet_friendly")]
    PetFriendly,
    #[serde(rename = "financial_info.offers_financing")]
    OffersFinancing,
    #[serde(rename = "financial_info.down_payment_percent")]
    DownPaymentPercent,
    #[serde(rename = "financial_info.installment_months")]
    InstallmentMonths,
    #[serde(rename = "contact.phone")]
    Phone,
    #[serde(rename = "contact.email")]
    Email,
    #[serde(rename = "contact.website")]
    Website,
    #[serde(rename = "media.brochure_url")]
    BrochureUrl,
}

impl FieldPath {
    /// Every field, in schema order.
    pub const ALL: [FieldPath; 34] = [
        FieldPath::Name,
        FieldPath::Description,
        FieldPath::OwnerTaxId,
        FieldPath::Builder,
        FieldPath::Status,
        FieldPath::DeliveryDate,
        FieldPath::Country,
        FieldPath::Department,
        FieldPath::City,
        FieldPath::Neighborhood,
        FieldPath::Address,
        FieldPath::Latitude,
        FieldPath::Longitude,
        FieldPath::Currency,
        FieldPath::PriceMin,
        FieldPath::PriceMax,
        FieldPath::PricePerM2,
        FieldPath::MaintenanceFee,
        FieldPath::UnitTypes,
        FieldPath::TotalUnits,
        FieldPath::AreaMin,
        FieldPath::AreaMax,
        FieldPath::Bedrooms,
        FieldPath::Bathrooms,
        FieldPath::ParkingSpots,
        FieldPath::Amenities,
        FieldPath::PetFriendly,
        FieldPath::OffersFinancing,
        FieldPath::DownPaymentPercent,
        FieldPath::InstallmentMonths,
        FieldPath::Phone,
        FieldPath::Email,
        FieldPath::Website,
        FieldPath::BrochureUrl,
    ];

    /// Required fields in schema order.
    pub fn required() -> impl Iterator<Item = FieldPath> {
        Self::ALL.into_iter().filter(FieldPath::is_required)
    }

    pub fn required_count() -> usize {
        Self::required().count()
    }

    pub fn is_required(&self) -> bool {
        matches!(
            self,
            FieldPath::Name
                | FieldPath::Description
                | FieldPath::OwnerTaxId
                | FieldPath::DeliveryDate
                | FieldPath::City
                | FieldPath::PriceMin
                | FieldPath::UnitTypes
                | FieldPath::Amenities
                | FieldPath::OffersFinancing
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldPath::Name => "name",
            FieldPath::Description => "description",
            FieldPath::OwnerTaxId => "owner_tax_id",
            FieldPath::Builder => "builder",
            FieldPath::Status => "status",
            FieldPath::DeliveryDate => "delivery_date",
            FieldPath::Country => "location.country",
            FieldPath::Department => "location.department",
            FieldPath::City => "location.city",
            FieldPath::Neighborhood => "location.neighborhood",
            FieldPath::Address => "location.address",
            FieldPath::Latitude => "location.latitude",
            FieldPath::Longitude => "location.longitude",
            FieldPath::Currency => "price_info.currency",
            FieldPath::PriceMin => "price_info.price_min",
            FieldPath::PriceMax => "price_info.price_max",
            FieldPath::PricePerM2 => "price_info.price_per_m2",
            FieldPath::MaintenanceFee => "price_info.maintenance_fee",
            FieldPath::UnitTypes => "unit_info.unit_types",
            FieldPath::TotalUnits => "unit_info.total_units",
            FieldPath::AreaMin => "unit_info.area_min_m2",
            FieldPath::AreaMax => "unit_info.area_max_m2",
            FieldPath::Bedrooms => "unit_info.bedrooms",
            FieldPath::Bathrooms => "unit_info.bathrooms",
            FieldPath::ParkingSpots => "unit_info.parking_spots",
            FieldPath::Amenities => "amenities.list",
            FieldPath::PetFriendly => "amenities.pet_friendly",
            FieldPath::OffersFinancing => "financial_info.offers_financing",
            FieldPath::DownPaymentPercent => "financial_info.down_payment_percent",
            FieldPath::InstallmentMonths => "financial_info.installment_months",
            FieldPath::Phone => "contact.phone",
            FieldPath::Email => "contact.email",
            FieldPath::Website => "contact.website",
            FieldPath::BrochureUrl => "media.brochure_url",
        }
    }

    /// Human wording used when asking the user about this field.
    pub fn label(&self) -> &'static str {
        match self {
            FieldPath::Name => "project name",
            FieldPath::Description => "project description",
            FieldPath::OwnerTaxId => "owner's tax id (NIT)",
            FieldPath::Builder => "builder",
            FieldPath::Status => "construction status",
            FieldPath::DeliveryDate => "expected delivery date",
            FieldPath::Country => "country",
            FieldPath::Department => "department",
            FieldPath::City => "city",
            FieldPath::Neighborhood => "neighborhood",
            FieldPath::Address => "address",
            FieldPath::Latitude => "latitude",
            FieldPath::Longitude => "longitude",
            FieldPath::Currency => "price currency",
            FieldPath::PriceMin => "starting price",
            FieldPath::PriceMax => "maximum price",
            FieldPath::PricePerM2 => "price per square meter",
            FieldPath::MaintenanceFee => "maintenance fee",
            FieldPath::UnitTypes => "unit types",
            FieldPath::TotalUnits => "total number of units",
            FieldPath::AreaMin => "smallest unit area",
            FieldPath::AreaMax => "largest unit area",
            FieldPath::Bedrooms => "bedrooms",
            FieldPath::Bathrooms => "bathrooms",
            FieldPath::ParkingSpots => "parking spots",
            FieldPath::Amenities => "amenities",
            FieldPath::PetFriendly => "pet policy",
            FieldPath::OffersFinancing => "financing availability",
            FieldPath::DownPaymentPercent => "down payment percentage",
            FieldPath::InstallmentMonths => "installment months",
            FieldPath::Phone => "contact phone",
            FieldPath::Email => "contact e-mail",
            FieldPath::Website => "website",
            FieldPath::BrochureUrl => "brochure link",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldPath::Status => FieldKind::Choice(PROJECT_STATUSES),
            FieldPath::Currency => FieldKind::Choice(CURRENCIES),
            FieldPath::DeliveryDate => FieldKind::YearMonth,
            FieldPath::Latitude
            | FieldPath::Longitude
            | FieldPath::PriceMin
            | FieldPath::PriceMax
            | FieldPath::PricePerM2
            | FieldPath::MaintenanceFee
            | FieldPath::AreaMin
            | FieldPath::AreaMax
            | FieldPath::DownPaymentPercent => FieldKind::Decimal,
            FieldPath::TotalUnits
            | FieldPath::Bedrooms
            | FieldPath::Bathrooms
            | FieldPath::ParkingSpots
            | FieldPath::InstallmentMonths => FieldKind::Integer,
            FieldPath::UnitTypes | FieldPath::Amenities => FieldKind::TextList,
            FieldPath::PetFriendly | FieldPath::OffersFinancing => FieldKind::Boolean,
            _ => FieldKind::Text,
        }
    }

    /// Checks a value against this field's kind and range rules.
    ///
    /// Cross-field rules (min/max ordering) live in
    /// [`validate_against`](Self::validate_against) because they need
    /// the rest of the draft.
    pub fn validate(&self, value: &FieldValue) -> Result<(), ValidationError> {
        let field = self.as_str();
        match (self.kind(), value) {
            (FieldKind::Text, FieldValue::Text(text)) => self.validate_text(text),
            (FieldKind::YearMonth, FieldValue::Text(text)) => validate_year_month(field, text),
            (FieldKind::Choice(options), FieldValue::Text(text)) => {
                if options.contains(&text.as_str()) {
                    Ok(())
                } else {
                    Err(ValidationError::invalid_format(
                        field,
                        format!("expected one of {}", options.join(", ")),
                    ))
                }
            }
            (FieldKind::TextList, FieldValue::List(items)) => {
                if items.is_empty() || items.iter().any(|item| item.trim().is_empty()) {
                    Err(ValidationError::empty_field(field))
                } else {
                    Ok(())
                }
            }
            (FieldKind::Boolean, FieldValue::Bool(_)) => Ok(()),
            (FieldKind::Integer, FieldValue::Integer(n)) => {
                let min = if self.allows_zero() { 0 } else { 1 };
                if *n < min {
                    Err(ValidationError::out_of_range(field, min as f64, f64::MAX, *n as f64))
                } else {
                    Ok(())
                }
            }
            (FieldKind::Decimal, FieldValue::Decimal(n)) => self.validate_decimal(*n),
            (FieldKind::Decimal, FieldValue::Integer(n)) => self.validate_decimal(*n as f64),
            (kind, other) => Err(ValidationError::invalid_format(
                field,
                format!("expected {:?}, got {}", kind, other.kind_name()),
            )),
        }
    }

    /// Validates ordering constraints between paired fields.
    pub fn validate_against(
        &self,
        value: &FieldValue,
        lookup: impl Fn(FieldPath) -> Option<FieldValue>,
    ) -> Result<(), ValidationError> {
        let (lower, upper) = match self {
            FieldPath::PriceMin => (value.as_f64(), lookup(FieldPath::PriceMax).and_then(|v| v.as_f64())),
            FieldPath::PriceMax => (lookup(FieldPath::PriceMin).and_then(|v| v.as_f64()), value.as_f64()),
            FieldPath::AreaMin => (value.as_f64(), lookup(FieldPath::AreaMax).and_then(|v| v.as_f64())),
            FieldPath::AreaMax => (lookup(FieldPath::AreaMin).and_then(|v| v.as_f64()), value.as_f64()),
            _ => return Ok(()),
        };
        match (lower, upper) {
            (Some(lower), Some(upper)) if lower > upper => Err(ValidationError::invalid_format(
                self.as_str(),
                format!("minimum {} exceeds maximum {}", lower, upper),
            )),
            _ => Ok(()),
        }
    }

    fn allows_zero(&self) -> bool {
        matches!(
            self,
            FieldPath::Bedrooms | FieldPath::Bathrooms | FieldPath::ParkingSpots | FieldPath::MaintenanceFee
        )
    }

    fn validate_text(&self, text: &str) -> Result<(), ValidationError> {
        let field = self.as_str();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field(field));
        }
        match self {
            FieldPath::Description if trimmed.chars().count() < 20 => Err(
                ValidationError::invalid_format(field, "description must be at least 20 characters"),
            ),
            FieldPath::OwnerTaxId if !is_tax_id(trimmed) => Err(ValidationError::invalid_format(
                field,
                "expected 6-12 digits with an optional check digit",
            )),
            FieldPath::Email if !(trimmed.contains('@') && trimmed.contains('.')) => Err(
                ValidationError::invalid_format(field, "not an e-mail address"),
            ),
            _ => Ok(()),
        }
    }

    fn validate_decimal(&self, n: f64) -> Result<(), ValidationError> {
        let field = self.as_str();
        if !n.is_finite() {
            return Err(ValidationError::invalid_format(field, "not a finite number"));
        }
        let (min, max, inclusive_min) = match self {
            FieldPath::Latitude => (-90.0, 90.0, true),
            FieldPath::Longitude => (-180.0, 180.0, true),
            FieldPath::DownPaymentPercent => (0.0, 100.0, true),
            FieldPath::MaintenanceFee => (0.0, f64::MAX, true),
            _ => (0.0, f64::MAX, false),
        };
        let below = if inclusive_min { n < min } else { n <= min };
        if below || n > max {
            return Err(ValidationError::out_of_range(field, min, max, n));
        }
        Ok(())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FieldPath::ALL
            .into_iter()
            .find(|path| path.as_str() == wanted)
            .ok_or_else(|| ValidationError::invalid_format("field_path", format!("unknown field '{}'", wanted)))
    }
}

/// Tax ids are 6-12 digits, optionally followed by `-` and a check digit.
/// Dots and spaces are formatting only.
pub fn is_tax_id(raw: &str) -> bool {
    let compact: String = raw.chars().filter(|c| !matches!(c, '.' | ' ')).collect();
    let (body, check) = match compact.split_once('-') {
        Some((body, check)) => (body, Some(check)),
        None => (compact.as_str(), None),
    };
    let body_ok = (6..=12).contains(&body.len()) && body.chars().all(|c| c.is_ascii_digit());
    let check_ok = check.map_or(true, |c| c.len() == 1 && c.chars().all(|c| c.is_ascii_digit()));
    body_ok && check_ok
}

fn validate_year_month(field: &str, text: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::invalid_format(field, "expected YYYY-MM");
    let (year, month) = text.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: u32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1990..=2100).contains(&year) || !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod paths {
        use super::*;

        #[test]
        fn every_path_round_trips_through_its_wire_name() {
            for path in FieldPath::ALL {
                assert_eq!(path.as_str().parse::<FieldPath>().unwrap(), path);
            }
        }

        #[test]
        fn serde_uses_dotted_names() {
            let json = serde_json::to_string(&FieldPath::City).unwrap();
            assert_eq!(json, "\"location.city\"");
        }

        #[test]
        fn all_is_in_declaration_order() {
            let mut sorted = FieldPath::ALL;
            sorted.sort();
            assert_eq!(sorted, FieldPath::ALL);
        }

        #[test]
        fn nine_fields_are_required() {
            assert_eq!(FieldPath::required_count(), 9);
            assert_eq!(FieldPath::required().next(), Some(FieldPath::Name));
        }

        #[test]
        fn unknown_path_is_rejected() {
            assert!("location.planet".parse::<FieldPath>().is_err());
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn short_description_is_invalid() {
            let value = FieldValue::Text("Nice place".into());
            assert!(FieldPath::Description.validate(&value).is_err());
        }

        #[test]
        fn latitude_outside_range_is_invalid() {
            assert!(FieldPath::Latitude.validate(&FieldValue::Decimal(91.0)).is_err());
            assert!(FieldPath::Latitude.validate(&FieldValue::Decimal(4.65)).is_ok());
        }

        #[test]
        fn prices_must_be_positive() {
            assert!(FieldPath::PriceMin.validate(&FieldValue::Decimal(0.0)).is_err());
            assert!(FieldPath::PriceMin.validate(&FieldValue::Integer(150_000_000)).is_ok());
        }

        #[test]
        fn bedrooms_may_be_zero() {
            assert!(FieldPath::Bedrooms.validate(&FieldValue::Integer(0)).is_ok());
            assert!(FieldPath::TotalUnits.validate(&FieldValue::Integer(0)).is_err());
        }

        #[test]
        fn kind_mismatch_is_invalid() {
            let err = FieldPath::OffersFinancing
                .validate(&FieldValue::Text("maybe".into()))
                .unwrap_err();
            assert_eq!(err.field(), "financial_info.offers_financing");
        }

        #[test]
        fn delivery_date_requires_year_month() {
            assert!(FieldPath::DeliveryDate.validate(&FieldValue::Text("2026-13".into())).is_err());
            assert!(FieldPath::DeliveryDate.validate(&FieldValue::Text("2026-06".into())).is_ok());
        }

        #[test]
        fn status_must_be_canonical() {
            assert!(FieldPath::Status.validate(&FieldValue::Text("presale".into())).is_ok());
            assert!(FieldPath::Status.validate(&FieldValue::Text("soon".into())).is_err());
        }

        #[test]
        fn tax_id_accepts_dotted_form_with_check_digit() {
            assert!(is_tax_id("900.123.456-7"));
            assert!(is_tax_id("900123456"));
            assert!(!is_tax_id("90012-34"));
            assert!(!is_tax_id("abc"));
        }

        #[test]
        fn price_max_below_price_min_is_invalid() {
            let lookup = |path| match path {
                FieldPath::PriceMin => Some(FieldValue::Decimal(200.0)),
                _ => None,
            };
            assert!(FieldPath::PriceMax
                .validate_against(&FieldValue::Decimal(100.0), lookup)
                .is_err());
            assert!(FieldPath::PriceMax
                .validate_against(&FieldValue::Decimal(300.0), lookup)
                .is_ok());
        }
    }
}
