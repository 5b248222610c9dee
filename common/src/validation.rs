use std::collections::BTreeMap;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    error::ValidationFailure,
    measurement::{self, RawMeasurement},
    models::{Garment, MeasurementField, Measurements},
    naming,
};

lazy_static! {
    static ref INDIAN_MOBILE: Regex = Regex::new(r"^[6-9]\d{9}$").unwrap();
}

const MAX_NAME_CHARS: usize = 100;

/// Order in which field problems are reported.
const FIELD_ORDER: &[&str] = &["name", "phone", "notes"];

pub type RawMeasurements = BTreeMap<Garment, BTreeMap<MeasurementField, Option<RawMeasurement>>>;

/// Operator input for the new / edit customer form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CustomerForm {
    #[validate(
        length(min = 1, message = "Name is required (max 100 characters)"),
        custom(function = "name_fits", message = "Name is required (max 100 characters)")
    )]
    pub name: String,
    #[validate(regex(
        path = *INDIAN_MOBILE,
        message = "Enter a valid 10-digit Indian mobile number (starts with 6-9)"
    ))]
    pub phone: String,
    pub date: NaiveDate,
    pub trial_date: NaiveDate,
    pub delivery_date: NaiveDate,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub dob: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_string_as_none")]
    #[validate(length(max = 500, message = "Notes too long"))]
    pub notes: Option<String>,
    #[serde(default)]
    pub selected_garments: Vec<Garment>,
    #[serde(default)]
    pub measurements: RawMeasurements,
}

/// The limit applies to what the operator typed. A `" Size N"` added by the
/// duplicate resolver does not count, so resolved names stay editable.
fn name_fits(name: &str) -> Result<(), ValidationError> {
    if naming::strip_size_suffix(name).chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::new("length"));
    }
    Ok(())
}

impl CustomerForm {
    /// Checks every rule and yields a customer that is safe to persist.
    pub fn validate_into(self) -> Result<ValidatedCustomer, ValidationFailure> {
        if let Err(errors) = self.validate() {
            let field_errors = errors.field_errors();
            for field in FIELD_ORDER {
                if let Some(first) = field_errors.get(*field).and_then(|errs| errs.first()) {
                    let message = first
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| first.code.to_string());
                    return Err(ValidationFailure::new(*field, message));
                }
            }
        }

        if self.trial_date < self.date || self.delivery_date < self.trial_date {
            return Err(ValidationFailure::new(
                "trial_date",
                "Trial date must be between measurement and delivery dates",
            ));
        }

        let mut selected_garments: Vec<Garment> = Vec::with_capacity(self.selected_garments.len());
        for garment in self.selected_garments {
            if !selected_garments.contains(&garment) {
                selected_garments.push(garment);
            }
        }

        let mut measurements = Measurements::new();
        for (garment, fields) in &self.measurements {
            for (&field, raw) in fields {
                let Some(raw) = raw.as_ref().filter(|raw| !raw.is_blank()) else {
                    continue;
                };
                let column = format!("{}_{}", garment.column_prefix(), field.as_str());
                let value = measurement::decode(Some(raw))
                    .ok_or_else(|| ValidationFailure::new(column.as_str(), "Must be a number"))?;
                if value <= 0.0 {
                    return Err(ValidationFailure::new(column, "Must be positive"));
                }
                measurements.insert(*garment, field, value)?;
            }
        }

        Ok(ValidatedCustomer {
            name: self.name,
            phone: self.phone,
            date: self.date,
            trial_date: self.trial_date,
            delivery_date: self.delivery_date,
            dob: self.dob,
            notes: self.notes,
            selected_garments,
            measurements,
        })
    }
}

/// A customer that passed [`CustomerForm::validate_into`]. The fields can only
/// be read, apart from the name which the duplicate resolver may rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCustomer {
    pub(crate) name: String,
    pub(crate) phone: String,
    pub(crate) date: NaiveDate,
    pub(crate) trial_date: NaiveDate,
    pub(crate) delivery_date: NaiveDate,
    pub(crate) dob: Option<NaiveDate>,
    pub(crate) notes: Option<String>,
    pub(crate) selected_garments: Vec<Garment>,
    pub(crate) measurements: Measurements,
}

impl ValidatedCustomer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn trial_date(&self) -> NaiveDate {
        self.trial_date
    }

    pub fn delivery_date(&self) -> NaiveDate {
        self.delivery_date
    }

    pub fn dob(&self) -> Option<NaiveDate> {
        self.dob
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn selected_garments(&self) -> &[Garment] {
        &self.selected_garments
    }

    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    pub fn with_name(mut self, name: String) -> Self {
        self.name = name;
        self
    }
}

fn blank_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|text| !text.trim().is_empty()))
}

fn blank_date_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match blank_string_as_none(deserializer)? {
        Some(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn form(overrides: serde_json::Value) -> CustomerForm {
        let mut base = json!({
            "name": "Amit",
            "phone": "9876543210",
            "date": "2024-01-10",
            "trial_date": "2024-01-15",
            "delivery_date": "2024-01-20",
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn accepts_a_minimal_form() {
        let customer = form(json!({})).validate_into().unwrap();
        assert_eq!(customer.name(), "Amit");
        assert!(customer.selected_garments().is_empty());
        assert!(customer.measurements().is_empty());
        assert_eq!(customer.dob(), None);
    }

    #[test]
    fn blank_optional_strings_are_absent() {
        let customer = form(json!({ "dob": "", "notes": "  " })).validate_into().unwrap();
        assert_eq!(customer.dob(), None);
        assert_eq!(customer.notes(), None);
    }

    #[test]
    fn rejects_bad_phone_numbers() {
        for phone in ["12345", "5876543210", "98765432101", "98765-4321"] {
            let err = form(json!({ "phone": phone })).validate_into().unwrap_err();
            assert_eq!(err.field, "phone", "{phone}");
        }
    }

    #[test]
    fn name_is_reported_before_phone() {
        let err = form(json!({ "name": "", "phone": "1" })).validate_into().unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn name_limit_ignores_a_resolved_size() {
        let typed = "R".repeat(100);
        assert!(form(json!({ "name": typed })).validate_into().is_ok());

        let resolved = format!("{} Size 12", typed);
        let customer = form(json!({ "name": resolved })).validate_into().unwrap();
        assert_eq!(customer.name(), resolved);

        let err = form(json!({ "name": "R".repeat(101) })).validate_into().unwrap_err();
        assert_eq!(err.field, "name");
        let err = form(json!({ "name": format!("{} Size Large", typed) }))
            .validate_into()
            .unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn rejects_long_notes() {
        let err = form(json!({ "notes": "x".repeat(501) })).validate_into().unwrap_err();
        assert_eq!(err, ValidationFailure::new("notes", "Notes too long"));
    }

    #[test]
    fn enforces_date_ordering() {
        let early_trial = form(json!({ "trial_date": "2024-01-09" })).validate_into();
        assert_eq!(early_trial.unwrap_err().field, "trial_date");

        let early_delivery = form(json!({ "delivery_date": "2024-01-14" })).validate_into();
        assert_eq!(early_delivery.unwrap_err().field, "trial_date");

        let same_day = form(json!({
            "trial_date": "2024-01-10",
            "delivery_date": "2024-01-10",
        }));
        assert!(same_day.validate_into().is_ok());
    }

    #[test]
    fn decodes_fractional_measurements() {
        let customer = form(json!({
            "selected_garments": ["Shirt", "Modi Jacket", "Shirt"],
            "measurements": {
                "Shirt": { "length": "28 1/2", "chest": 40, "cuff": "", "collar": null },
                "Modi Jacket": { "shoulder": "18 3/4" }
            }
        }))
        .validate_into()
        .unwrap();

        assert_eq!(
            customer.selected_garments(),
            &[Garment::Shirt, Garment::ModiJacket]
        );
        let m = customer.measurements();
        assert_eq!(m.get(Garment::Shirt, MeasurementField::Length), Some(28.5));
        assert_eq!(m.get(Garment::Shirt, MeasurementField::Chest), Some(40.0));
        assert_eq!(m.get(Garment::Shirt, MeasurementField::Cuff), None);
        assert_eq!(m.get(Garment::ModiJacket, MeasurementField::Shoulder), Some(18.75));
    }

    #[test]
    fn rejects_non_numeric_and_non_positive_measurements() {
        let err = form(json!({ "measurements": { "Pant": { "knee": "abc" } } }))
            .validate_into()
            .unwrap_err();
        assert_eq!(err, ValidationFailure::new("pant_knee", "Must be a number"));

        let err = form(json!({ "measurements": { "Pant": { "waist": 0 } } }))
            .validate_into()
            .unwrap_err();
        assert_eq!(err, ValidationFailure::new("pant_waist", "Must be positive"));
    }

    #[test]
    fn rejects_fields_outside_the_garment() {
        let err = form(json!({ "measurements": { "Pant": { "collar": 15 } } }))
            .validate_into()
            .unwrap_err();
        assert_eq!(err.field, "pant_collar");
    }
}
