//! Request body validation.
//!
//! Bodies are validated as raw JSON objects before being deserialized into
//! typed inputs, so every failing field is reported at once:
//!
//! ```json
//! {"first_name": ["The first name field is required."],
//!  "email": ["The email field must be a valid email address."]}
//! ```
//!
//! Rules also normalize what they accept: empty strings become `null`,
//! integer strings become numbers, booleans accept `1`/`0`/`"true"`, and
//! dates are rewritten to `YYYY-MM-DD`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};

use crm_core::{Email, FieldErrors};

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(FieldErrors);

impl ValidationErrors {
    /// An empty set of errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single error on one field.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Report a payload that passed the rules but still failed to deserialize.
    #[must_use]
    pub fn from_serde(err: &serde_json::Error) -> Self {
        Self::single("payload", format!("The payload is invalid: {err}"))
    }

    /// Record a message for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Whether `field` already has a message.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages for one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    #[must_use]
    pub fn into_inner(self) -> FieldErrors {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.0.values().flatten().next();
        match first {
            Some(message) => f.write_str(message),
            None => f.write_str("validation failed"),
        }
    }
}

impl std::error::Error for ValidationErrors {}

/// Collects rule failures over one JSON object.
pub struct Validator {
    doc: Map<String, Value>,
    prefix: String,
    errors: ValidationErrors,
}

impl Validator {
    /// Start validating `doc`. Empty or blank strings are converted to `null`.
    #[must_use]
    pub fn new(mut doc: Map<String, Value>) -> Self {
        for value in doc.values_mut() {
            if value.as_str().is_some_and(|s| s.trim().is_empty()) {
                *value = Value::Null;
            }
        }
        Self {
            doc,
            prefix: String::new(),
            errors: ValidationErrors::new(),
        }
    }

    fn nested(doc: Map<String, Value>, prefix: String) -> Self {
        let mut validator = Self::new(doc);
        validator.prefix = prefix;
        validator
    }

    /// Begin a rule chain for `name`.
    pub fn field(&mut self, name: &'static str) -> Field<'_> {
        Field {
            validator: self,
            name,
        }
    }

    /// Apply `rules` to every object of the array at `name`.
    ///
    /// Errors are keyed `name.<index>.<field>`. A missing or null array is
    /// skipped; anything else that is not an array of objects fails.
    pub fn each(&mut self, name: &'static str, rules: impl Fn(&mut Self)) {
        let key = self.key(name);
        let Some(Value::Array(items)) = self.doc.get_mut(name) else {
            if self.doc.get(name).is_some_and(|v| !v.is_null()) {
                self.errors
                    .add(&key, format!("The {} field must be an array.", label(&key)));
            }
            return;
        };

        for (index, item) in items.iter_mut().enumerate() {
            let item_key = format!("{key}.{index}");
            let Value::Object(object) = std::mem::take(item) else {
                self.errors.add(
                    &item_key,
                    format!("The {} field must be an object.", label(&item_key)),
                );
                continue;
            };

            let mut nested = Self::nested(object, format!("{item_key}."));
            rules(&mut nested);
            *item = Value::Object(nested.doc);
            for (field, messages) in nested.errors.into_inner() {
                for message in messages {
                    self.errors.add(&field, message);
                }
            }
        }
    }

    /// Record a failure computed outside the rule chain (e.g. a uniqueness lookup).
    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        let key = self.key(field);
        self.errors.add(&key, message);
    }

    /// Current (normalized) value of `name`, ignoring `null`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.doc.get(name).filter(|v| !v.is_null())
    }

    /// Finish validation and return the normalized document.
    ///
    /// # Errors
    ///
    /// Returns every recorded message when any rule failed.
    pub fn finish(self) -> Result<Map<String, Value>, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(self.doc)
        } else {
            Err(self.errors)
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }
}

/// A rule chain over one field. Once a rule fails, later rules are skipped.
pub struct Field<'v> {
    validator: &'v mut Validator,
    name: &'static str,
}

impl Field<'_> {
    fn key(&self) -> String {
        self.validator.key(self.name)
    }

    fn failed(&self) -> bool {
        self.validator.errors.has(&self.key())
    }

    fn fail(&mut self, message: impl FnOnce(&str) -> String) {
        let key = self.key();
        let text = message(&label(&key));
        self.validator.errors.add(&key, text);
    }

    /// Present, non-null value when no earlier rule failed.
    fn present(&self) -> Option<&Value> {
        if self.failed() {
            return None;
        }
        self.validator.value(self.name)
    }

    fn replace(&mut self, value: Value) {
        self.validator.doc.insert(self.name.to_owned(), value);
    }

    /// The field must be present and not null.
    pub fn required(&mut self) -> &mut Self {
        if !self.failed() && self.validator.value(self.name).is_none() {
            self.fail(|label| format!("The {label} field is required."));
        }
        self
    }

    /// The field must be a string.
    pub fn string(&mut self) -> &mut Self {
        if self.present().is_some_and(|v| !v.is_string()) {
            self.fail(|label| format!("The {label} field must be a string."));
        }
        self
    }

    /// String length (in characters) must not exceed `max`.
    pub fn max(&mut self, max: usize) -> &mut Self {
        let too_long = self
            .present()
            .and_then(Value::as_str)
            .is_some_and(|s| s.chars().count() > max);
        if too_long {
            self.fail(|label| {
                format!("The {label} field must not be greater than {max} characters.")
            });
        }
        self
    }

    /// String length (in characters) must be at least `min`.
    pub fn min(&mut self, min: usize) -> &mut Self {
        let too_short = self
            .present()
            .and_then(Value::as_str)
            .is_some_and(|s| s.chars().count() < min);
        if too_short {
            self.fail(|label| format!("The {label} field must be at least {min} characters."));
        }
        self
    }

    /// The field must be a valid email address.
    pub fn email(&mut self) -> &mut Self {
        let invalid = self
            .present()
            .is_some_and(|v| v.as_str().is_none_or(|s| Email::parse(s).is_err()));
        if invalid {
            self.fail(|label| format!("The {label} field must be a valid email address."));
        }
        self
    }

    /// The field must be a number or a numeric string.
    pub fn numeric(&mut self) -> &mut Self {
        let invalid = self.present().is_some_and(|v| parse_decimal(v).is_none());
        if invalid {
            self.fail(|label| format!("The {label} field must be a number."));
        } else if let Some(Value::String(s)) = self.present() {
            let trimmed = Value::String(s.trim().to_owned());
            self.replace(trimmed);
        }
        self
    }

    /// A money amount: numeric and, rounded to cents, within `NUMERIC(15, 2)`.
    pub fn money(&mut self) -> &mut Self {
        self.numeric();
        let max = max_money();
        let out_of_range = self
            .present()
            .and_then(parse_decimal)
            .is_some_and(|d| d.round_dp(2).abs() > max);
        if out_of_range {
            self.fail(|label| format!("The {label} field must be between -{max} and {max}."));
        }
        self
    }

    /// The field must be an integer; integer strings are converted to numbers.
    pub fn integer(&mut self) -> &mut Self {
        let Some(value) = self.present() else {
            return self;
        };
        match parse_integer(value) {
            Some(n) => self.replace(Value::Number(Number::from(n))),
            None => self.fail(|label| format!("The {label} field must be an integer.")),
        }
        self
    }

    /// Integer value must lie within `min..=max`.
    pub fn between(&mut self, min: i64, max: i64) -> &mut Self {
        let out_of_range = self
            .present()
            .and_then(parse_integer)
            .is_some_and(|n| n < min || n > max);
        if out_of_range {
            self.fail(|label| format!("The {label} field must be between {min} and {max}."));
        }
        self
    }

    /// The field must be boolean-like (`true`, `false`, `1`, `0`, `"1"`, `"0"`, `"true"`, `"false"`).
    pub fn boolean(&mut self) -> &mut Self {
        let Some(value) = self.present() else {
            return self;
        };
        match parse_bool(value) {
            Some(b) => self.replace(Value::Bool(b)),
            None => self.fail(|label| format!("The {label} field must be true or false.")),
        }
        self
    }

    /// The field must be a date; it is normalized to `YYYY-MM-DD`.
    pub fn date(&mut self) -> &mut Self {
        let Some(value) = self.present() else {
            return self;
        };
        match value.as_str().and_then(parse_date) {
            Some(date) => self.replace(Value::String(date.format("%Y-%m-%d").to_string())),
            None => self.fail(|label| format!("The {label} field must be a valid date.")),
        }
        self
    }

    /// The field must be a date or date-time; it is normalized to RFC 3339 UTC.
    pub fn datetime(&mut self) -> &mut Self {
        let Some(value) = self.present() else {
            return self;
        };
        match value.as_str().and_then(parse_datetime) {
            Some(at) => self.replace(Value::String(
                at.to_rfc3339_opts(SecondsFormat::Secs, true),
            )),
            None => self.fail(|label| format!("The {label} field must be a valid date.")),
        }
        self
    }

    /// The field must be one of `allowed`.
    pub fn one_of(&mut self, allowed: &[&str]) -> &mut Self {
        let invalid = self
            .present()
            .is_some_and(|v| v.as_str().is_none_or(|s| !allowed.contains(&s)));
        if invalid {
            self.fail(|label| format!("The selected {label} is invalid."));
        }
        self
    }

    /// The field must be an array.
    pub fn array(&mut self) -> &mut Self {
        if self.present().is_some_and(|v| !v.is_array()) {
            self.fail(|label| format!("The {label} field must be an array."));
        }
        self
    }

    /// `<field>_confirmation` must hold the same value.
    pub fn confirmed(&mut self) -> &mut Self {
        let confirmation = format!("{}_confirmation", self.name);
        let mismatch = self
            .present()
            .is_some_and(|v| self.validator.value(&confirmation) != Some(v));
        if mismatch {
            self.fail(|label| format!("The {label} field confirmation does not match."));
        }
        self
    }
}

/// Human label for a field key: `first_name` becomes `first name`.
fn label(key: &str) -> String {
    key.replace('_', " ")
}

/// Largest amount a money column stores: 13 integer digits, 2 decimals.
fn max_money() -> Decimal {
    Decimal::new(999_999_999_999_999, 2)
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parse `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]` or RFC 3339 into a calendar date.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(raw).map(|at| at.date_naive()))
}

/// Parse RFC 3339, `YYYY-MM-DD[T ]HH:MM[:SS]` (taken as UTC) or a bare date (midnight UTC).
#[must_use]
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn test_required_reports_missing_and_null_and_blank() {
        let mut v = Validator::new(doc(json!({"last_name": null, "email": "  "})));
        v.field("first_name").required();
        v.field("last_name").required();
        v.field("email").required();
        let errors = v.finish().unwrap_err();

        assert_eq!(
            errors.get("first_name").unwrap(),
            ["The first name field is required."]
        );
        assert!(errors.has("last_name"));
        assert!(errors.has("email"));
    }

    #[test]
    fn test_chain_stops_after_first_failure() {
        let mut v = Validator::new(doc(json!({"email": 42})));
        v.field("email").required().string().email();
        let errors = v.finish().unwrap_err();
        assert_eq!(
            errors.get("email").unwrap(),
            ["The email field must be a string."]
        );
    }

    #[test]
    fn test_optional_fields_skip_when_absent() {
        let mut v = Validator::new(doc(json!({"name": "Acme"})));
        v.field("website").string().max(255);
        v.field("probability").integer().between(0, 100);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_max_length_message() {
        let mut v = Validator::new(doc(json!({"name": "x".repeat(256)})));
        v.field("name").required().string().max(255);
        let errors = v.finish().unwrap_err();
        assert_eq!(
            errors.get("name").unwrap(),
            ["The name field must not be greater than 255 characters."]
        );
    }

    #[test]
    fn test_numeric_accepts_numbers_and_numeric_strings() {
        let mut v = Validator::new(doc(json!({"a": 5000, "b": "12.50", "c": "abc", "d": 1.5})));
        v.field("a").numeric();
        v.field("b").numeric();
        v.field("c").numeric();
        v.field("d").numeric();
        let errors = v.finish().unwrap_err();
        assert!(!errors.has("a"));
        assert!(!errors.has("b"));
        assert!(!errors.has("d"));
        assert_eq!(errors.get("c").unwrap(), ["The c field must be a number."]);
    }

    #[test]
    fn test_money_rejects_amounts_past_column_precision() {
        let mut v = Validator::new(doc(json!({
            "amount": "10000000000000",
            "unit_price": 1e14,
            "discount": "-9999999999999.999",
            "total": "9999999999999.99",
            "tax_amount": "-0.5",
        })));
        v.field("amount").money();
        v.field("unit_price").money();
        v.field("discount").money();
        v.field("total").money();
        v.field("tax_amount").money();
        let errors = v.finish().unwrap_err();

        assert_eq!(
            errors.get("amount").unwrap(),
            ["The amount field must be between -9999999999999.99 and 9999999999999.99."]
        );
        assert!(errors.has("unit_price"));
        assert!(errors.has("discount"));
        assert!(!errors.has("total"));
        assert!(!errors.has("tax_amount"));
    }

    #[test]
    fn test_money_reports_non_numbers_once() {
        let mut v = Validator::new(doc(json!({"amount": "lots"})));
        v.field("amount").required().money();
        let errors = v.finish().unwrap_err();
        assert_eq!(errors.get("amount").unwrap(), ["The amount field must be a number."]);
    }

    #[test]
    fn test_integer_normalizes_strings() {
        let mut v = Validator::new(doc(json!({"probability": "40", "company_id": 3})));
        v.field("probability").integer().between(0, 100);
        v.field("company_id").integer();
        let normalized = v.finish().unwrap();
        assert_eq!(normalized["probability"], json!(40));
        assert_eq!(normalized["company_id"], json!(3));
    }

    #[test]
    fn test_between_rejects_out_of_range() {
        let mut v = Validator::new(doc(json!({"probability": 150})));
        v.field("probability").integer().between(0, 100);
        let errors = v.finish().unwrap_err();
        assert_eq!(
            errors.get("probability").unwrap(),
            ["The probability field must be between 0 and 100."]
        );
    }

    #[test]
    fn test_boolean_normalizes() {
        let mut v = Validator::new(doc(json!({"a": "1", "b": 0, "c": "yes"})));
        v.field("a").boolean();
        v.field("b").boolean();
        v.field("c").boolean();
        let errors = v.finish().unwrap_err();
        assert!(errors.has("c"));
        assert!(!errors.has("a"));
    }

    #[test]
    fn test_date_normalizes_datetime_inputs() {
        let mut v = Validator::new(doc(json!({
            "a": "2026-10-19",
            "b": "2026-10-19T15:04:05.000Z",
            "c": "2026-10-19 08:00:00",
            "d": "next tuesday",
        })));
        v.field("a").date();
        v.field("b").date();
        v.field("c").date();
        v.field("d").date();
        let errors = v.finish().unwrap_err();
        assert_eq!(errors.get("d").unwrap(), ["The d field must be a valid date."]);
        assert!(!errors.has("b"));
    }

    #[test]
    fn test_date_rewrites_value() {
        let mut v = Validator::new(doc(json!({"due_date": "2026-10-19T23:30:00Z"})));
        v.field("due_date").required().date();
        let normalized = v.finish().unwrap();
        assert_eq!(normalized["due_date"], json!("2026-10-19"));
    }

    #[test]
    fn test_datetime_normalizes_to_rfc3339() {
        let mut v = Validator::new(doc(json!({"reminder": "2026-10-19 08:30"})));
        v.field("reminder").datetime();
        let normalized = v.finish().unwrap();
        assert_eq!(normalized["reminder"], json!("2026-10-19T08:30:00Z"));
    }

    #[test]
    fn test_one_of() {
        let mut v = Validator::new(doc(json!({"priority": "urgent"})));
        v.field("priority").one_of(&["low", "medium", "high"]);
        let errors = v.finish().unwrap_err();
        assert_eq!(
            errors.get("priority").unwrap(),
            ["The selected priority is invalid."]
        );
    }

    #[test]
    fn test_confirmed() {
        let mut v = Validator::new(doc(json!({
            "password": "hunter22",
            "password_confirmation": "hunter23",
        })));
        v.field("password").required().string().min(6).confirmed();
        let errors = v.finish().unwrap_err();
        assert_eq!(
            errors.get("password").unwrap(),
            ["The password field confirmation does not match."]
        );
    }

    #[test]
    fn test_each_prefixes_nested_errors() {
        let mut v = Validator::new(doc(json!({
            "items": [
                {"name": "Widget", "quantity": "2", "unit_price": 10},
                {"quantity": 1, "unit_price": "x"},
            ]
        })));
        v.each("items", |item| {
            item.field("name").required().string();
            item.field("quantity").required().integer();
            item.field("unit_price").required().numeric();
        });
        let errors = v.finish().unwrap_err();
        assert_eq!(
            errors.get("items.1.name").unwrap(),
            ["The items.1.name field is required."]
        );
        assert!(errors.has("items.1.unit_price"));
        assert!(!errors.has("items.0.quantity"));
    }

    #[test]
    fn test_each_writes_back_normalized_items() {
        let mut v = Validator::new(doc(json!({"items": [{"quantity": "3"}]})));
        v.each("items", |item| {
            item.field("quantity").integer();
        });
        let normalized = v.finish().unwrap();
        assert_eq!(normalized["items"][0]["quantity"], json!(3));
    }

    #[test]
    fn test_each_rejects_non_array() {
        let mut v = Validator::new(doc(json!({"items": "nope"})));
        v.each("items", |_| {});
        let errors = v.finish().unwrap_err();
        assert_eq!(
            errors.get("items").unwrap(),
            ["The items field must be an array."]
        );
    }

    #[test]
    fn test_display_shows_first_message() {
        let errors = ValidationErrors::single("email", "The email has already been taken.");
        assert_eq!(errors.to_string(), "The email has already been taken.");
    }
}
