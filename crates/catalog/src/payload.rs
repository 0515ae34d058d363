//! Helpers for turning loosely-typed JSON payload values into domain values.
//!
//! Write payloads keep their fields as raw [`serde_json::Value`]s so that a
//! wrong type becomes a field-level validation message instead of rejecting
//! the whole body.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const INVALID_STRING: &str = "Not a valid string.";
pub const INVALID_INTEGER: &str = "A valid integer is required.";
pub const INVALID_NUMBER: &str = "A valid number is required.";

/// How a write treats fields missing from the payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// POST: required fields must be present.
    Create,
    /// PUT: required fields must be present; omitted optional fields keep their value.
    Replace,
    /// PATCH: every field is optional.
    Partial,
}

impl WriteMode {
    pub fn requires_all(self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

/// Distinguish a missing field (`None`) from an explicit `null` (`Some(Value::Null)`).
///
/// Use with `#[serde(default, deserialize_with = "present")]`.
pub fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Integer from a JSON number (integral floats allowed) or a numeric string.
pub fn parse_integer(value: &Value) -> Result<i64, &'static str> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                _ => Err(INVALID_INTEGER),
            }
        }
        Value::String(s) => strip_zero_fraction(s.trim())
            .parse::<i64>()
            .map_err(|_| INVALID_INTEGER),
        _ => Err(INVALID_INTEGER),
    }
}

/// `"5.0"`, `"5."` and `"5.000"` all read as `"5"`.
fn strip_zero_fraction(s: &str) -> &str {
    match s.split_once('.') {
        Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole,
        _ => s,
    }
}

/// Decimal from a JSON number or a numeric string.
pub fn parse_decimal(value: &Value) -> Result<Decimal, &'static str> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(INVALID_NUMBER),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| INVALID_NUMBER)
}

/// Optional free-text field: `null` clears it, strings are kept as given.
pub fn parse_optional_string(value: &Value, max_len: usize) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => {
            check_length(s, max_len)?;
            Ok(Some(s.clone()))
        }
        _ => Err(INVALID_STRING.to_string()),
    }
}

/// Required, non-blank text field. Surrounding whitespace is trimmed.
pub fn parse_required_string(value: &Value, max_len: usize) -> Result<String, String> {
    match value {
        Value::Null => Err(NOT_NULL.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Err(NOT_BLANK.to_string());
            }
            check_length(trimmed, max_len)?;
            Ok(trimmed.to_string())
        }
        _ => Err(INVALID_STRING.to_string()),
    }
}

fn check_length(s: &str, max_len: usize) -> Result<(), String> {
    if s.chars().count() > max_len {
        return Err(format!("Ensure this field has no more than {max_len} characters."));
    }
    Ok(())
}

/// JSON type name used in "incorrect type" messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
