//! Field-level validators for device registrations.
//!
//! Everything here is pure: no storage or HTTP types, so the rules can be
//! exercised directly in unit tests.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Largest value a device_id column can hold
pub const BIGINT_MAX_VALUE: i64 = i64::MAX;

/// Maximum length of a device display name
pub const NAME_MAX_LENGTH: usize = 255;

/// iOS device tokens are 256-bit values, hex encoded
static APNS_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{64}$").expect("valid APNS token pattern"));

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_UNIQUE: &str = "This field must be unique.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("ValidationError Device ID is not a valid hex number")]
    NotHex,

    #[error("ValidationError Device ID is out of range")]
    OutOfRange,

    #[error("Registration ID (device token) is invalid")]
    InvalidApnsToken,

    #[error("Must be a valid boolean.")]
    NotBoolean,

    #[error("Must be a valid UUID.")]
    NotUuid,

    #[error("Ensure this field has no more than {0} characters.")]
    TooLong(usize),
}

/// Validation messages collected per field, in the order they were found
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Parse a hex-encoded integer such as `0x1A`, `1a` or `-0xff`.
///
/// Surrounding whitespace, a sign, a `0x` prefix and single underscores
/// between digits (or right after the prefix) are accepted. The result must fit a signed 64-bit column.
pub fn parse_hex_integer(input: &str) -> Result<i64, FieldError> {
    let trimmed = input.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        // One underscore may follow the base prefix
        Some(rest) => rest.strip_prefix('_').unwrap_or(rest),
        None => unsigned,
    };

    let well_formed = !digits.is_empty()
        && !digits.starts_with('_')
        && !digits.ends_with('_')
        && !digits.contains("__")
        && digits.chars().all(|c| c.is_ascii_hexdigit() || c == '_');
    if !well_formed {
        return Err(FieldError::NotHex);
    }

    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    // Only overflow can fail past this point
    let magnitude = u128::from_str_radix(&cleaned, 16).map_err(|_| FieldError::OutOfRange)?;
    if magnitude > BIGINT_MAX_VALUE as u128 + 1 {
        return Err(FieldError::OutOfRange);
    }

    let value = if negative {
        -(magnitude as i128)
    } else {
        magnitude as i128
    };
    i64::try_from(value).map_err(|_| FieldError::OutOfRange)
}

/// Validate a GCM `device_id` wire value. Only strings are accepted.
pub fn validate_hex_device_id(value: &Value) -> Result<i64, FieldError> {
    match value {
        Value::String(s) => parse_hex_integer(s),
        _ => Err(FieldError::NotHex),
    }
}

/// Validate an APNS `device_id` wire value
pub fn validate_uuid_device_id(value: &Value) -> Result<Uuid, FieldError> {
    match value {
        Value::String(s) => Uuid::parse_str(s.trim()).map_err(|_| FieldError::NotUuid),
        _ => Err(FieldError::NotUuid),
    }
}

/// Check an APNS device token: exactly 64 hex characters
pub fn validate_apns_token(token: &str) -> Result<(), FieldError> {
    if APNS_TOKEN_RE.is_match(token) && token.len() == 64 {
        Ok(())
    } else {
        Err(FieldError::InvalidApnsToken)
    }
}

/// Coerce a wire value to a boolean
pub fn parse_bool(value: &Value) -> Result<bool, FieldError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(FieldError::NotBoolean),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(FieldError::NotBoolean),
        },
        _ => Err(FieldError::NotBoolean),
    }
}

/// Validate a display name; surrounding whitespace is dropped
pub fn validate_name(name: &str) -> Result<String, FieldError> {
    let name = name.trim();
    if name.chars().count() > NAME_MAX_LENGTH {
        return Err(FieldError::TooLong(NAME_MAX_LENGTH));
    }
    Ok(name.to_string())
}
