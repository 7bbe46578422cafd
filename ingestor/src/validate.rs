use crate::errors::{Error, Result};
use crate::model::ReadingValue;

/// Upper bound on the encoded payload, in characters.
pub const MAX_VALUE_CHARS: usize = 65_535;

/// A reading that passed boundary validation, with its payload already encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReading<'a> {
    pub device_id: &'a str,
    pub device_name: &'a str,
    pub encoded_value: String,
}

/// Validates an incoming reading and encodes its payload.
///
/// Identifiers are trimmed; both must be non-empty afterwards.
pub fn validate<'a>(
    device_id: &'a str,
    device_name: &'a str,
    value: &ReadingValue,
) -> Result<ValidReading<'a>> {
    let device_id = device_id.trim();
    if device_id.is_empty() {
        return Err(Error::validation("device_id must be a non-empty string"));
    }

    let device_name = device_name.trim();
    if device_name.is_empty() {
        return Err(Error::validation("device_name must be a non-empty string"));
    }

    let encoded_value = value.encode();
    let len = encoded_value.chars().count();
    if len > MAX_VALUE_CHARS {
        return Err(Error::Validation(format!(
            "Data value too large ({} characters). Maximum size is {} characters.",
            len, MAX_VALUE_CHARS
        )));
    }

    Ok(ValidReading {
        device_id,
        device_name,
        encoded_value,
    })
}
