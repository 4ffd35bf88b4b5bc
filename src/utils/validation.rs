//! Input validation primitives.
//!
//! Helpers for reading attribute values out of a definition document:
//! - requiring non-blank values
//! - reading `true`/`false` flags
//! - reading whole-second durations with a default

use crate::error::{Error, Result};

/// Require an attribute to be present and non-blank after trimming.
///
/// Returns the value untrimmed; blank only decides presence.
pub fn require_attribute<'a>(value: Option<&'a str>, element: &str, attribute: &str) -> Result<&'a str> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::pipeline_missing_attribute(element, attribute)),
    }
}

/// A flag is set only when its value is exactly `true`.
pub fn flag(value: Option<&str>) -> bool {
    value == Some("true")
}

/// Parse a whole number of seconds, falling back to `default` when absent.
pub fn seconds(value: Option<&str>, attribute: &str, default: u32) -> Result<u32> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
            Error::pipeline_malformed(
                Some(attribute.to_string()),
                Some(raw.to_string()),
                format!("\"{}\" is not a whole number of seconds: {}", attribute, e),
            )
        }),
    }
}
