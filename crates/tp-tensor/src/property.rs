use crate::error::{Result, TensorError};

/// Parse a boolean property value: `true`/`1`/`yes` or `false`/`0`/`no`,
/// case-insensitive.
pub fn parse_bool(property: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(TensorError::InvalidValue {
            property: property.to_string(),
            value: value.to_string(),
        }),
    }
}
