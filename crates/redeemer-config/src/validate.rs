//! Validation helpers for operator-supplied values.

use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Parse the downstream endpoint, accepting only absolute http(s) URLs.
///
/// # Errors
///
/// Returns an error when the input is not a URL or uses another scheme.
pub fn parse_api_url(input: &str) -> ConfigResult<Url> {
    let url = Url::parse(input.trim()).map_err(|_| ConfigError::InvalidField {
        field: "api_url",
        value: Some(input.to_string()),
        reason: "not_a_url",
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::InvalidField {
            field: "api_url",
            value: Some(input.to_string()),
            reason: "unsupported_scheme",
        }),
    }
}

/// Ensure the API key can be sent as a header value.
///
/// # Errors
///
/// Returns an error when the key is blank or contains control characters.
pub fn validate_api_key(raw: &str) -> ConfigResult<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidField {
            field: "api_key",
            value: None,
            reason: "empty",
        });
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ConfigError::InvalidField {
            field: "api_key",
            value: None,
            reason: "control_characters",
        });
    }
    Ok(trimmed)
}

/// Ensure the folder prefix is usable both remotely and as a local subdirectory.
///
/// # Errors
///
/// Returns an error when the folder is blank, absolute, or contains `..`.
pub fn validate_container_folder(raw: &str) -> ConfigResult<&str> {
    let trimmed = raw.trim();
    let invalid = |reason| ConfigError::InvalidField {
        field: "container_folder",
        value: Some(raw.to_string()),
        reason,
    };
    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }
    if trimmed.starts_with('/') || trimmed.starts_with('\\') {
        return Err(invalid("absolute"));
    }
    if trimmed.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(invalid("parent_traversal"));
    }
    Ok(trimmed)
}
