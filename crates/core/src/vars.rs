//! Variable names and values.
//!
//! Names must satisfy the identifier grammar (letters, digits and
//! underscores, not starting with a digit). Values are arbitrary JSON.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};

/// Mapping from variable name to value, ordered by name.
pub type VarMap = BTreeMap<String, Value>;

/// Validate a variable name.
///
/// Surrounding whitespace is stripped; the stripped form is returned when it
/// is an identifier. Anything else is rejected, never coerced.
///
/// # Example
/// ```
/// use clibars_core::vars::sanitize_name;
///
/// assert_eq!(sanitize_name("  email ").unwrap(), "email");
/// assert!(sanitize_name("1st").is_err());
/// ```
pub fn sanitize_name(name: &str) -> AppResult<String> {
    let stripped = name.trim();
    if is_identifier(stripped) {
        Ok(stripped.to_string())
    } else {
        Err(AppError::InvalidName(stripped.to_string()))
    }
}

/// Returns true if `s` is a non-empty identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// Interpret user input as a structured literal.
///
/// Numbers, booleans, `null`, lists and mappings are parsed as JSON; any
/// input that is not a valid literal is kept as the raw string. This never
/// fails.
///
/// # Example
/// ```
/// use clibars_core::vars::parse_literal;
/// use serde_json::json;
///
/// assert_eq!(parse_literal("123"), json!(123));
/// assert_eq!(parse_literal(r#"["a"]"#), json!(["a"]));
/// assert_eq!(parse_literal("Loic Coyle"), json!("Loic Coyle"));
/// ```
pub fn parse_literal(input: &str) -> Value {
    match serde_json::from_str::<Value>(input.trim()) {
        Ok(value) => value,
        Err(_) => Value::String(input.to_string()),
    }
}

/// Human-readable form of a value: strings raw, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
