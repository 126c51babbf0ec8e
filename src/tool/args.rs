//! Argument validation helpers
//!
//! Shared by every tool before any configuration resolution or network I/O.
//! Checks run in order: required presence, enum membership, then declared
//! type shape. Unknown argument fields are deliberately ignored — callers may
//! send extra context (and always may send `sessionCredentials`).
//!
//! Messages are written for the LLM holding the other end of the transport:
//! they name the offending parameter and the valid values so the next call
//! can be corrected without a round trip to a human.

use serde_json::Value;

use crate::error::{DxError, ErrorKind};

use super::schema::InputSchema;

/// Validate `args` against `schema`.
///
/// # Errors
///
/// Returns an `INVALID_ARGUMENT` error naming the first violation.
pub fn validate_args(args: &Value, schema: &InputSchema) -> Result<(), DxError> {
    let map = match args {
        Value::Object(map) => map,
        Value::Null => {
            return match schema.required.first() {
                Some(name) => Err(missing(name)),
                None => Ok(()),
            };
        }
        _ => {
            return Err(DxError::new(
                ErrorKind::InvalidArgument,
                "Arguments must be a JSON object",
            ));
        }
    };

    // Required presence. An empty or whitespace-only string does not satisfy
    // a required field; identifiers with meaningful blanks still do.
    for name in &schema.required {
        match map.get(name) {
            None | Some(Value::Null) => return Err(missing(name)),
            Some(Value::String(s)) if s.trim().is_empty() => return Err(missing(name)),
            Some(_) => {}
        }
    }

    // Enum membership and type shape for whatever was supplied.
    for (name, prop) in &schema.properties {
        let Some(value) = map.get(name) else { continue };
        if value.is_null() {
            continue;
        }

        if !prop.enum_values.is_empty() {
            let ok = value
                .as_str()
                .is_some_and(|s| prop.enum_values.iter().any(|allowed| allowed == s));
            if !ok {
                return Err(DxError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "{name} must be one of {} (got {value})",
                        prop.enum_values.join(", ")
                    ),
                ));
            }
        }

        if let Some(ty) = prop.schema_type {
            if !ty.matches(value) {
                return Err(DxError::new(
                    ErrorKind::InvalidArgument,
                    format!("{name} must be a {}, got {}", ty.as_str(), type_name(value)),
                ));
            }
        }
    }

    Ok(())
}

/// Check that every name in `names` is present and non-empty.
///
/// # Errors
///
/// Returns an `INVALID_ARGUMENT` error for the first absent name.
pub fn require(args: &Value, names: &[&str]) -> Result<(), DxError> {
    for name in names {
        match args.get(name) {
            None | Some(Value::Null) => return Err(missing(name)),
            Some(Value::String(s)) if s.trim().is_empty() => return Err(missing(name)),
            Some(_) => {}
        }
    }
    Ok(())
}

/// Check enum membership for one field, when present.
///
/// # Errors
///
/// Returns an `INVALID_ARGUMENT` error when the supplied value is outside
/// `allowed`.
pub fn check_enum(args: &Value, field: &str, allowed: &[&str]) -> Result<(), DxError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(value) => {
            let ok = value.as_str().is_some_and(|s| allowed.contains(&s));
            if ok {
                Ok(())
            } else {
                Err(DxError::new(
                    ErrorKind::InvalidArgument,
                    format!("{field} must be one of {} (got {value})", allowed.join(", ")),
                ))
            }
        }
    }
}

/// String argument accessor (trimmed; empty treated as absent).
#[must_use]
pub fn str_arg<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Raw value accessor.
#[must_use]
pub fn value_arg<'a>(args: &'a Value, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

fn missing(name: &str) -> DxError {
    DxError::new(
        ErrorKind::InvalidArgument,
        format!("Missing required argument: {name}"),
    )
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
