//! Namespace and event-name addressing.
//!
//! Names and namespace segments may only contain ASCII letters, digits and
//! underscores. Invalid names are rejected, never coerced.

use crate::errors::{ErrorDomain, FrameworkError};
use thiserror::Error;

/// Errors raised while validating event addresses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A name or namespace segment is empty or has a forbidden character.
    #[error("Event name or a namespace part must contain only letters, numbers or underscores (got '{name}').")]
    InvalidName { name: String },

    /// A combined namespace failed validation.
    #[error("Namespace '{namespace}' is not valid: {reason}")]
    InvalidNamespace { namespace: String, reason: String },
}

impl From<PathError> for FrameworkError {
    fn from(error: PathError) -> Self {
        let value = match &error {
            PathError::InvalidName { name } => serde_json::Value::String(name.clone()),
            PathError::InvalidNamespace { namespace, .. } => {
                serde_json::Value::String(namespace.clone())
            }
        };
        FrameworkError::validation(ErrorDomain::Emitter, error.to_string())
            .with_context("value", value)
    }
}

/// Fails with [`PathError::InvalidName`] unless `name` is a non-empty
/// identifier made of `[a-zA-Z0-9_]`.
pub fn assert_valid_name(name: &str) -> Result<(), PathError> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(PathError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Validates every segment of a namespace. An empty namespace is valid.
pub fn assert_valid_namespace<S: AsRef<str>>(segments: &[S]) -> Result<(), PathError> {
    for segment in segments {
        assert_valid_name(segment.as_ref()).map_err(|_| PathError::InvalidNamespace {
            namespace: join(segments),
            reason: format!("segment '{}' is not a valid name", segment.as_ref()),
        })?;
    }
    Ok(())
}

/// Builds the dotted path of `name` under `namespace`.
///
/// Returns `name` alone for an empty namespace and the joined namespace alone
/// for an empty name.
pub fn build_path<S: AsRef<str>>(namespace: &[S], name: &str) -> String {
    if namespace.is_empty() {
        return name.to_string();
    }
    let joined = join(namespace);
    if name.is_empty() {
        joined
    } else {
        format!("{joined}.{name}")
    }
}

pub fn is_dotted_path(value: &str) -> bool {
    value.contains('.')
}

fn join<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|segment| segment.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_valid_names() {
        for name in ["start", "tool_call", "A1", "_", "0"] {
            assert!(assert_valid_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "a.b", "with space", "dash-ed", "ünïcode", "*"] {
            assert_eq!(
                assert_valid_name(name),
                Err(PathError::InvalidName {
                    name: name.to_string()
                })
            );
        }
    }

    #[test]
    fn test_namespace_validation() {
        assert!(assert_valid_namespace::<&str>(&[]).is_ok());
        assert!(assert_valid_namespace(&["agent", "tool_calling"]).is_ok());

        let error = assert_valid_namespace(&["agent", "bad-part"]).unwrap_err();
        assert!(matches!(
            error,
            PathError::InvalidNamespace { ref namespace, .. } if namespace == "agent.bad-part"
        ));
    }

    #[test]
    fn test_build_path() {
        assert_eq!(build_path::<&str>(&[], "start"), "start");
        assert_eq!(build_path(&["agent", "tool"], "start"), "agent.tool.start");
        assert_eq!(build_path(&["agent", "tool"], ""), "agent.tool");
    }

    #[test]
    fn test_is_dotted_path() {
        assert!(is_dotted_path("agent.start"));
        assert!(!is_dotted_path("start"));
    }

    #[test]
    fn test_path_error_converts_to_validation_error() {
        let error: FrameworkError = assert_valid_name("bad name").unwrap_err().into();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert!(error.is_fatal());
        assert!(!error.is_retryable());
    }
}
