//! Error types for clibars.
//!
//! This module defines a unified error enum covering the whole variable
//! resolution pipeline: template scanning, the static store, dynamic
//! evaluation, prompting and rendering, plus configuration and I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a successful run.
pub const EXIT_SUCCESS: u8 = 0;

/// Exit code for any fatal failure.
pub const EXIT_FAILURE: u8 = 1;

/// Exit code for usage errors (bad arguments, invalid variable names).
pub const EXIT_USAGE: u8 = 2;

/// Unified error type for clibars.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// The template could not be parsed by the templating engine.
    #[error("Template syntax error: {0}")]
    TemplateSyntax(String),

    /// The template parsed but failed to render.
    #[error("Template render error: {0}")]
    Render(String),

    /// The static store file exists but is not a JSON object.
    #[error("Static store {path:?} is corrupt: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    /// A variable name does not satisfy the identifier grammar.
    #[error("\"{0}\" is not a valid variable name")]
    InvalidName(String),

    /// A variable already exists with a different value.
    #[error("\"{name}\" already in store with value {existing}, refusing to overwrite with {requested}")]
    DuplicateName {
        name: String,
        existing: String,
        requested: String,
    },

    /// A variable is not present in the static store.
    #[error("Variable name \"{0}\" is not in storage")]
    NotFound(String),

    /// The dynamic computation unit failed.
    #[error("Dynamic evaluation failed: {0}")]
    DynamicEvaluation(String),

    /// Required variables have no value and prompting is disabled.
    #[error("Missing {}", quoted_list(.0))]
    MissingVariables(Vec<String>),

    /// Interactive input failed or was closed without a default.
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::InvalidName(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }

    /// Build a `MissingVariables` error; names are sorted and deduplicated.
    pub fn missing<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        AppError::MissingVariables(names)
    }
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variables_sorted() {
        let err = AppError::missing(["c", "a", "b", "a"]);
        match &err {
            AppError::MissingVariables(names) => assert_eq!(names, &["a", "b", "c"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "Missing 'a', 'b', 'c'");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::InvalidName("1".into()).exit_code(), EXIT_USAGE);
        assert_eq!(AppError::NotFound("x".into()).exit_code(), EXIT_FAILURE);
        assert_eq!(AppError::missing(["x"]).exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn test_json_error_conversion() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
