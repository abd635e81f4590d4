//! # Error Handling
//!
//! This module defines the centralized error type for the scheduler. It uses
//! `thiserror` to build a single `Error` enum covering every failure mode of
//! the pipeline, each variant carrying enough context for an operator to act
//! on it.
//!
//! ## Propagation
//!
//! Errors fall into two groups:
//!
//! - **Hard failures** raised by bucket building and override application
//!   (`DataIntegrity`, `SourceDataMissing`, `MissingErrata`,
//!   `DirectiveTargetNotFound`, `DirectiveConflict`, `Assertion`). These stop
//!   the pipeline immediately so a broken partition never reaches the replay.
//!
//! - **Consistency findings** accumulated by the replay validator. Findings are
//!   plain values until the whole replay has run; they are then raised once as
//!   `Error::Consistency` carrying the complete report.
//!
//! The `Result` type alias is used throughout the library.

use thiserror::Error;

use crate::phases::replay::ConsistencyReport;

/// An advisory that referenced binaries the catalog does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenAdvisory {
    /// Advisory name.
    pub advisory: String,
    /// Binary identities that could not be resolved.
    pub missing: Vec<String>,
}

impl std::fmt::Display for BrokenAdvisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.advisory, self.missing.join(", "))
    }
}

fn join_display<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Main error type for scheduler operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while parsing the scheduler configuration.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A package identity string could not be parsed.
    #[error("Invalid package identity '{value}': {message}")]
    InvalidNevra { value: String, message: String },

    /// The package catalog is internally inconsistent.
    #[error("Package catalog error: {message}")]
    Catalog { message: String },

    /// One or more advisories reference binaries unknown to the catalog.
    #[error("Advisories reference unknown packages: {}", join_display(advisories))]
    DataIntegrity { advisories: Vec<BrokenAdvisory> },

    /// One or more advisories carry no usable package data.
    #[error("Source data missing for advisories: {}", advisories.join(", "))]
    SourceDataMissing { advisories: Vec<String> },

    /// Source packages that are neither golden nor covered by any advisory.
    #[error("Missing errata for packages: {}", packages.join(", "))]
    MissingErrata { packages: Vec<String> },

    /// An override directive names a bucket, advisory or package that does
    /// not exist in the current partition.
    #[error("Directive {directive} target not found: {message}")]
    DirectiveTargetNotFound { directive: String, message: String },

    /// An override directive would clobber existing state.
    #[error("Directive {directive} conflicts with the current plan: {message}")]
    DirectiveConflict { directive: String, message: String },

    /// An internal consistency assertion failed.
    #[error("Assertion failed: {message}")]
    Assertion { message: String },

    /// The replay validator found inconsistencies in the ordered plan.
    #[error("{0}")]
    Consistency(Box<ConsistencyReport>),

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a `DirectiveTargetNotFound` error.
    pub fn target_not_found(directive: &str, message: impl Into<String>) -> Self {
        Error::DirectiveTargetNotFound {
            directive: directive.to_string(),
            message: message.into(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
