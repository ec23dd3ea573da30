//! Error types for the firewall rule reconciler.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration, port parsing, `gcloud` invocation and reconciliation.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the firewall rule reconciler.
#[derive(Debug, Error)]
pub enum FirewallError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Port list parsing errors.
    #[error("Port error: {0}")]
    Port(#[from] PortParseError),

    /// `gcloud` invocation errors.
    #[error("gcloud error: {0}")]
    Gcloud(#[from] GcloudError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The rule file was not found.
    #[error("Rule file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The rule file could not be parsed.
    #[error("Failed to parse rule file: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Rule validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// A required rule field was given neither on the command line nor in a file.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },
}

/// A port token that could not be expanded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortParseError {
    /// A range bound is not an integer port number.
    #[error("invalid port range '{token}': '{bound}' is not a port number")]
    InvalidBound {
        /// The full token.
        token: String,
        /// The offending bound.
        bound: String,
    },

    /// A range with more than two bounds, such as `1-2-3`.
    #[error("invalid port range '{token}': expected START-END")]
    MalformedRange {
        /// The full token.
        token: String,
    },
}

/// `gcloud` invocation errors.
#[derive(Debug, Error)]
pub enum GcloudError {
    /// The `gcloud` binary could not be started.
    #[error("failed to run {program}: {message}")]
    SpawnFailed {
        /// Program that was executed.
        program: String,
        /// Description of the spawn failure.
        message: String,
    },

    /// The command did not finish in time.
    #[error("'{command}' timed out after {timeout_secs}s")]
    Timeout {
        /// Rendered command line.
        command: String,
        /// Timeout that elapsed.
        timeout_secs: u64,
    },

    /// The command exited with a non-zero status.
    #[error("'{command}' failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The command output was not the JSON we expected.
    #[error("invalid JSON from gcloud: {message}")]
    InvalidResponse {
        /// Description of the decoding problem.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The existing rule has a direction other than `INGRESS`.
    #[error("cannot mutate a non-ingress rule: '{name}' has direction {direction}")]
    NonIngressRule {
        /// Name of the rule.
        name: String,
        /// Direction reported by the provider.
        direction: String,
    },
}

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, FirewallError>;

impl FirewallError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the error was raised before any remote call was made.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a missing field error.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

impl GcloudError {
    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
