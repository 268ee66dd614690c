//! Error types for reconciliation.
//!
//! These are the errors that stop a pass before anything is sent to the
//! remote interpreter: bad declarations, bad scopes, unreadable documents.
//! Failures reported *by* the interpreter are not errors here; they are
//! classified into [`crate::Classification`] and surfaced in the pass report.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while preparing or running a reconciliation pass.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more declared fields failed their schema checks
    #[error("invalid declaration for {resource}: {}", problems.join("; "))]
    Validation {
        /// Identifier of the offending resource
        resource: String,
        /// Every failed check, in schema order
        problems: Vec<String>,
    },

    /// Scope kind outside of cell, cluster, node and server
    #[error("unknown scope kind: {0}")]
    UnknownScope(String),

    /// A scope kind was given without the identity component it needs
    #[error("scope {kind} requires a {component}")]
    MissingScopeComponent {
        /// Scope kind being derived
        kind: String,
        /// Missing identity component (cell, cluster, node or server)
        component: &'static str,
    },

    /// The configuration document exists but could not be parsed
    #[error("malformed document {}: {message}", path.display())]
    MalformedDocument {
        /// Path of the document
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The resource kind cannot perform the requested operation
    #[error("{resource}: {operation} is not supported")]
    Unsupported {
        /// Identifier of the resource
        resource: String,
        /// Operation that was requested
        operation: String,
    },

    /// The script runner could not run the payload at all
    #[error("interpreter failed to run: {message}")]
    Runner {
        /// What went wrong while spawning or waiting
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a validation error from collected problems.
    pub fn validation(resource: impl Into<String>, problems: Vec<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            problems,
        }
    }

    /// Build an unsupported-operation error.
    pub fn unsupported(resource: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            resource: resource.into(),
            operation: operation.into(),
        }
    }

    /// Whether this error is a problem with the declaration itself.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::UnknownScope(_) | Self::MissingScopeComponent { .. }
        )
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_problems() {
        let err = Error::validation(
            "jdbc_provider:Oracle",
            vec!["name must not be empty".into(), "scope is invalid".into()],
        );
        assert_eq!(
            err.to_string(),
            "invalid declaration for jdbc_provider:Oracle: name must not be empty; scope is invalid"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_runner_error_is_not_validation() {
        let err = Error::Runner {
            message: "spawn failed".into(),
        };
        assert!(!err.is_validation());
    }
}
