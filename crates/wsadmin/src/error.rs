//! Error types for wsadmin operations.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while reading documents or running wsadmin.
#[derive(Debug, Error)]
pub enum Error {
    /// The wsadmin launcher is not where the profile says it is
    #[error("wsadmin not found at {}", .0.display())]
    WsadminNotFound(PathBuf),

    /// The interpreter process could not be started
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that was being started
        program: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// The interpreter was killed after running past its timeout
    #[error("wsadmin did not finish within {}s and was killed", after.as_secs())]
    Timeout {
        /// Configured limit
        after: Duration,
    },

    /// A configuration document exists but is not well-formed XML
    #[error("malformed document {}: {message}", path.display())]
    Malformed {
        /// Path of the document
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for wsadmin operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for declarative::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Malformed { path, message } => Self::MalformedDocument { path, message },
            Error::Io(e) => Self::Io(e),
            other => Self::Runner {
                message: other.to_string(),
            },
        }
    }
}
