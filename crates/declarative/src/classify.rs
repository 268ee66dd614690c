//! Output classification
//!
//! The remote interpreter has no structured error channel, so results are
//! judged from text. The rules are data: a table of recoverable
//! signatures, a list of generic error markers and an allow-list of lines
//! that mention a marker without being an error.

use crate::types::CommandOutput;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a failure is expected to clear without operator action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoverableReason {
    /// Something the object depends on has not converged yet
    DependencyNotReady,
    /// The object was created by someone else in the meantime
    AlreadyExists,
    Other(String),
}

impl fmt::Display for RecoverableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DependencyNotReady => f.write_str("dependency not ready"),
            Self::AlreadyExists => f.write_str("already exists"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

/// Why a pass was aborted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatalReason {
    MalformedDocument(String),
    UnknownScope(String),
    /// The interpreter could not be run, crashed, timed out or exited non-zero
    InterpreterCrash(String),
    /// Output contained an error marker that no rule explains
    UnrecognizedOutput(String),
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedDocument(msg) => write!(f, "malformed document: {msg}"),
            Self::UnknownScope(scope) => write!(f, "unknown scope: {scope}"),
            Self::InterpreterCrash(msg) => write!(f, "interpreter failure: {msg}"),
            Self::UnrecognizedOutput(line) => write!(f, "unrecognized output: {line}"),
        }
    }
}

/// Outcome of one script execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Success,
    Recoverable {
        reason: RecoverableReason,
        hint: String,
    },
    Fatal(FatalReason),
}

impl Classification {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A known output substring and what it means
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Matched case-insensitively against the combined output
    pub pattern: String,
    pub reason: RecoverableReason,
    /// Human-readable remediation
    pub hint: String,
}

impl Signature {
    pub fn new(pattern: &str, reason: RecoverableReason, hint: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            reason,
            hint: hint.to_string(),
        }
    }
}

/// Data-driven output classifier
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    recoverable: Vec<Signature>,
    error_markers: Vec<String>,
    allow: Vec<String>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recoverable signature; earlier signatures win
    pub fn recoverable(mut self, signature: Signature) -> Self {
        self.recoverable.push(signature);
        self
    }

    /// Add a substring that marks a line as an error
    pub fn error_marker(mut self, marker: &str) -> Self {
        self.error_markers.push(marker.to_string());
        self
    }

    /// Add a substring that excuses a marked line
    pub fn allow(mut self, pattern: &str) -> Self {
        self.allow.push(pattern.to_string());
        self
    }

    /// Classify interpreter output.
    ///
    /// A run is clean when it exits zero and no line carries an error marker
    /// that the allow-list does not excuse. Otherwise recoverable signatures
    /// are checked first, then a non-zero exit is fatal, then the marked line.
    pub fn classify(&self, output: &CommandOutput) -> Classification {
        let text = output.combined();
        let unexplained = text.lines().find(|line| {
            self.error_markers.iter().any(|m| line.contains(m.as_str()))
                && !self.allow.iter().any(|a| line.contains(a.as_str()))
        });

        if output.success && unexplained.is_none() {
            return Classification::Success;
        }

        let lower = text.to_lowercase();
        if let Some(sig) = self
            .recoverable
            .iter()
            .find(|s| lower.contains(&s.pattern.to_lowercase()))
        {
            return Classification::Recoverable {
                reason: sig.reason.clone(),
                hint: sig.hint.clone(),
            };
        }

        if !output.success {
            let status = output
                .code
                .map(|c| format!("exit status {c}"))
                .unwrap_or_else(|| "terminated by signal".to_string());
            return Classification::Fatal(FatalReason::InterpreterCrash(status));
        }

        let line = unexplained.unwrap_or_default();
        Classification::Fatal(FatalReason::UnrecognizedOutput(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new()
            .recoverable(Signature::new(
                "invalid parent config id",
                RecoverableReason::DependencyNotReady,
                "node is not federated yet",
            ))
            .recoverable(Signature::new(
                "already exists",
                RecoverableReason::AlreadyExists,
                "object was created concurrently",
            ))
            .error_marker("Exception")
            .allow("NoSuchElementException is expected")
    }

    #[test]
    fn test_clean_output_is_success() {
        let output = CommandOutput::ok("WASX7209I: Connected to process \"dmgr\"\n");
        assert_eq!(classifier().classify(&output), Classification::Success);
    }

    #[test]
    fn test_signature_matches_case_insensitively() {
        let output = CommandOutput::failed(
            105,
            "com.ibm.ws.scripting.ScriptingException: Invalid parent config id",
        );
        match classifier().classify(&output) {
            Classification::Recoverable { reason, hint } => {
                assert_eq!(reason, RecoverableReason::DependencyNotReady);
                assert_eq!(hint, "node is not federated yet");
            }
            other => panic!("expected recoverable, got {other:?}"),
        }
    }

    #[test]
    fn test_nonzero_exit_without_signature_is_fatal() {
        let output = CommandOutput::failed(1, "something odd");
        assert_eq!(
            classifier().classify(&output),
            Classification::Fatal(FatalReason::InterpreterCrash("exit status 1".into()))
        );
    }

    #[test]
    fn test_marker_on_success_is_fatal_unless_allowed() {
        let output = CommandOutput::ok("WASX7017E: Exception received while running file\n");
        assert!(matches!(
            classifier().classify(&output),
            Classification::Fatal(FatalReason::UnrecognizedOutput(_))
        ));

        let output = CommandOutput::ok("note: NoSuchElementException is expected here\n");
        assert_eq!(classifier().classify(&output), Classification::Success);
    }

    #[test]
    fn test_signature_text_in_clean_output_is_success() {
        let output = CommandOutput::ok("Variable APP_HOME already exists in map, value updated\n");
        assert_eq!(classifier().classify(&output), Classification::Success);
    }

    #[test]
    fn test_signature_wins_over_error_marker() {
        let output = CommandOutput::ok("ScriptingException: provider Oracle already exists");
        match classifier().classify(&output) {
            Classification::Recoverable { reason, .. } => {
                assert_eq!(reason, RecoverableReason::AlreadyExists)
            }
            other => panic!("expected recoverable, got {other:?}"),
        }
    }
}
