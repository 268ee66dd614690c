//! Core types for declarative resource reconciliation

use crate::changeset::{ChangeSet, PendingChange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::process::Output;

/// A single attribute value, either declared or observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
    /// Unordered membership (group members, role names)
    List(Vec<String>),
    /// Ordered key/value pairs (custom properties)
    Pairs(Vec<(String, String)>),
}

impl AttrValue {
    /// Plain text form, as it appears in configuration documents.
    ///
    /// Lists and pairs are flattened with spaces; they are never compared
    /// through this form.
    pub fn as_text(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Str(s) => s.clone(),
            Self::List(items) => items.join(" "),
            Self::Pairs(pairs) => pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Compare a declared value against an observed one.
    ///
    /// Documents store every scalar as text, so `Int(512)` matches
    /// `Str("512")` and `Bool(true)` matches `Str("true")`.
    pub fn matches(&self, observed: &AttrValue) -> bool {
        match (self, observed) {
            (Self::List(a), Self::List(b)) => {
                let mut a = a.clone();
                let mut b = b.clone();
                a.sort();
                a.dedup();
                b.sort();
                b.dedup();
                a == b
            }
            (Self::Pairs(a), Self::Pairs(b)) => a == b,
            (Self::List(_) | Self::Pairs(_), _) | (_, Self::List(_) | Self::Pairs(_)) => false,
            (a, b) => a.as_text() == b.as_text(),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
            Self::Pairs(pairs) => {
                let rendered: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            other => write!(f, "{}", other.as_text()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// Observed attributes of one remote object.
///
/// Built fresh by the state reader on every pass. It is never edited in
/// place; [`CurrentState::with_changes`] produces the successor state after
/// a successful apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentState {
    attrs: BTreeMap<String, AttrValue>,
}

impl CurrentState {
    /// Create an empty state (object present, no attributes read)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used by state readers
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Insert only when the reader found a value
    pub fn with_opt(self, name: impl Into<String>, value: Option<impl Into<AttrValue>>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.attrs.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// The state the remote object is in after `changes` were applied
    pub fn with_changes(&self, changes: &ChangeSet) -> Self {
        let mut attrs = self.attrs.clone();
        for change in changes.iter() {
            match change {
                PendingChange::Set { attr, value } => {
                    attrs.insert(attr.clone(), value.clone());
                }
                PendingChange::Members { attr, delta } => {
                    let current = match attrs.get(attr) {
                        Some(AttrValue::List(items)) => items.clone(),
                        _ => Vec::new(),
                    };
                    attrs.insert(attr.clone(), AttrValue::List(delta.apply_to(&current)));
                }
            }
        }
        Self { attrs }
    }
}

/// Whether the declared object should exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

/// States a resource moves through during one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassState {
    Unchecked,
    Absent,
    Present,
    PendingApply,
    Unchanged,
    Applied,
    Failed,
    /// Script emitted but not run (dry run)
    Skipped,
}

impl PassState {
    /// Whether the pass ends in this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Applied | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unchecked => "unchecked",
            Self::Absent => "absent",
            Self::Present => "present",
            Self::PendingApply => "pending-apply",
            Self::Unchanged => "unchanged",
            Self::Applied => "applied",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was removed
    Removed,
    /// Apply failed
    Failed {
        error: String,
        /// A later pass is expected to succeed once a dependency converges
        retryable: bool,
        /// Remediation advice for the operator
        hint: Option<String>,
    },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }

    /// Check if the result is a failure that aborts the run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Failed {
                retryable: false,
                ..
            }
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Failures expected to clear on a later run
    pub deferred: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if execution had no fatal failures
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.created
            + self.modified
            + self.removed
            + self.skipped
            + self.failed
            + self.deferred
            + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.deferred += other.deferred;
        self.no_change += other.no_change;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed {
                retryable: true, ..
            } => self.deferred += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Emit scripts but never run them
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Output from one interpreter invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

impl CommandOutput {
    /// Successful output with the given text on stdout (mostly for tests and fakes)
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into().into_bytes(),
            stderr: Vec::new(),
            success: true,
            code: Some(0),
        }
    }

    /// Failed output with the given exit code and text on stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: stderr.into().into_bytes(),
            success: false,
            code: Some(code),
        }
    }

    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Stdout followed by stderr, the way an operator would see it
    pub fn combined(&self) -> String {
        let stdout = self.stdout_str();
        let stderr = self.stderr_str();
        match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
            (_, true) => stdout,
            (true, false) => stderr,
            (false, false) => format!("{}\n{}", stdout.trim_end(), stderr),
        }
    }
}
