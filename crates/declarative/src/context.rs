//! Pass context and provider traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific interpreter, terminal UI or prompt library.

use crate::error::Result;
use crate::types::{ApplyResult, CommandOutput};
use std::path::Path;

/// Runs a rendered script through the remote interpreter
///
/// Implementations spawn the interpreter once per call and block until it
/// exits (or until their own timeout fires).
pub trait ScriptRunner: Send + Sync {
    /// Run a script body, optionally as another local identity
    fn run(&self, script: &str, run_as: Option<&str>) -> Result<CommandOutput>;
}

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called once before the first resource
    fn on_start(&mut self, count: usize);

    /// Called when starting to reconcile a single resource
    fn on_resource_start(&mut self, id: &str, description: &str);

    /// Called when a resource pass completes
    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult);

    /// Called after the last resource
    fn on_complete(&mut self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_start(&mut self, _count: usize) {}
    fn on_resource_start(&mut self, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult) {}
    fn on_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Context passed explicitly through read, diff, emit and execute
#[derive(Debug, Clone, Copy)]
pub struct ApplyContext<'a> {
    /// Whether this is a dry run (scripts are emitted, never run)
    pub dry_run: bool,
    /// Whether to output verbose information
    pub verbose: bool,
    /// Root directory holding the configuration documents
    pub document_root: &'a Path,
    /// Element and attribute name suffixes stripped before parsing
    pub ignore_suffixes: &'a [String],
    /// Local identity the interpreter runs as
    pub run_as: Option<&'a str>,
}

impl<'a> ApplyContext<'a> {
    /// Create a new context reading documents below `document_root`
    pub fn new(document_root: &'a Path) -> Self {
        Self {
            dry_run: false,
            verbose: false,
            document_root,
            ignore_suffixes: &[],
            run_as: None,
        }
    }

    pub fn with_ignore_suffixes(mut self, suffixes: &'a [String]) -> Self {
        self.ignore_suffixes = suffixes;
        self
    }

    pub fn with_run_as(mut self, user: Option<&'a str>) -> Self {
        self.run_as = user;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Absolute path of a document below the root
    pub fn document(&self, relative: &Path) -> std::path::PathBuf {
        self.document_root.join(relative)
    }
}
