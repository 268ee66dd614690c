//! # Declarative
//!
//! A framework for declarative reconciliation of remote configuration.
//!
//! This crate provides the core abstractions for reading the current state
//! of a remote object, recording what differs from the declaration, and
//! converging it with exactly one batched remote invocation per pass.
//!
//! ## Core Concepts
//!
//! - **Resource**: A declared remote object that can read its state and
//!   describe create/update/destroy operations
//! - **ChangeSet**: Ordered pending attribute changes, last write wins,
//!   membership attributes as add/remove deltas
//! - **Script**: Typed remote operations, rendered by a [`Dialect`]
//! - **Classifier**: Data-driven interpretation of interpreter output
//! - **Reconciler**: Runs one pass per resource, at most one script each
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ApplyContext, Classifier, ExecutionPlan, ExecuteOptions, Reconciler};
//!
//! let classifier = Classifier::new().error_marker("Exception");
//! let reconciler = Reconciler::new(&runner, &dialect, &classifier);
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource(Box::new(my_resource));
//!
//! let ctx = ApplyContext::new(Path::new("/opt/profiles/Dmgr01/config"));
//! let (summary, reports) =
//!     declarative::execute_simple(&plan, &ExecuteOptions::default(), &reconciler, &ctx)?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`ScriptRunner`]: Runs a rendered payload through the interpreter
//! - [`Dialect`]: Renders a [`Script`] for one interpreter
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations

pub mod changeset;
pub mod classify;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod reconcile;
pub mod resource;
pub mod schema;
pub mod scope;
pub mod script;
pub mod types;

// Re-export main types at crate root
pub use changeset::{ChangeSet, ChangeSetBuilder, MemberDelta, PendingChange};
pub use classify::{Classification, Classifier, FatalReason, RecoverableReason, Signature};
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
    ScriptRunner,
};
pub use diff::{DiffKind, DiffOutcome, DiffSummary, ResourceDiff, compute_diffs, group_by_type};
pub use error::{Error, Result};
pub use executor::{execute, execute_simple};
pub use planner::ExecutionPlan;
pub use reconcile::{PassReport, Reconciler};
pub use resource::{BoxedResource, Resource, ResourceExt};
pub use schema::{Check, FieldRule};
pub use scope::{ScopeKind, ScopePath};
pub use script::{Api, Dialect, ObjectRef, Op, Parent, Script, ScriptBuilder};
pub use types::{
    ApplyResult, AttrValue, CommandOutput, CurrentState, Ensure, ExecuteOptions, ExecuteSummary,
    PassState,
};
