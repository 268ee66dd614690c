//! Resource trait for declarative reconciliation
//!
//! A Resource is one declared remote configuration object. It knows how to
//! read its current state, record what differs, and describe the remote
//! operations needed to converge. It never runs anything itself; the
//! [`crate::Reconciler`] decides what runs and when.

use crate::changeset::{ChangeSet, ChangeSetBuilder};
use crate::context::ApplyContext;
use crate::error::{Error, Result};
use crate::script::Script;
use crate::types::{CurrentState, Ensure};
use std::fmt;

/// Core trait for declarative resources
///
/// # Example
///
/// ```ignore
/// use declarative::{
///     ApplyContext, ChangeSet, ChangeSetBuilder, CurrentState, Resource, Result, Script,
/// };
///
/// #[derive(Debug)]
/// struct Heap { server: String, max: i64 }
///
/// impl Resource for Heap {
///     fn id(&self) -> String { self.server.clone() }
///     fn description(&self) -> String { format!("JVM heap of {}", self.server) }
///     fn resource_type(&self) -> &'static str { "heap" }
///
///     fn read_current(&self, ctx: &ApplyContext) -> Result<Option<CurrentState>> {
///         // parse the server document below ctx.document_root
///         Ok(Some(CurrentState::new().with("max", "256")))
///     }
///
///     fn record_changes(&self, builder: &mut ChangeSetBuilder) {
///         builder.set("max", self.max);
///     }
///
///     fn create_script(&self) -> Result<Script> { unimplemented!() }
///     fn update_script(&self, changes: &ChangeSet) -> Result<Script> { unimplemented!() }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique identifier for this resource
    ///
    /// Stable across runs, e.g. "jdbc_provider:cell=C,node=N:Oracle".
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category, used for grouping and filtering
    fn resource_type(&self) -> &'static str;

    /// Whether the object should exist
    fn ensure(&self) -> Ensure {
        Ensure::Present
    }

    /// Read the current state of the remote object.
    ///
    /// Returns `Ok(None)` when the object does not exist, including when
    /// its backing document is missing. Unparseable documents are errors.
    fn read_current(&self, ctx: &ApplyContext) -> Result<Option<CurrentState>>;

    /// Record every declared attribute on the builder.
    ///
    /// Called once per pass, only for present objects.
    fn record_changes(&self, builder: &mut ChangeSetBuilder);

    /// Operations that create the object with all declared attributes
    fn create_script(&self) -> Result<Script>;

    /// Operations that apply a non-empty change set in one batch
    fn update_script(&self, changes: &ChangeSet) -> Result<Script>;

    /// Operations that remove the object
    fn destroy_script(&self) -> Result<Script> {
        Err(Error::unsupported(self.id(), "destroy"))
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension trait for working with resources
pub trait ResourceExt {
    /// Build the change set against an observed state
    fn pending_changes(&self, current: &CurrentState) -> ChangeSet;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn pending_changes(&self, current: &CurrentState) -> ChangeSet {
        let mut builder = ChangeSetBuilder::new(current);
        self.record_changes(&mut builder);
        builder.finish()
    }
}
