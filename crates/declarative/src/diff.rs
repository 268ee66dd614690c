//! Diff computation for resources
//!
//! A diff is a read-only pass: current state is read and the change set is
//! built, but no script is emitted or run.

use crate::changeset::{ChangeSet, PendingChange};
use crate::context::ApplyContext;
use crate::error::Result;
use crate::resource::{Resource, ResourceExt};
use crate::types::{CurrentState, Ensure};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a pass would do to one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffKind {
    Create,
    Update,
    Destroy,
}

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    pub kind: DiffKind,
    /// Observed state (absent for creates)
    pub current: Option<CurrentState>,
    /// Pending attribute changes (for updates)
    pub changes: ChangeSet,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    pub fn from_resource(resource: &dyn Resource, ctx: &ApplyContext) -> Result<Option<Self>> {
        let current = resource.read_current(ctx)?;

        let (kind, changes) = match (&current, resource.ensure()) {
            (None, Ensure::Absent) => return Ok(None),
            (None, Ensure::Present) => (
                DiffKind::Create,
                resource.pending_changes(&CurrentState::new()),
            ),
            (Some(_), Ensure::Absent) => (DiffKind::Destroy, ChangeSet::default()),
            (Some(state), Ensure::Present) => {
                let changes = resource.pending_changes(state);
                if changes.is_empty() {
                    return Ok(None);
                }
                (DiffKind::Update, changes)
            }
        };

        Ok(Some(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            kind,
            current,
            changes,
        }))
    }

    pub fn is_addition(&self) -> bool {
        self.kind == DiffKind::Create
    }

    pub fn is_removal(&self) -> bool {
        self.kind == DiffKind::Destroy
    }

    pub fn is_modification(&self) -> bool {
        self.kind == DiffKind::Update
    }

    /// One line per pending change: `attr: old -> new`
    pub fn change_lines(&self) -> Vec<String> {
        self.changes
            .iter()
            .map(|change| match change {
                PendingChange::Set { attr, value } => {
                    let old = self
                        .current
                        .as_ref()
                        .and_then(|c| c.get(attr))
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "(unset)".to_string());
                    format!("{attr}: {old} -> {value}")
                }
                PendingChange::Members { attr, delta } => {
                    let mut parts = Vec::new();
                    if !delta.additions.is_empty() {
                        parts.push(format!("+{}", delta.additions.join(" +")));
                    }
                    if !delta.removals.is_empty() {
                        parts.push(format!("-{}", delta.removals.join(" -")));
                    }
                    format!("{attr}: {}", parts.join(" "))
                }
            })
            .collect()
    }
}

/// Result of diffing one resource: a diff, nothing to do, or a read failure
pub type DiffOutcome = (String, Result<Option<ResourceDiff>>);

/// Compute diffs for a list of resources
///
/// Every resource gets an entry so read failures are not lost.
pub fn compute_diffs(resources: &[Box<dyn Resource>], ctx: &ApplyContext) -> Vec<DiffOutcome> {
    resources
        .iter()
        .map(|r| (r.id(), ResourceDiff::from_resource(r.as_ref(), ctx)))
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs<'a>(diffs: impl IntoIterator<Item = &'a ResourceDiff>) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.kind {
                DiffKind::Create => summary.additions += 1,
                DiffKind::Destroy => summary.removals += 1,
                DiffKind::Update => summary.modifications += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type<'a>(
    diffs: impl IntoIterator<Item = &'a ResourceDiff>,
) -> HashMap<String, Vec<&'a ResourceDiff>> {
    let mut groups: HashMap<String, Vec<&ResourceDiff>> = HashMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
