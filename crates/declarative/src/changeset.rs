//! Change recording
//!
//! The [`ChangeSetBuilder`] sits between the declared attributes and the
//! observed [`CurrentState`]. Setters only record what differs; nothing is
//! sent anywhere until the driver asks for the finished [`ChangeSet`].

use crate::types::{AttrValue, CurrentState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Incremental edit of a membership attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDelta {
    /// desired − current, in declaration order
    pub additions: Vec<String>,
    /// current − desired, in observed order
    pub removals: Vec<String>,
}

impl MemberDelta {
    /// Compute the set difference between desired and current members.
    pub fn compute(desired: &[String], current: &[String]) -> Self {
        let desired_set: BTreeSet<&str> = desired.iter().map(String::as_str).collect();
        let current_set: BTreeSet<&str> = current.iter().map(String::as_str).collect();

        let mut seen = BTreeSet::new();
        let additions = desired
            .iter()
            .filter(|m| !current_set.contains(m.as_str()) && seen.insert(m.as_str()))
            .cloned()
            .collect();

        let mut seen = BTreeSet::new();
        let removals = current
            .iter()
            .filter(|m| !desired_set.contains(m.as_str()) && seen.insert(m.as_str()))
            .cloned()
            .collect();

        Self {
            additions,
            removals,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    /// current + additions − removals
    pub fn apply_to(&self, current: &[String]) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for member in current.iter().chain(self.additions.iter()) {
            if !self.removals.contains(member) && !result.contains(member) {
                result.push(member.clone());
            }
        }
        result
    }
}

/// One recorded difference between declared and observed state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingChange {
    /// Scalar or whole-value attribute replacement
    Set { attr: String, value: AttrValue },
    /// Membership attribute applied as add/remove operations
    Members { attr: String, delta: MemberDelta },
}

impl PendingChange {
    pub fn attr(&self) -> &str {
        match self {
            Self::Set { attr, .. } | Self::Members { attr, .. } => attr,
        }
    }
}

/// Ordered pending changes for one resource.
///
/// Order is the order the attributes were first set; setting the same
/// attribute again replaces the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    changes: Vec<PendingChange>,
    security: BTreeSet<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingChange> {
        self.changes.iter()
    }

    /// Scalar changes, in recording order
    pub fn sets(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.changes.iter().filter_map(|c| match c {
            PendingChange::Set { attr, value } => Some((attr.as_str(), value)),
            PendingChange::Members { .. } => None,
        })
    }

    /// Membership changes, in recording order
    pub fn memberships(&self) -> impl Iterator<Item = (&str, &MemberDelta)> {
        self.changes.iter().filter_map(|c| match c {
            PendingChange::Members { attr, delta } => Some((attr.as_str(), delta)),
            PendingChange::Set { .. } => None,
        })
    }

    pub fn get(&self, attr: &str) -> Option<&PendingChange> {
        self.changes.iter().find(|c| c.attr() == attr)
    }

    /// Whether any recorded change was marked as security relevant
    pub fn touches_security(&self) -> bool {
        self.changes.iter().any(|c| self.security.contains(c.attr()))
    }

    fn upsert(&mut self, change: PendingChange) {
        match self.changes.iter_mut().find(|c| c.attr() == change.attr()) {
            Some(slot) => *slot = change,
            None => self.changes.push(change),
        }
    }

    fn remove(&mut self, attr: &str) {
        self.changes.retain(|c| c.attr() != attr);
    }
}

/// Records declared attribute values against the observed state
pub struct ChangeSetBuilder<'a> {
    current: &'a CurrentState,
    changes: ChangeSet,
}

impl<'a> ChangeSetBuilder<'a> {
    pub fn new(current: &'a CurrentState) -> Self {
        Self {
            current,
            changes: ChangeSet::default(),
        }
    }

    /// Observed value of an attribute, if the document had one
    pub fn get(&self, attr: &str) -> Option<&AttrValue> {
        self.current.get(attr)
    }

    /// Record a declared value. Equal values record nothing (and drop any
    /// earlier pending value for the same attribute).
    pub fn set(&mut self, attr: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        let unchanged = self.current.get(attr).is_some_and(|c| value.matches(c));
        if unchanged {
            self.changes.remove(attr);
        } else {
            self.changes.upsert(PendingChange::Set {
                attr: attr.to_string(),
                value,
            });
        }
    }

    /// Record a declared value only when one was declared
    pub fn set_opt<V: Into<AttrValue>>(&mut self, attr: &str, value: Option<V>) {
        if let Some(v) = value {
            self.set(attr, v);
        }
    }

    /// Record a declared membership list as additions and removals
    pub fn set_members(&mut self, attr: &str, desired: &[String]) {
        let current: &[String] = match self.current.get(attr) {
            Some(AttrValue::List(items)) => items,
            _ => &[],
        };
        let delta = MemberDelta::compute(desired, current);
        if delta.is_empty() {
            self.changes.remove(attr);
        } else {
            self.changes.upsert(PendingChange::Members {
                attr: attr.to_string(),
                delta,
            });
        }
    }

    /// Mark an attribute as security relevant (changes to it need a refresh)
    pub fn mark_security(&mut self, attr: &str) {
        self.changes.security.insert(attr.to_string());
    }

    pub fn finish(self) -> ChangeSet {
        self.changes
    }
}
