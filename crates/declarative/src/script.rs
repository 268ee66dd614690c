//! Remote operation AST
//!
//! Resources describe what they want done as a [`Script`] of typed
//! operations. A [`Dialect`] turns the script into the text its interpreter
//! understands, so quoting lives in exactly one place.

use crate::error::Result;
use crate::scope::ScopePath;
use crate::types::AttrValue;

/// Which admin object a create or invoke goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    /// Task-style commands taking a flattened `-key value` argument list
    AdminTask,
    /// Generic configuration object creation with an attribute list
    AdminConfig,
}

/// Reference to a remote configuration object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRef {
    /// Containment path: the scope's segments, then typed names below it
    Path {
        scope: ScopePath,
        chain: Vec<(String, String)>,
    },
    /// Object stored in an attribute of another object
    Attribute { parent: Box<ObjectRef>, attr: String },
    /// First child object of the given type, optionally the first whose
    /// attribute has the given value
    Child {
        parent: Box<ObjectRef>,
        kind: String,
        filter: Option<(String, String)>,
    },
}

impl ObjectRef {
    /// The scope object itself
    pub fn scope(scope: &ScopePath) -> Self {
        Self::Path {
            scope: scope.clone(),
            chain: Vec::new(),
        }
    }

    /// A named object directly below a scope
    pub fn named(scope: &ScopePath, kind: &str, name: &str) -> Self {
        Self::scope(scope).join(kind, name)
    }

    /// Extend a containment path; on other references this nests a new path step
    pub fn join(self, kind: &str, name: &str) -> Self {
        match self {
            Self::Path { scope, mut chain } => {
                chain.push((kind.to_string(), name.to_string()));
                Self::Path { scope, chain }
            }
            other => other.child_where(kind, "name", name),
        }
    }

    pub fn attribute(self, attr: &str) -> Self {
        Self::Attribute {
            parent: Box::new(self),
            attr: attr.to_string(),
        }
    }

    pub fn child(self, kind: &str) -> Self {
        Self::Child {
            parent: Box::new(self),
            kind: kind.to_string(),
            filter: None,
        }
    }

    /// The child of type `kind` whose `attr` equals `value`
    pub fn child_where(self, kind: &str, attr: &str, value: &str) -> Self {
        Self::Child {
            parent: Box::new(self),
            kind: kind.to_string(),
            filter: Some((attr.to_string(), value.to_string())),
        }
    }
}

/// Where a created object is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    /// The command needs no parent
    None,
    /// The parent object's id is passed as the first argument
    Object(ObjectRef),
    /// The scope is passed as a `-scope` argument
    ScopeArg(ScopePath),
}

/// A single remote operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Abort the script when a required value is empty
    Require { label: String, value: String },
    /// Create one object; required arguments precede optional ones
    Create {
        api: Api,
        command: String,
        parent: Parent,
        required: Vec<(String, AttrValue)>,
        optional: Vec<(String, AttrValue)>,
    },
    /// Change attributes of an existing object
    Modify {
        target: ObjectRef,
        attrs: Vec<(String, AttrValue)>,
    },
    /// Incremental task command (membership, role grants, deletes by task)
    Invoke {
        command: String,
        args: Vec<(String, AttrValue)>,
    },
    /// Remove an existing object
    Delete { target: ObjectRef },
    /// Persist the configuration
    Save,
    /// Reload a running cache after the save
    Refresh { query: String, operation: String },
}

impl Op {
    /// Whether running this operation changes remote configuration
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Create { .. } | Self::Modify { .. } | Self::Invoke { .. } | Self::Delete { .. }
        )
    }
}

/// An ordered remote-operation payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    ops: Vec<Op>,
}

impl Script {
    pub fn builder() -> ScriptBuilder {
        ScriptBuilder::default()
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Whether the script performs no mutation (and so must not be run)
    pub fn is_empty(&self) -> bool {
        !self.ops.iter().any(Op::is_mutation)
    }
}

/// Assembles a [`Script`] in interpreter order.
///
/// Whatever order the calls are made in, the built script is: guards,
/// object changes, incremental invocations, one save, then the refresh.
/// A script without mutations gets no save.
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    guards: Vec<Op>,
    changes: Vec<Op>,
    invocations: Vec<Op>,
    refresh: Option<Op>,
}

impl ScriptBuilder {
    pub fn require(mut self, label: &str, value: &str) -> Self {
        self.guards.push(Op::Require {
            label: label.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn create(
        mut self,
        api: Api,
        command: &str,
        parent: Parent,
        required: Vec<(String, AttrValue)>,
        optional: Vec<(String, AttrValue)>,
    ) -> Self {
        self.changes.push(Op::Create {
            api,
            command: command.to_string(),
            parent,
            required,
            optional,
        });
        self
    }

    /// Queue an attribute modification; empty attribute lists are dropped
    pub fn modify(mut self, target: ObjectRef, attrs: Vec<(String, AttrValue)>) -> Self {
        if !attrs.is_empty() {
            self.changes.push(Op::Modify { target, attrs });
        }
        self
    }

    pub fn delete(mut self, target: ObjectRef) -> Self {
        self.changes.push(Op::Delete { target });
        self
    }

    pub fn invoke(mut self, command: &str, args: Vec<(String, AttrValue)>) -> Self {
        self.invocations.push(Op::Invoke {
            command: command.to_string(),
            args,
        });
        self
    }

    pub fn refresh(mut self, query: &str, operation: &str) -> Self {
        self.refresh = Some(Op::Refresh {
            query: query.to_string(),
            operation: operation.to_string(),
        });
        self
    }

    pub fn build(self) -> Script {
        let mutates = !self.changes.is_empty() || !self.invocations.is_empty();
        if !mutates {
            return Script::default();
        }

        let mut ops = self.guards;
        ops.extend(self.changes);
        ops.extend(self.invocations);
        ops.push(Op::Save);
        ops.extend(self.refresh);
        Script { ops }
    }
}

/// Serializer for one target interpreter
pub trait Dialect: Send + Sync {
    /// Render a script to interpreter text
    fn render(&self, script: &Script) -> Result<String>;
}

/// Build an argument list from `(name, value)` pairs
pub fn args<I, K, V>(pairs: I) -> Vec<(String, AttrValue)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttrValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ScopePath {
        ScopePath::cell("CELL_01").unwrap()
    }

    #[test]
    fn test_builder_orders_operations() {
        let script = Script::builder()
            .refresh("type=AuthorizationGroupManager,*", "refreshAll")
            .invoke("addMemberToGroup", args([("memberUniqueName", "uid=bob")]))
            .modify(
                ObjectRef::named(&scope(), "JDBCProvider", "Oracle"),
                args([("description", "db")]),
            )
            .require("name", "Oracle")
            .build();

        let kinds: Vec<&str> = script
            .ops()
            .iter()
            .map(|op| match op {
                Op::Require { .. } => "require",
                Op::Create { .. } => "create",
                Op::Modify { .. } => "modify",
                Op::Invoke { .. } => "invoke",
                Op::Delete { .. } => "delete",
                Op::Save => "save",
                Op::Refresh { .. } => "refresh",
            })
            .collect();
        assert_eq!(kinds, ["require", "modify", "invoke", "save", "refresh"]);
    }

    #[test]
    fn test_builder_without_mutation_is_empty() {
        let script = Script::builder()
            .require("name", "x")
            .modify(ObjectRef::scope(&scope()), Vec::new())
            .refresh("type=X,*", "refresh")
            .build();
        assert!(script.is_empty());
        assert!(script.ops().is_empty());
    }

    #[test]
    fn test_join_extends_paths() {
        let reference =
            ObjectRef::named(&scope(), "JDBCProvider", "Oracle").join("DataSource", "ds");
        match reference {
            ObjectRef::Path { chain, .. } => assert_eq!(chain.len(), 2),
            other => panic!("expected a path, got {other:?}"),
        }
    }
}
