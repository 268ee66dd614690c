//! Declared WebSphere objects
//!
//! Each manifest table deserializes into a declaration. A declaration is
//! validated and its scope resolved once, at load time, producing a typed
//! resource the `declarative` engine can reconcile.

use declarative::{
    ApplyContext, BoxedResource, Check, Error, FieldRule, Result, ScopeKind, ScopePath,
};
use serde::{Deserialize, Serialize};
use wsadmin::{ConfigDocument, layout};

mod cluster_member;
mod group;
mod jdbc_datasource;
mod jdbc_provider;
mod jvm_log;
mod mq_connection_factory;
mod variable;

pub use cluster_member::ClusterMemberDecl;
pub use group::GroupDecl;
pub use jdbc_datasource::JdbcDatasourceDecl;
pub use jdbc_provider::JdbcProviderDecl;
pub use jvm_log::JvmLogDecl;
pub use mq_connection_factory::MqConnectionFactoryDecl;
pub use variable::VariableDecl;

/// A manifest entry that resolves into a reconcilable resource
pub trait Declaration: Sized {
    /// Manifest table name, also used as the resource type
    const KIND: &'static str;

    /// Field constraints checked before resolution
    const RULES: &'static [FieldRule];

    /// Short name for messages, e.g. the object name
    fn label(&self) -> String;

    /// Declared text of a field, `None` when not declared
    fn field(&self, name: &str) -> Option<String>;

    /// Problems spanning several fields, reported together with `RULES` violations
    fn cross_checks(&self) -> Vec<String> {
        Vec::new()
    }

    /// Build the typed resource; the declaration already passed `RULES`
    /// and `cross_checks`
    fn build(self) -> Result<BoxedResource>;

    /// Validate, resolve the scope and build
    fn resolve(self) -> Result<BoxedResource> {
        let mut problems = declarative::schema::problems(Self::RULES, |field| self.field(field));
        problems.extend(self.cross_checks());
        if !problems.is_empty() {
            return Err(Error::validation(
                format!("{}:{}", Self::KIND, self.label()),
                problems,
            ));
        }
        self.build()
    }
}

/// Where a declared object lives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeDecl {
    /// One of cell, cluster, node, server
    pub scope: String,
    pub cell: String,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
}

impl ScopeDecl {
    /// Rules for the scope fields, shared by every scoped declaration
    pub const RULES: [FieldRule; 5] = [
        FieldRule::required(
            "scope",
            &[Check::OneOf(&["cell", "cluster", "node", "server"])],
        ),
        FieldRule::required("cell", &[Check::Identifier]),
        FieldRule::optional("cluster", &[Check::Identifier]),
        FieldRule::optional("node", &[Check::Identifier]),
        FieldRule::optional("server", &[Check::Identifier]),
    ];

    /// Components the declared scope kind needs but lacks.
    ///
    /// An unknown kind yields nothing here; the `scope` rule reports it.
    pub fn problems(&self) -> Vec<String> {
        let Ok(kind) = self.scope.parse::<ScopeKind>() else {
            return Vec::new();
        };
        match ScopePath::derive(
            kind,
            &self.cell,
            self.cluster.as_deref(),
            self.node.as_deref(),
            self.server.as_deref(),
        ) {
            Ok(_) => Vec::new(),
            Err(e) => vec![e.to_string()],
        }
    }

    pub fn resolve(&self) -> Result<ScopePath> {
        let kind: ScopeKind = self.scope.parse()?;
        ScopePath::derive(
            kind,
            &self.cell,
            self.cluster.as_deref(),
            self.node.as_deref(),
            self.server.as_deref(),
        )
    }

    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "scope" => Some(self.scope.clone()),
            "cell" => Some(self.cell.clone()),
            "cluster" => self.cluster.clone(),
            "node" => self.node.clone(),
            "server" => self.server.clone(),
            _ => None,
        }
    }
}

pub(crate) fn default_true() -> bool {
    true
}

/// Open a scope's document below the context's configuration root
pub(crate) fn open_document(
    ctx: &ApplyContext,
    scope: &ScopePath,
    file: &str,
) -> Result<Option<ConfigDocument>> {
    let path = ctx.document(&layout::relative(scope, file));
    Ok(ConfigDocument::open(&path, ctx.ignore_suffixes)?)
}

/// `a;b;c` as used by classpath-like attributes
pub(crate) fn path_list(entries: &[String]) -> String {
    entries.join(";")
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Helpers for resource tests: a configuration tree in a temp dir

    use declarative::ScopePath;
    use std::path::Path;
    use tempfile::TempDir;
    use wsadmin::layout;

    pub struct ConfigTree {
        pub dir: TempDir,
    }

    impl ConfigTree {
        pub fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }

        pub fn write(&self, scope: &ScopePath, file: &str, xml: &str) {
            let path = self.dir.path().join(layout::relative(scope, file));
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, xml).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(kind: &str) -> ScopeDecl {
        ScopeDecl {
            scope: kind.to_string(),
            cell: "CELL_01".to_string(),
            cluster: Some("CLUSTER_01".to_string()),
            node: Some("NODE_01".to_string()),
            server: None,
        }
    }

    #[test]
    fn test_scope_resolves_declared_kind() {
        let path = scope("cluster").resolve().unwrap();
        assert_eq!(path.kind(), ScopeKind::Cluster);
        assert_eq!(path.cluster_name(), Some("CLUSTER_01"));
        assert_eq!(path.node_name(), None);
    }

    #[test]
    fn test_unknown_scope_is_rejected() {
        let err = scope("datacenter").resolve().unwrap_err();
        assert!(matches!(err, declarative::Error::UnknownScope(_)));
        assert!(err.is_validation());
    }

    #[test]
    fn test_scope_problems_name_the_missing_component() {
        assert_eq!(
            scope("server").problems(),
            vec!["scope server requires a server".to_string()]
        );
        assert!(scope("cluster").problems().is_empty());
        assert!(scope("datacenter").problems().is_empty());
    }

    #[test]
    fn test_bad_scope_is_reported_with_field_problems() {
        let decl = VariableDecl {
            name: String::new(),
            scope: ScopeDecl {
                scope: "cluter".to_string(),
                cell: "CELL_01".to_string(),
                ..Default::default()
            },
            value: "/opt".to_string(),
            description: None,
            ensure: declarative::Ensure::Present,
        };
        match decl.resolve().unwrap_err() {
            Error::Validation { problems, .. } => {
                assert!(problems.iter().any(|p| p.contains("name must not be empty")));
                assert!(problems.iter().any(|p| p.contains("'cluter'")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_scope_component_is_reported_with_field_problems() {
        let decl = VariableDecl {
            name: "bad name".to_string(),
            scope: scope("server"),
            value: "/opt".to_string(),
            description: None,
            ensure: declarative::Ensure::Present,
        };
        match decl.resolve().unwrap_err() {
            Error::Validation { problems, .. } => {
                assert_eq!(problems.len(), 2);
                assert!(problems[0].starts_with("name may only contain"));
                assert_eq!(problems[1], "scope server requires a server");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_server_scope_needs_a_server() {
        let err = scope("server").resolve().unwrap_err();
        assert!(matches!(
            err,
            declarative::Error::MissingScopeComponent { .. }
        ));
    }
}
