//! JDBC provider resource

use super::{Declaration, ScopeDecl, open_document, path_list};
use declarative::script::args;
use declarative::{
    Api, ApplyContext, BoxedResource, ChangeSet, ChangeSetBuilder, Check, CurrentState, Ensure,
    Error, FieldRule, ObjectRef, Parent, Resource, Result, ScopePath, Script,
};
use serde::{Deserialize, Serialize};
use wsadmin::{Step, files};

const XA: &str = "XA data source";

/// `[[jdbc_provider]]` manifest entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JdbcProviderDecl {
    pub name: String,
    #[serde(flatten)]
    pub scope: ScopeDecl,
    pub database_type: String,
    pub provider_type: String,
    pub implementation_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub classpath: Vec<String>,
    #[serde(default)]
    pub native_path: Vec<String>,
    #[serde(default)]
    pub ensure: Ensure,
}

impl Declaration for JdbcProviderDecl {
    const KIND: &'static str = "jdbc_provider";

    const RULES: &'static [FieldRule] = &[
        FieldRule::required("name", &[Check::NonEmpty, Check::NoQuote]),
        ScopeDecl::RULES[0],
        ScopeDecl::RULES[1],
        ScopeDecl::RULES[2],
        ScopeDecl::RULES[3],
        ScopeDecl::RULES[4],
        FieldRule::required(
            "database_type",
            &[Check::OneOf(&[
                "DB2",
                "Derby",
                "Informix",
                "Oracle",
                "SQL Server",
                "Sybase",
                "User-defined",
            ])],
        ),
        FieldRule::required("provider_type", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::required(
            "implementation_type",
            &[Check::OneOf(&["Connection pool data source", XA, "User-defined"])],
        ),
        FieldRule::optional("description", &[Check::NoQuote]),
        FieldRule::optional("classpath", &[Check::NoQuote]),
        FieldRule::optional("native_path", &[Check::NoQuote]),
    ];

    fn label(&self) -> String {
        self.name.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.clone()),
            "database_type" => Some(self.database_type.clone()),
            "provider_type" => Some(self.provider_type.clone()),
            "implementation_type" => Some(self.implementation_type.clone()),
            "description" => self.description.clone(),
            "classpath" => Some(path_list(&self.classpath)),
            "native_path" => Some(path_list(&self.native_path)),
            other => self.scope.field(other),
        }
    }

    fn cross_checks(&self) -> Vec<String> {
        self.scope.problems()
    }

    fn build(self) -> Result<BoxedResource> {
        let scope = self.scope.resolve()?;
        Ok(Box::new(JdbcProvider { decl: self, scope }))
    }
}

/// A JDBC provider at cell, cluster, node or server scope
#[derive(Debug)]
pub struct JdbcProvider {
    decl: JdbcProviderDecl,
    scope: ScopePath,
}

impl JdbcProvider {
    fn target(&self) -> ObjectRef {
        ObjectRef::named(&self.scope, "JDBCProvider", &self.decl.name)
    }

    fn is_xa(&self) -> bool {
        self.decl.implementation_type == XA
    }
}

impl Resource for JdbcProvider {
    fn id(&self) -> String {
        format!("jdbc_provider:{}:{}", self.scope, self.decl.name)
    }

    fn description(&self) -> String {
        format!("JDBC provider {} at {}", self.decl.name, self.scope)
    }

    fn resource_type(&self) -> &'static str {
        "jdbc_provider"
    }

    fn ensure(&self) -> Ensure {
        self.decl.ensure
    }

    fn read_current(&self, ctx: &ApplyContext) -> Result<Option<CurrentState>> {
        let Some(doc) = open_document(ctx, &self.scope, files::RESOURCES)? else {
            return Ok(None);
        };
        let Some(provider) = doc.find(&[Step::new("JDBCProvider").attr("name", &self.decl.name)])
        else {
            return Ok(None);
        };

        let texts = |child: &str| -> Vec<String> {
            provider
                .children_named(child)
                .map(|c| c.text().to_string())
                .collect()
        };

        Ok(Some(
            CurrentState::new()
                .with_opt("providerType", provider.attr("providerType"))
                .with("xa", provider.attr("xa").unwrap_or("false"))
                .with("description", provider.attr("description").unwrap_or_default())
                .with("classpath", path_list(&texts("classpath")))
                .with("nativepath", path_list(&texts("nativepath"))),
        ))
    }

    fn record_changes(&self, builder: &mut ChangeSetBuilder) {
        builder.set("providerType", self.decl.provider_type.as_str());
        builder.set("xa", self.is_xa());
        builder.set_opt("description", self.decl.description.as_deref());
        builder.set("classpath", path_list(&self.decl.classpath));
        builder.set("nativepath", path_list(&self.decl.native_path));
    }

    fn create_script(&self) -> Result<Script> {
        let d = &self.decl;
        let mut optional = args([("name", d.name.as_str())]);
        if let Some(description) = &d.description {
            optional.extend(args([("description", description.as_str())]));
        }
        if !d.classpath.is_empty() {
            optional.extend(args([("classpath", path_list(&d.classpath))]));
        }
        if !d.native_path.is_empty() {
            optional.extend(args([("nativePath", path_list(&d.native_path))]));
        }

        Ok(Script::builder()
            .require("name", &d.name)
            .require("providerType", &d.provider_type)
            .create(
                Api::AdminTask,
                "createJDBCProvider",
                Parent::ScopeArg(self.scope.clone()),
                args([
                    ("databaseType", d.database_type.as_str()),
                    ("providerType", d.provider_type.as_str()),
                    ("implementationType", d.implementation_type.as_str()),
                ]),
                optional,
            )
            .build())
    }

    fn update_script(&self, changes: &ChangeSet) -> Result<Script> {
        if changes.get("providerType").is_some() || changes.get("xa").is_some() {
            return Err(Error::unsupported(
                self.id(),
                "changing the provider or implementation type (remove and recreate the provider)",
            ));
        }

        let attrs = changes
            .sets()
            .map(|(attr, value)| (attr.to_string(), value.clone()))
            .collect();
        Ok(Script::builder()
            .require("name", &self.decl.name)
            .modify(self.target(), attrs)
            .build())
    }

    fn destroy_script(&self) -> Result<Script> {
        Ok(Script::builder().delete(self.target()).build())
    }
}
