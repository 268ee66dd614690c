//! JDBC data source resource

use super::{Declaration, ScopeDecl, default_true, open_document};
use declarative::script::args;
use declarative::{
    Api, ApplyContext, AttrValue, BoxedResource, ChangeSet, ChangeSetBuilder, Check, CurrentState,
    Ensure, FieldRule, ObjectRef, Parent, Resource, Result, ScopePath, Script,
};
use serde::{Deserialize, Serialize};
use wsadmin::{Step, files};

/// Resource property carrying the connection URL
const URL: &str = "URL";

/// `[[jdbc_datasource]]` manifest entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JdbcDatasourceDecl {
    pub name: String,
    /// Name of the JDBC provider the data source belongs to
    pub provider: String,
    #[serde(flatten)]
    pub scope: ScopeDecl,
    pub jndi_name: String,
    pub data_store_helper_class: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub auth_alias: Option<String>,
    #[serde(default)]
    pub statement_cache_size: Option<i64>,
    #[serde(default = "default_true")]
    pub container_managed_persistence: bool,
    #[serde(default)]
    pub ensure: Ensure,
}

impl Declaration for JdbcDatasourceDecl {
    const KIND: &'static str = "jdbc_datasource";

    const RULES: &'static [FieldRule] = &[
        FieldRule::required("name", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::required("provider", &[Check::NonEmpty, Check::NoQuote]),
        ScopeDecl::RULES[0],
        ScopeDecl::RULES[1],
        ScopeDecl::RULES[2],
        ScopeDecl::RULES[3],
        ScopeDecl::RULES[4],
        FieldRule::required("jndi_name", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::required("data_store_helper_class", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::optional("description", &[Check::NoQuote]),
        FieldRule::optional("url", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::optional("auth_alias", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::optional("statement_cache_size", &[Check::Range(0, 1000)]),
    ];

    fn label(&self) -> String {
        self.name.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.clone()),
            "provider" => Some(self.provider.clone()),
            "jndi_name" => Some(self.jndi_name.clone()),
            "data_store_helper_class" => Some(self.data_store_helper_class.clone()),
            "description" => self.description.clone(),
            "url" => self.url.clone(),
            "auth_alias" => self.auth_alias.clone(),
            "statement_cache_size" => self.statement_cache_size.map(|n| n.to_string()),
            other => self.scope.field(other),
        }
    }

    fn cross_checks(&self) -> Vec<String> {
        self.scope.problems()
    }

    fn build(self) -> Result<BoxedResource> {
        let scope = self.scope.resolve()?;
        Ok(Box::new(JdbcDatasource { decl: self, scope }))
    }
}

/// A data source below a JDBC provider
#[derive(Debug)]
pub struct JdbcDatasource {
    decl: JdbcDatasourceDecl,
    scope: ScopePath,
}

impl JdbcDatasource {
    fn provider(&self) -> ObjectRef {
        ObjectRef::named(&self.scope, "JDBCProvider", &self.decl.provider)
    }

    fn target(&self) -> ObjectRef {
        self.provider().join("DataSource", &self.decl.name)
    }

    fn url_property(&self) -> ObjectRef {
        self.target()
            .attribute("propertySet")
            .child_where("J2EEResourceProperty", "name", URL)
    }
}

impl Resource for JdbcDatasource {
    fn id(&self) -> String {
        format!(
            "jdbc_datasource:{}:{}/{}",
            self.scope, self.decl.provider, self.decl.name
        )
    }

    fn description(&self) -> String {
        format!(
            "Data source {} ({}) of provider {}",
            self.decl.name, self.decl.jndi_name, self.decl.provider
        )
    }

    fn resource_type(&self) -> &'static str {
        "jdbc_datasource"
    }

    fn ensure(&self) -> Ensure {
        self.decl.ensure
    }

    fn read_current(&self, ctx: &ApplyContext) -> Result<Option<CurrentState>> {
        let Some(doc) = open_document(ctx, &self.scope, files::RESOURCES)? else {
            return Ok(None);
        };
        let path = [
            Step::new("JDBCProvider").attr("name", &self.decl.provider),
            Step::new("factories").attr("name", &self.decl.name),
        ];
        let Some(ds) = doc.find(&path) else {
            return Ok(None);
        };

        let url = ds
            .child("propertySet")
            .and_then(|set| {
                set.children_named("resourceProperties")
                    .find(|p| p.attr("name") == Some(URL))
            })
            .and_then(|p| p.attr("value"));

        Ok(Some(
            CurrentState::new()
                .with_opt("jndiName", ds.attr("jndiName"))
                .with_opt("datasourceHelperClassname", ds.attr("datasourceHelperClassname"))
                .with("description", ds.attr("description").unwrap_or_default())
                .with_opt("statementCacheSize", ds.attr("statementCacheSize"))
                .with_opt("authDataAlias", ds.attr("authDataAlias"))
                .with_opt(URL, url),
        ))
    }

    fn record_changes(&self, builder: &mut ChangeSetBuilder) {
        let d = &self.decl;
        builder.set("jndiName", d.jndi_name.as_str());
        builder.set("datasourceHelperClassname", d.data_store_helper_class.as_str());
        builder.set_opt("description", d.description.as_deref());
        builder.set_opt("statementCacheSize", d.statement_cache_size);
        builder.set_opt("authDataAlias", d.auth_alias.as_deref());
        builder.set_opt(URL, d.url.as_deref());
    }

    fn create_script(&self) -> Result<Script> {
        let d = &self.decl;
        let mut optional = Vec::new();
        if let Some(description) = &d.description {
            optional.extend(args([("description", description.as_str())]));
        }
        if let Some(alias) = &d.auth_alias {
            optional.extend(args([("componentManagedAuthenticationAlias", alias.as_str())]));
        }

        let mut builder = Script::builder()
            .require("provider", &d.provider)
            .require("jndiName", &d.jndi_name)
            .create(
                Api::AdminTask,
                "createDatasource",
                Parent::Object(self.provider()),
                vec![
                    ("name".to_string(), AttrValue::from(d.name.as_str())),
                    ("jndiName".to_string(), AttrValue::from(d.jndi_name.as_str())),
                    (
                        "dataStoreHelperClassName".to_string(),
                        AttrValue::from(d.data_store_helper_class.as_str()),
                    ),
                    (
                        "containerManagedPersistence".to_string(),
                        AttrValue::Bool(d.container_managed_persistence),
                    ),
                ],
                optional,
            );

        if let Some(size) = d.statement_cache_size {
            builder = builder.modify(self.target(), args([("statementCacheSize", size)]));
        }
        if let Some(url) = &d.url {
            builder = builder.create(
                Api::AdminConfig,
                "J2EEResourceProperty",
                Parent::Object(self.target().attribute("propertySet")),
                args([
                    ("name", URL),
                    ("type", "java.lang.String"),
                    ("value", url.as_str()),
                ]),
                Vec::new(),
            );
        }
        Ok(builder.build())
    }

    fn update_script(&self, changes: &ChangeSet) -> Result<Script> {
        let mut attrs = Vec::new();
        let mut url = None;
        for (attr, value) in changes.sets() {
            if attr == URL {
                url = Some(value.clone());
            } else {
                attrs.push((attr.to_string(), value.clone()));
            }
        }

        let mut builder = Script::builder()
            .require("provider", &self.decl.provider)
            .modify(self.target(), attrs);
        if let Some(url) = url {
            builder = builder.modify(self.url_property(), vec![("value".to_string(), url)]);
        }
        Ok(builder.build())
    }

    fn destroy_script(&self) -> Result<Script> {
        Ok(Script::builder().delete(self.target()).build())
    }
}
