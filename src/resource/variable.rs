//! WebSphere variable (VariableSubstitutionEntry) resource

use super::{Declaration, ScopeDecl, open_document};
use declarative::script::args;
use declarative::{
    Api, ApplyContext, BoxedResource, ChangeSet, ChangeSetBuilder, Check, CurrentState, Ensure,
    FieldRule, ObjectRef, Parent, Resource, Result, ScopePath, Script,
};
use serde::{Deserialize, Serialize};
use wsadmin::{Step, files};

/// `[[variable]]` manifest entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    #[serde(flatten)]
    pub scope: ScopeDecl,
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
}

impl Declaration for VariableDecl {
    const KIND: &'static str = "variable";

    const RULES: &'static [FieldRule] = &[
        FieldRule::required("name", &[Check::NonEmpty, Check::Identifier]),
        ScopeDecl::RULES[0],
        ScopeDecl::RULES[1],
        ScopeDecl::RULES[2],
        ScopeDecl::RULES[3],
        ScopeDecl::RULES[4],
        FieldRule::required("value", &[Check::NoQuote]),
        FieldRule::optional("description", &[Check::NoQuote]),
    ];

    fn label(&self) -> String {
        self.name.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.clone()),
            "value" => Some(self.value.clone()),
            "description" => self.description.clone(),
            other => self.scope.field(other),
        }
    }

    fn cross_checks(&self) -> Vec<String> {
        self.scope.problems()
    }

    fn build(self) -> Result<BoxedResource> {
        let scope = self.scope.resolve()?;
        Ok(Box::new(Variable { decl: self, scope }))
    }
}

/// A variable in the variable map of a scope
#[derive(Debug)]
pub struct Variable {
    decl: VariableDecl,
    scope: ScopePath,
}

impl Variable {
    fn map(&self) -> ObjectRef {
        ObjectRef::named(&self.scope, "VariableMap", "")
    }

    fn target(&self) -> ObjectRef {
        self.map()
            .child_where("VariableSubstitutionEntry", "symbolicName", &self.decl.name)
    }
}

impl Resource for Variable {
    fn id(&self) -> String {
        format!("variable:{}:{}", self.scope, self.decl.name)
    }

    fn description(&self) -> String {
        format!("Variable {} at {}", self.decl.name, self.scope)
    }

    fn resource_type(&self) -> &'static str {
        "variable"
    }

    fn ensure(&self) -> Ensure {
        self.decl.ensure
    }

    fn read_current(&self, ctx: &ApplyContext) -> Result<Option<CurrentState>> {
        let Some(doc) = open_document(ctx, &self.scope, files::VARIABLES)? else {
            return Ok(None);
        };
        Ok(doc
            .find(&[Step::new("entries").attr("symbolicName", &self.decl.name)])
            .map(|entry| {
                CurrentState::new()
                    .with("value", entry.attr("value").unwrap_or_default())
                    .with("description", entry.attr("description").unwrap_or_default())
            }))
    }

    fn record_changes(&self, builder: &mut ChangeSetBuilder) {
        builder.set("value", self.decl.value.as_str());
        builder.set_opt("description", self.decl.description.as_deref());
    }

    fn create_script(&self) -> Result<Script> {
        let optional = match &self.decl.description {
            Some(description) => args([("description", description.as_str())]),
            None => Vec::new(),
        };
        Ok(Script::builder()
            .create(
                Api::AdminConfig,
                "VariableSubstitutionEntry",
                Parent::Object(self.map()),
                args([
                    ("symbolicName", self.decl.name.as_str()),
                    ("value", self.decl.value.as_str()),
                ]),
                optional,
            )
            .build())
    }

    fn update_script(&self, changes: &ChangeSet) -> Result<Script> {
        let attrs = changes
            .sets()
            .map(|(attr, value)| (attr.to_string(), value.clone()))
            .collect();
        Ok(Script::builder().modify(self.target(), attrs).build())
    }

    fn destroy_script(&self) -> Result<Script> {
        Ok(Script::builder().delete(self.target()).build())
    }
}
