//! JVM log rotation settings (SystemOut / SystemErr)
//!
//! The stream redirect objects always exist on a server, so this resource
//! can only be updated, never created or removed.

use super::{Declaration, open_document};
use declarative::{
    ApplyContext, AttrValue, BoxedResource, ChangeSet, ChangeSetBuilder, Check, CurrentState,
    Error, FieldRule, ObjectRef, Resource, Result, ScopePath, Script,
};
use serde::{Deserialize, Serialize};
use wsadmin::{Step, files};

/// `[[jvm_log]]` manifest entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JvmLogDecl {
    pub cell: String,
    pub node: String,
    pub server: String,
    /// `out` for SystemOut.log, `err` for SystemErr.log
    pub stream: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub rollover_type: Option<String>,
    /// Rollover size in MB
    #[serde(default)]
    pub rollover_size: Option<i64>,
    #[serde(default)]
    pub max_backup_files: Option<i64>,
    #[serde(default)]
    pub base_hour: Option<i64>,
    /// Hours between time-based rollovers
    #[serde(default)]
    pub rollover_period: Option<i64>,
    #[serde(default)]
    pub format_writes: Option<bool>,
}

impl Declaration for JvmLogDecl {
    const KIND: &'static str = "jvm_log";

    const RULES: &'static [FieldRule] = &[
        FieldRule::required("cell", &[Check::Identifier]),
        FieldRule::required("node", &[Check::Identifier]),
        FieldRule::required("server", &[Check::Identifier]),
        FieldRule::required("stream", &[Check::OneOf(&["out", "err"])]),
        FieldRule::optional("file_name", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::optional(
            "rollover_type",
            &[Check::OneOf(&["SIZE", "TIME", "BOTH", "NONE"])],
        ),
        FieldRule::optional("rollover_size", &[Check::Range(1, 2048)]),
        FieldRule::optional("max_backup_files", &[Check::Range(1, 999)]),
        FieldRule::optional("base_hour", &[Check::Range(1, 24)]),
        FieldRule::optional("rollover_period", &[Check::Range(1, 24)]),
    ];

    fn label(&self) -> String {
        format!("{}/{}", self.server, self.stream)
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "cell" => Some(self.cell.clone()),
            "node" => Some(self.node.clone()),
            "server" => Some(self.server.clone()),
            "stream" => Some(self.stream.clone()),
            "file_name" => self.file_name.clone(),
            "rollover_type" => self.rollover_type.clone(),
            "rollover_size" => self.rollover_size.map(|v| v.to_string()),
            "max_backup_files" => self.max_backup_files.map(|v| v.to_string()),
            "base_hour" => self.base_hour.map(|v| v.to_string()),
            "rollover_period" => self.rollover_period.map(|v| v.to_string()),
            _ => None,
        }
    }

    fn build(self) -> Result<BoxedResource> {
        let scope = ScopePath::server(&self.cell, &self.node, &self.server)?;
        Ok(Box::new(JvmLog { decl: self, scope }))
    }
}

/// Rotation policy of one server output stream
#[derive(Debug)]
pub struct JvmLog {
    decl: JvmLogDecl,
    scope: ScopePath,
}

impl JvmLog {
    /// Server attribute holding the stream's redirect settings
    fn redirect_attr(&self) -> &'static str {
        if self.decl.stream == "err" {
            "errorStreamRedirect"
        } else {
            "outputStreamRedirect"
        }
    }

    fn declared(&self) -> Vec<(&'static str, Option<AttrValue>)> {
        let d = &self.decl;
        vec![
            ("fileName", d.file_name.as_deref().map(AttrValue::from)),
            ("rolloverType", d.rollover_type.as_deref().map(AttrValue::from)),
            ("rolloverSize", d.rollover_size.map(AttrValue::from)),
            ("maxNumberOfBackupFiles", d.max_backup_files.map(AttrValue::from)),
            ("baseHour", d.base_hour.map(AttrValue::from)),
            ("rolloverPeriod", d.rollover_period.map(AttrValue::from)),
            ("formatWrites", d.format_writes.map(AttrValue::from)),
        ]
    }
}

impl Resource for JvmLog {
    fn id(&self) -> String {
        format!("jvm_log:{}:{}", self.scope, self.decl.stream)
    }

    fn description(&self) -> String {
        let file = if self.decl.stream == "err" {
            "SystemErr"
        } else {
            "SystemOut"
        };
        format!("{file} rotation of {}", self.decl.server)
    }

    fn resource_type(&self) -> &'static str {
        "jvm_log"
    }

    fn read_current(&self, ctx: &ApplyContext) -> Result<Option<CurrentState>> {
        let Some(doc) = open_document(ctx, &self.scope, files::SERVER)? else {
            return Ok(None);
        };
        let Some(redirect) = doc.find(&[Step::new(self.redirect_attr())]) else {
            return Ok(Some(CurrentState::new()));
        };

        Ok(Some(self.declared().into_iter().fold(
            CurrentState::new(),
            |state, (attr, _)| state.with_opt(attr, redirect.attr(attr)),
        )))
    }

    fn record_changes(&self, builder: &mut ChangeSetBuilder) {
        for (attr, value) in self.declared() {
            builder.set_opt(attr, value);
        }
    }

    fn create_script(&self) -> Result<Script> {
        Err(Error::unsupported(
            self.id(),
            format!(
                "create (server {} has no server.xml; create the server first)",
                self.scope
            ),
        ))
    }

    fn update_script(&self, changes: &ChangeSet) -> Result<Script> {
        let target = ObjectRef::scope(&self.scope).attribute(self.redirect_attr());
        let attrs = changes
            .sets()
            .map(|(attr, value)| (attr.to_string(), value.clone()))
            .collect();
        Ok(Script::builder().modify(target, attrs).build())
    }
}
