//! Manifest loading
//!
//! The manifest is a TOML document with one `[wsadmin]` table describing
//! how to reach the deployment manager, followed by arrays of resource
//! tables (`[[jdbc_provider]]`, `[[variable]]`, ...).

use anyhow::{Context, Result};
use declarative::{BoxedResource, Check, FieldRule};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wsadmin::ProfileLayout;

use crate::resource::{
    ClusterMemberDecl, Declaration, GroupDecl, JdbcDatasourceDecl, JdbcProviderDecl, JvmLogDecl,
    MqConnectionFactoryDecl, VariableDecl,
};

/// Longest accepted interpreter timeout
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("wasconf"))
}

/// Manifest used when none is given on the command line
pub fn default_manifest_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("manifest.toml"))
}

/// How to reach the deployment manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WsadminSettings {
    /// Directory holding the profiles, e.g. /opt/IBM/WebSphere/AppServer/profiles
    pub profile_base: String,
    /// Deployment manager profile name
    pub dmgr_profile: String,
    /// Local account wsadmin runs as
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub wsadmin_user: Option<String>,
    #[serde(default)]
    pub wsadmin_pass: Option<String>,
    /// Interpreter timeout in seconds; 0 waits forever
    #[serde(default)]
    pub timeout_secs: u64,
    /// Extra element/attribute suffixes stripped from documents
    #[serde(default)]
    pub ignore_suffixes: Vec<String>,
    /// Output fragments that are not errors even when marked as such
    #[serde(default)]
    pub allow_output: Vec<String>,
}

fn default_user() -> String {
    "webadmin".to_string()
}

impl WsadminSettings {
    const RULES: &'static [FieldRule] = &[
        FieldRule::required("profile_base", &[Check::NonEmpty, Check::AbsolutePath]),
        FieldRule::required("dmgr_profile", &[Check::NonEmpty, Check::Identifier]),
        FieldRule::required("user", &[Check::NonEmpty, Check::Identifier]),
        FieldRule::optional("wsadmin_user", &[Check::NonEmpty]),
        FieldRule::required("timeout_secs", &[Check::Range(0, MAX_TIMEOUT_SECS as i64)]),
    ];

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "profile_base" => Some(self.profile_base().display().to_string()),
            "dmgr_profile" => Some(self.dmgr_profile.clone()),
            "user" => Some(self.user.clone()),
            "wsadmin_user" => self.wsadmin_user.clone(),
            "timeout_secs" => Some(self.timeout_secs.to_string()),
            _ => None,
        }
    }

    fn validate(&self) -> declarative::Result<()> {
        declarative::schema::validate("wsadmin", Self::RULES, |name| self.field(name))?;
        if self.wsadmin_user.is_some() != self.wsadmin_pass.is_some() {
            return Err(declarative::Error::validation(
                "wsadmin",
                vec!["wsadmin_user and wsadmin_pass must be given together".to_string()],
            ));
        }
        Ok(())
    }

    /// Profile base with `~` expanded
    pub fn profile_base(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.profile_base).as_ref())
    }

    pub fn layout(&self) -> ProfileLayout {
        ProfileLayout::new(self.profile_base(), self.dmgr_profile.as_str())
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.wsadmin_user.as_deref()?, self.wsadmin_pass.as_deref()?))
    }

    /// `None` when the interpreter may run forever
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Validated settings and resources in apply order
pub type Resolved = (WsadminSettings, Vec<BoxedResource>);

/// The whole declaration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub wsadmin: WsadminSettings,
    #[serde(default)]
    pub jdbc_provider: Vec<JdbcProviderDecl>,
    #[serde(default)]
    pub jdbc_datasource: Vec<JdbcDatasourceDecl>,
    #[serde(default)]
    pub mq_connection_factory: Vec<MqConnectionFactoryDecl>,
    #[serde(default)]
    pub cluster_member: Vec<ClusterMemberDecl>,
    #[serde(default)]
    pub jvm_log: Vec<JvmLogDecl>,
    #[serde(default)]
    pub variable: Vec<VariableDecl>,
    #[serde(default)]
    pub group: Vec<GroupDecl>,
}

/// A manifest whose declarations all validated
#[derive(Debug)]
pub struct Loaded {
    pub path: PathBuf,
    pub settings: WsadminSettings,
    /// Resources in reconciliation order
    pub resources: Vec<BoxedResource>,
}

impl Manifest {
    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.jdbc_provider.len()
            + self.jdbc_datasource.len()
            + self.mq_connection_factory.len()
            + self.cluster_member.len()
            + self.jvm_log.len()
            + self.variable.len()
            + self.group.len()
    }

    /// Validate every declaration and resolve it into a resource.
    ///
    /// Resources are ordered so that dependencies come first: variables,
    /// cluster members and JVM logs, providers before their data sources,
    /// messaging, then security. Every problem is collected before failing.
    pub fn resolve(self) -> std::result::Result<Resolved, Vec<declarative::Error>> {
        let mut problems = Vec::new();
        let mut resources = Vec::with_capacity(self.len());

        if let Err(e) = self.wsadmin.validate() {
            problems.push(e);
        }

        resolve_all(self.variable, &mut resources, &mut problems);
        resolve_all(self.cluster_member, &mut resources, &mut problems);
        resolve_all(self.jvm_log, &mut resources, &mut problems);
        resolve_all(self.jdbc_provider, &mut resources, &mut problems);
        resolve_all(self.jdbc_datasource, &mut resources, &mut problems);
        resolve_all(self.mq_connection_factory, &mut resources, &mut problems);
        resolve_all(self.group, &mut resources, &mut problems);

        let mut seen = HashSet::new();
        for resource in &resources {
            let id = resource.id();
            if !seen.insert(id.clone()) {
                problems.push(declarative::Error::validation(
                    id,
                    vec!["declared more than once".to_string()],
                ));
            }
        }

        if problems.is_empty() {
            Ok((self.wsadmin, resources))
        } else {
            Err(problems)
        }
    }
}

fn resolve_all<D: Declaration>(
    decls: Vec<D>,
    resources: &mut Vec<BoxedResource>,
    problems: &mut Vec<declarative::Error>,
) {
    for decl in decls {
        match decl.resolve() {
            Ok(resource) => resources.push(resource),
            Err(e) => problems.push(e),
        }
    }
}

/// Load a manifest and resolve it, failing with every problem listed
pub fn load(path: &Path) -> Result<Loaded> {
    let manifest = Manifest::load(path)?;
    let (settings, resources) = manifest.resolve().map_err(|problems| {
        let lines: Vec<String> = problems.iter().map(|p| format!("  - {p}")).collect();
        anyhow::anyhow!(
            "{} invalid declaration(s) in {}:\n{}",
            problems.len(),
            path.display(),
            lines.join("\n")
        )
    })?;

    log::debug!(
        "loaded {} resources from {}",
        resources.len(),
        path.display()
    );
    Ok(Loaded {
        path: path.to_path_buf(),
        settings,
        resources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[wsadmin]
profile_base = "/opt/IBM/WebSphere/AppServer/profiles"
dmgr_profile = "PROFILE_DMGR_01"
timeout_secs = 600
allow_output = ["SECJ0136I"]

[[jdbc_datasource]]
name = "appDS"
provider = "Oracle"
scope = "cell"
cell = "CELL_01"
jndi_name = "jdbc/app"
data_store_helper_class = "com.ibm.websphere.rsadapter.Oracle11gDataStoreHelper"
url = "jdbc:oracle:thin:@db01:1521/APP"

[[jdbc_provider]]
name = "Oracle"
scope = "cell"
cell = "CELL_01"
database_type = "Oracle"
provider_type = "Oracle JDBC Driver"
implementation_type = "Connection pool data source"
classpath = ["${ORACLE_JDBC_DRIVER_PATH}/ojdbc8.jar"]

[[variable]]
name = "ORACLE_JDBC_DRIVER_PATH"
scope = "cell"
cell = "CELL_01"
value = "/opt/oracle/lib"

[[group]]
cell = "CELL_01"
name = "wasadmins"
members = ["alice"]
roles = ["administrator"]
"#;

    #[test]
    fn test_parse_and_resolve_orders_dependencies() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.len(), 4);
        assert_eq!(manifest.wsadmin.user, "webadmin");
        assert_eq!(manifest.wsadmin.timeout(), Some(Duration::from_secs(600)));

        let (_, resources) = manifest.resolve().unwrap();
        let types: Vec<&str> = resources.iter().map(|r| r.resource_type()).collect();
        assert_eq!(types, ["variable", "jdbc_provider", "jdbc_datasource", "group"]);
    }

    #[test]
    fn test_every_problem_is_reported() {
        let broken = MANIFEST
            .replace("timeout_secs = 600", "timeout_secs = 100000")
            .replace(
                "scope = \"cell\"\ncell = \"CELL_01\"\nvalue",
                "scope = \"dc\"\ncell = \"CELL_01\"\nvalue",
            );
        let problems = Manifest::parse(&broken).unwrap().resolve().unwrap_err();
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().all(declarative::Error::is_validation));
    }

    #[test]
    fn test_duplicate_declarations_are_rejected() {
        let doubled = format!(
            "{MANIFEST}\n[[variable]]\nname = \"ORACLE_JDBC_DRIVER_PATH\"\nscope = \"cell\"\ncell = \"CELL_01\"\nvalue = \"/other\"\n"
        );
        let problems = Manifest::parse(&doubled).unwrap().resolve().unwrap_err();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].to_string().contains("declared more than once"));
    }

    #[test]
    fn test_credentials_come_in_pairs() {
        let half = MANIFEST.replace(
            "timeout_secs = 600",
            "timeout_secs = 600\nwsadmin_user = \"wasadmin\"",
        );
        assert!(Manifest::parse(&half).unwrap().resolve().is_err());
    }

    #[test]
    fn test_unknown_table_is_rejected() {
        let extra = format!("{MANIFEST}\n[[datacenter]]\nname = \"x\"\n");
        assert!(Manifest::parse(&extra).is_err());
    }

    #[test]
    fn test_load_reports_the_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("manifest.toml");
        fs::write(&path, MANIFEST.replace("dmgr_profile", "dmgr")).unwrap();
        let err = load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("manifest.toml"));
    }
}
