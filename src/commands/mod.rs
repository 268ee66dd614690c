//! Command implementations
//!
//! - `status` - declared resources and whether they are in sync
//! - `diff` - what apply would change, optionally with scripts or as JSON
//! - `apply` - one wsadmin pass per drifted resource
//! - `validate` - manifest checks only

pub mod apply;
pub mod diff;
pub mod status;
pub mod validate;

use anyhow::{Result, bail};
use declarative::{ApplyContext, Classifier, CommandOutput, ExecutionPlan, ScriptRunner};
use std::path::PathBuf;

use crate::Context;
use crate::config::{self, Loaded};
use crate::engine::{build_plan, planner};
use crate::ui;

/// Manifest path from the command line, or the default one
pub fn manifest_path(ctx: &Context) -> Result<PathBuf> {
    match &ctx.manifest {
        Some(path) => Ok(PathBuf::from(
            shellexpand::tilde(&path.to_string_lossy()).as_ref(),
        )),
        None => config::default_manifest_path(),
    }
}

/// A loaded manifest plus what every command derives from it
pub struct Session {
    pub loaded: Loaded,
    pub config_root: PathBuf,
    pub classifier: Classifier,
}

impl Session {
    /// Load the manifest and make sure the configuration root exists
    pub fn open(ctx: &Context) -> Result<Self> {
        let path = manifest_path(ctx)?;
        let loaded = config::load(&path)?;
        let config_root = loaded.settings.layout().config_root();
        if !config_root.is_dir() {
            bail!(
                "Configuration root {} does not exist (check profile_base and dmgr_profile)",
                config_root.display()
            );
        }
        let classifier = wsadmin::signatures::classifier(&loaded.settings.allow_output);
        Ok(Self {
            loaded,
            config_root,
            classifier,
        })
    }

    /// Context for reading documents and running as the configured user
    pub fn apply_context(&self) -> ApplyContext<'_> {
        ApplyContext::new(&self.config_root)
            .with_ignore_suffixes(&self.loaded.settings.ignore_suffixes)
            .with_run_as(Some(self.loaded.settings.user.as_str()))
    }

    /// Plan for the target, warning when the target names nothing
    pub fn plan(&mut self, target: Option<&str>) -> ExecutionPlan {
        if let Some(t) = target
            && !planner::is_known_target(t)
        {
            ui::warn(&format!(
                "Unknown target '{t}' (expected one of: {})",
                planner::TARGETS.join(", ")
            ));
        }
        build_plan(std::mem::take(&mut self.loaded.resources), target)
    }
}

/// Runner for modes that must never start wsadmin
pub struct Offline;

impl ScriptRunner for Offline {
    fn run(&self, _script: &str, _run_as: Option<&str>) -> declarative::Result<CommandOutput> {
        Err(declarative::Error::Runner {
            message: "wsadmin is not started in preview mode".to_string(),
        })
    }
}
