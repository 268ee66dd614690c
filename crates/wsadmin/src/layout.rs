//! Deployment manager profile layout

use declarative::ScopePath;
use std::path::PathBuf;

/// Well-known configuration document names
pub mod files {
    pub const RESOURCES: &str = "resources.xml";
    pub const SERVER: &str = "server.xml";
    pub const CLUSTER: &str = "cluster.xml";
    pub const VARIABLES: &str = "variables.xml";
    pub const FILE_REGISTRY: &str = "fileRegistry.xml";
    pub const ADMIN_AUTHZ: &str = "admin-authz.xml";
}

/// Where a deployment manager profile keeps its launcher and documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLayout {
    profile_base: PathBuf,
    dmgr_profile: String,
}

impl ProfileLayout {
    pub fn new(profile_base: impl Into<PathBuf>, dmgr_profile: impl Into<String>) -> Self {
        Self {
            profile_base: profile_base.into(),
            dmgr_profile: dmgr_profile.into(),
        }
    }

    /// `<profile_base>/<dmgr_profile>`
    pub fn profile_dir(&self) -> PathBuf {
        self.profile_base.join(&self.dmgr_profile)
    }

    /// Root of the cell configuration repository
    pub fn config_root(&self) -> PathBuf {
        self.profile_dir().join("config")
    }

    /// The wsadmin launcher of this profile
    pub fn wsadmin(&self) -> PathBuf {
        self.profile_dir().join("bin").join("wsadmin.sh")
    }

    /// Absolute path of a scope's document
    pub fn document(&self, scope: &ScopePath, file: &str) -> PathBuf {
        self.config_root().join(relative(scope, file))
    }
}

/// Path of a scope's document relative to the configuration root
pub fn relative(scope: &ScopePath, file: &str) -> PathBuf {
    scope.config_dir().join(file)
}
