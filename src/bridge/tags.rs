// Tag building shared by the event listener and the poll loop

use crate::ipc::protocol::{ProcessDescriptor, ProcessSnapshot};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// Branch name that means "no real branch checked out"
pub const DETACHED_BRANCH: &str = "HEAD";

/// Package manifest looked up in the process working directory
pub const PACKAGE_FILE: &str = "package.json";

/// Ordered list of `key:value` tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Every tag set starts with the application tag
    pub fn for_application(name: &str) -> Self {
        let mut tags = Self::default();
        tags.push("application", name);
        tags
    }

    pub fn push(&mut self, key: &str, value: &str) {
        self.0.push(format!("{}:{}", key, value));
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }
}

/// Full tag set for a lifecycle event:
/// application, instance, status, then branch and version when known.
pub fn event_tags(process: &ProcessDescriptor) -> TagSet {
    let mut tags = TagSet::for_application(&process.name);

    if let Some(instance) = &process.instance {
        tags.push("instance", instance);
    }

    tags.push("status", &process.status);

    let branch = process
        .versioning
        .as_ref()
        .and_then(|versioning| versioning.branch.as_deref())
        .filter(|branch| *branch != DETACHED_BRANCH);
    if let Some(branch) = branch {
        tags.push("branch", branch);
    }

    if let Some(cwd) = &process.pm_cwd {
        if let Some(version) = read_package_version(Path::new(cwd)) {
            tags.push("version", &version);
        }
    }

    tags
}

/// Tags for one entry of the process list: application and instance
pub fn snapshot_tags(snapshot: &ProcessSnapshot) -> TagSet {
    let mut tags = TagSet::for_application(&snapshot.name);

    if let Some(instance) = &snapshot.pm2_env.instance {
        tags.push("instance", instance);
    }

    tags
}

/// Read `version` from `<dir>/package.json`.
///
/// The file is read on every call. A missing file is not an error; an
/// unreadable or malformed one is logged and ignored.
pub fn read_package_version(dir: &Path) -> Option<String> {
    #[derive(Deserialize)]
    struct PackageManifest {
        #[serde(default)]
        version: Option<String>,
    }

    let file = dir.join(PACKAGE_FILE);
    if !file.exists() {
        return None;
    }

    let contents = match std::fs::read_to_string(&file) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("Failed to read {}: {}", file.display(), e);
            return None;
        }
    };

    match serde_json::from_str::<PackageManifest>(&contents) {
        Ok(manifest) => manifest.version,
        Err(e) => {
            warn!("Failed to parse {}: {}", file.display(), e);
            None
        }
    }
}
