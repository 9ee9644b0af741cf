//! Package manifests (`package.json`) of the current project and of the
//! packages installed under its `node_modules` directory.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::repo::RepoRef;
use crate::runtime::Runtime;

const MANIFEST_FILE: &str = "package.json";
const MODULES_DIR: &str = "node_modules";

/// The subset of `package.json` needed to build reference links.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub repository: Option<Repository>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// The `repository` field, either `"owner/repo"`-style or `{ "type": "git", "url": ... }`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Repository {
    Url(String),
    Object {
        #[serde(default)]
        url: Option<String>,
    },
}

impl Repository {
    pub fn url(&self) -> Option<&str> {
        match self {
            Repository::Url(url) => Some(url),
            Repository::Object { url } => url.as_deref(),
        }
    }
}

impl PackageManifest {
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse package manifest")
    }

    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime.read_to_string(path)?;
        Self::parse(&content).with_context(|| format!("Invalid manifest at {}", path.display()))
    }

    /// Repository declared by the manifest, if it can be parsed.
    pub fn repo_ref(&self) -> Option<RepoRef> {
        self.repository
            .as_ref()
            .and_then(Repository::url)
            .and_then(RepoRef::parse)
    }

    /// Names of the declared dependencies, in ascending order.
    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }
}

/// Source of project and installed-package manifests.
#[cfg_attr(test, mockall::automock)]
pub trait ManifestSource: Send + Sync {
    /// Manifest of the current project, `None` when there is none or it is unreadable.
    fn project_manifest(&self) -> Option<PackageManifest>;

    /// Manifest of an installed package, `None` when not installed or unreadable.
    fn installed_manifest(&self, name: &str) -> Option<PackageManifest>;
}

/// Reads manifests from a project directory and its `node_modules`.
pub struct NodeModules<R: Runtime> {
    runtime: R,
    project_dir: PathBuf,
}

impl<R: Runtime> NodeModules<R> {
    pub fn new(runtime: R, project_dir: PathBuf) -> Self {
        Self {
            runtime,
            project_dir,
        }
    }

    /// Uses the process working directory as the project directory.
    pub fn from_current_dir(runtime: R) -> Result<Self> {
        let project_dir = runtime.current_dir()?;
        Ok(Self::new(runtime, project_dir))
    }

    /// Path of an installed package's manifest.
    ///
    /// Returns: `<project>/node_modules/<name>/package.json`
    pub fn installed_manifest_path(&self, name: &str) -> PathBuf {
        let mut path = self.project_dir.join(MODULES_DIR);
        // Scoped names (`@scope/pkg`) map onto nested directories
        for segment in name.split('/') {
            path.push(segment);
        }
        path.join(MANIFEST_FILE)
    }

    fn read(&self, path: &Path) -> Option<PackageManifest> {
        if !self.runtime.exists(path) {
            debug!("No manifest at {}", path.display());
            return None;
        }
        match PackageManifest::load(&self.runtime, path) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                debug!("Ignoring unreadable manifest: {:#}", e);
                None
            }
        }
    }
}

impl<R: Runtime> ManifestSource for NodeModules<R> {
    fn project_manifest(&self) -> Option<PackageManifest> {
        let path = self.project_dir.join(MANIFEST_FILE);
        let manifest = self.read(&path);
        if manifest.is_none() && self.runtime.exists(&path) {
            warn!("Could not read {}, assuming no dependencies", path.display());
        }
        manifest
    }

    fn installed_manifest(&self, name: &str) -> Option<PackageManifest> {
        if name.is_empty() || name.split('/').any(|s| s == ".." || s == ".") {
            return None;
        }
        self.read(&self.installed_manifest_path(name))
    }
}
