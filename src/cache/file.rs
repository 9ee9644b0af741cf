use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use super::LinkCache;
use crate::runtime::Runtime;

/// A link cache persisted as a flat JSON object on disk.
///
/// The file is read on first access and rewritten on every `set`.
pub struct FileCache<R: Runtime> {
    runtime: R,
    path: PathBuf,
    entries: Mutex<Option<BTreeMap<String, String>>>,
}

impl<R: Runtime> FileCache<R> {
    pub fn new(runtime: R, path: PathBuf) -> Self {
        Self {
            runtime,
            path,
            entries: Mutex::new(None),
        }
    }

    fn load(&self) -> BTreeMap<String, String> {
        if !self.runtime.exists(&self.path) {
            return BTreeMap::new();
        }
        let parsed = self
            .runtime
            .read_to_string(&self.path)
            .and_then(|content| {
                serde_json::from_str::<BTreeMap<String, String>>(&content)
                    .map_err(anyhow::Error::from)
            });
        match parsed {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Ignoring unreadable link cache {}: {:#}",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
        }
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> Result<T> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| anyhow!("link cache lock poisoned"))?;
        let entries = guard.get_or_insert_with(|| self.load());
        Ok(f(entries))
    }

    #[tracing::instrument(skip(self, entries))]
    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !self.runtime.exists(parent)
        {
            self.runtime.create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        self.runtime.write(&tmp_path, content.as_bytes())?;
        self.runtime
            .rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to save link cache to {}", self.path.display()))?;

        debug!("Saved {} cached links to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl<R: Runtime> LinkCache for FileCache<R> {
    fn has(&self, key: &str) -> bool {
        self.with_entries(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.with_entries(|entries| entries.get(key).cloned())
            .ok()
            .flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let snapshot = self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
            entries.clone()
        })?;
        self.save(&snapshot)
    }
}
