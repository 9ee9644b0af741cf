//! Cache of formatted reference links, keyed by package name.
//!
//! Keys are `<namespace>.<name>` with any `.` inside the name escaped as
//! `\.`, so `lodash.get` and a nested `lodash` / `get` path never collide.

mod file;

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

pub use file::FileCache;

/// Namespace used when the caller does not configure one.
pub const DEFAULT_NAMESPACE: &str = "reflinks";

#[cfg_attr(test, mockall::automock)]
pub trait LinkCache: Send + Sync {
    fn has(&self, key: &str) -> bool;
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<C: LinkCache + ?Sized> LinkCache for Box<C> {
    fn has(&self, key: &str) -> bool {
        (**self).has(key)
    }

    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Builds the storage key of `name` under `namespace`.
pub fn cache_key(namespace: &str, name: &str) -> String {
    let escaped = name.replace('.', "\\.");
    if namespace.is_empty() {
        escaped
    } else {
        format!("{}.{}", namespace, escaped)
    }
}

/// Process-lifetime cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinkCache for MemoryCache {
    fn has(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("link cache lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
