//! Package registry lookups.
//!
//! A [`Registry`] answers one batch of package names with the records it
//! knows about. Unknown names are left out of the answer; any transport
//! failure fails the whole batch.

mod npm;

use anyhow::{Context, Result};
use async_trait::async_trait;

pub use npm::{DEFAULT_REGISTRY_URL, NpmRegistry};

/// A package as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub homepage: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    /// Looks up `names`, keeping only records whose name matches one of
    /// `patterns` when any are given.
    async fn lookup(&self, names: &[String], patterns: &[String]) -> Result<Vec<PackageRecord>>;
}

/// Keeps the records whose name matches at least one glob pattern.
/// An empty pattern list keeps everything.
pub fn filter_records(
    records: Vec<PackageRecord>,
    patterns: &[String],
) -> Result<Vec<PackageRecord>> {
    if patterns.is_empty() {
        return Ok(records);
    }

    let compiled = patterns
        .iter()
        .map(|p| glob::Pattern::new(p).with_context(|| format!("Invalid pattern '{}'", p)))
        .collect::<Result<Vec<_>>>()?;

    Ok(records
        .into_iter()
        .filter(|r| compiled.iter().any(|p| p.matches(&r.name)))
        .collect())
}
