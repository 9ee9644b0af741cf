use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};
use log::debug;
use serde::Deserialize;

use super::{PackageRecord, Registry, filter_records};
use crate::http::HttpClient;
use crate::manifest::Repository;
use crate::repo::RepoRef;

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Requests in flight at once for one batch.
const CONCURRENT_REQUESTS: usize = 8;

/// The fields of a registry package document we care about.
#[derive(Deserialize, Debug)]
struct PackageDocument {
    name: String,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    repository: Option<Repository>,
}

impl PackageDocument {
    /// The repository homepage when the repository can be parsed, else the
    /// declared homepage.
    fn into_record(self) -> Option<PackageRecord> {
        let homepage = self
            .repository
            .as_ref()
            .and_then(Repository::url)
            .and_then(RepoRef::parse)
            .map(|repo| repo.homepage())
            .or(self.homepage)?;

        Some(PackageRecord {
            name: self.name,
            homepage,
        })
    }
}

pub struct NpmRegistry {
    http: HttpClient,
    registry_url: String,
}

impl NpmRegistry {
    #[tracing::instrument(skip(http, registry_url))]
    pub fn new(http: HttpClient, registry_url: Option<String>) -> Self {
        let registry_url = registry_url
            .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self { http, registry_url }
    }

    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    /// Document URL for a package; scoped names keep their leading `@`.
    pub fn package_url(&self, name: &str) -> String {
        let encoded = match name.strip_prefix('@') {
            Some(scoped) => format!("@{}", urlencoding::encode(scoped)),
            None => urlencoding::encode(name).into_owned(),
        };
        format!("{}/{}", self.registry_url, encoded)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch(&self, name: &str) -> Result<Option<PackageRecord>> {
        let url = self.package_url(name);
        let document: Option<PackageDocument> = self
            .http
            .get_json_optional(&url)
            .await
            .with_context(|| format!("Failed to look up '{}' in {}", name, self.registry_url))?;

        match document {
            Some(document) => Ok(document.into_record()),
            None => {
                debug!("'{}' is not published in {}", name, self.registry_url);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Registry for NpmRegistry {
    #[tracing::instrument(skip(self))]
    async fn lookup(&self, names: &[String], patterns: &[String]) -> Result<Vec<PackageRecord>> {
        let records: Vec<Option<PackageRecord>> = stream::iter(names.iter().cloned())
            .map(|name| async move { self.fetch(&name).await })
            .buffered(CONCURRENT_REQUESTS)
            .try_collect()
            .await?;

        filter_records(records.into_iter().flatten().collect(), patterns)
    }
}
