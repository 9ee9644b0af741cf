//! Turns package names into markdown reference links.
//!
//! Each requested name is first looked up in the link cache, then in the
//! manifest of the locally installed package. Declared dependencies stop
//! there; any other name left unresolved is sent to the registry as part of
//! one batch. Output order:
//!
//! 1. declared dependencies, in request order
//! 2. every other name, sorted by name (case-insensitive)
//! 3. with `use_local_manifest`, the links of every declared dependency
//!
//! The split depends only on the project manifest, never on the cache, so
//! repeating a call yields the same text.

use log::{debug, warn};
use serde_json::Value;
use std::sync::OnceLock;

use crate::cache::{LinkCache, cache_key};
use crate::error::{ResolveError, Result};
use crate::manifest::ManifestSource;
use crate::progress::Spinner;
use crate::reflink::{ReflinkEntry, join_blocks};
use crate::registry::Registry;
use crate::request::{Names, Options, ResolutionJob};

pub struct Resolver<M: ManifestSource, G: Registry, C: LinkCache> {
    manifests: M,
    registry: G,
    cache: C,
    config: Options,
    dependencies: OnceLock<Vec<String>>,
}

impl<M: ManifestSource, G: Registry, C: LinkCache> Resolver<M, G, C> {
    pub fn new(manifests: M, registry: G, cache: C) -> Self {
        Self {
            manifests,
            registry,
            cache,
            config: Options::default(),
            dependencies: OnceLock::new(),
        }
    }

    /// Instance-level options, below call-time options in precedence.
    pub fn with_config(mut self, config: Options) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Options {
        &self.config
    }

    /// Dependencies declared by the project manifest, read once per resolver.
    pub fn dependency_names(&self) -> &[String] {
        self.dependencies.get_or_init(|| {
            self.manifests
                .project_manifest()
                .map(|m| m.dependency_names())
                .unwrap_or_default()
        })
    }

    /// Normalizes a request. Fails with `InvalidArgument` before any I/O.
    ///
    /// Dotted paths need a template context and are only accepted through
    /// [`crate::Helper`].
    pub fn request(&self, names: Names, options: &Options) -> Result<ResolutionJob> {
        if let Names::Path(path) = &names {
            return Err(ResolveError::InvalidArgument(format!(
                "'{}' is a context path, but no context was given",
                path
            )));
        }
        ResolutionJob::build(names, &[options, &self.config], &Value::Null)
    }

    /// Resolves names through the cache, installed packages and the registry.
    pub async fn resolve(&self, names: impl Into<Names>, options: &Options) -> Result<String> {
        let job = self.request(names.into(), options)?;
        self.run(&job).await
    }

    /// Resolves names through the cache and installed packages only.
    /// Never contacts the registry and never fails.
    pub fn resolve_local(&self, names: impl Into<Names>, options: &Options) -> String {
        match self.request(names.into(), options) {
            Ok(job) => self.run_local(&job),
            Err(e) => {
                warn!("{}", e);
                String::new()
            }
        }
    }

    /// Runs a prepared job, including the registry lookup.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, job: &ResolutionJob) -> Result<String> {
        if job.requested.is_empty() {
            return Ok(self.dependency_block(job));
        }

        let declared = self.dependency_names();
        let mut local = Vec::new();
        let mut remote = Vec::new();
        let mut misses = Vec::new();
        for name in &job.requested {
            let line = self.resolve_one_local(name, &job.cache_namespace);
            if declared.contains(name) {
                // Declared dependencies never go to the registry
                local.extend(line);
            } else {
                match line {
                    Some(line) => remote.push((name.clone(), line)),
                    None => misses.push(name.clone()),
                }
            }
        }

        remote.extend(self.lookup_remote(&misses, job).await?);
        sort_by_name(&mut remote, |entry| entry.0.as_str());
        let remote: Vec<String> = remote.into_iter().map(|(_, line)| line).collect();

        let mut blocks = vec![local.join("\n"), remote.join("\n")];
        if job.use_local_manifest {
            blocks.push(self.dependency_block(job));
        }
        Ok(join_blocks(blocks))
    }

    /// Runs a prepared job without the registry.
    #[tracing::instrument(skip(self))]
    pub fn run_local(&self, job: &ResolutionJob) -> String {
        if job.requested.is_empty() {
            return self.dependency_block(job);
        }

        let lines: Vec<String> = job
            .requested
            .iter()
            .filter_map(|name| self.resolve_one_local(name, &job.cache_namespace))
            .collect();

        let mut blocks = vec![lines.join("\n")];
        if job.use_local_manifest {
            blocks.push(self.dependency_block(job));
        }
        join_blocks(blocks)
    }

    /// Links of every declared dependency, in ascending name order.
    fn dependency_block(&self, job: &ResolutionJob) -> String {
        self.dependency_names()
            .iter()
            .filter_map(|name| self.resolve_one_local(name, &job.cache_namespace))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Cached line, or the line built from the installed package's manifest.
    fn resolve_one_local(&self, name: &str, namespace: &str) -> Option<String> {
        let key = cache_key(namespace, name);
        if self.cache.has(&key)
            && let Some(line) = self.cache.get(&key)
        {
            debug!("{}: served from cache", name);
            return Some(line);
        }

        let manifest = self.manifests.installed_manifest(name)?;
        let Some(repo) = manifest.repo_ref() else {
            debug!("{}: installed, but declares no usable repository", name);
            return None;
        };

        let line = ReflinkEntry::from_repo(name, &repo).to_string();
        self.remember(&key, &line);
        Some(line)
    }

    /// Queries the registry for `names` and returns `(name, line)` pairs.
    async fn lookup_remote(
        &self,
        names: &[String],
        job: &ResolutionJob,
    ) -> Result<Vec<(String, String)>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let spinner = Spinner::start(
            format!("Looking up {} package(s) in the registry", names.len()),
            job.shows_progress(),
        );

        let records = match self.registry.lookup(names, &job.patterns).await {
            Ok(records) => records,
            Err(e) => {
                spinner.finish("Registry lookup failed");
                return Err(ResolveError::LookupFailed(e));
            }
        };
        spinner.finish(&format!(
            "Found {} of {} package(s)",
            records.len(),
            names.len()
        ));

        Ok(records
            .iter()
            .filter_map(|record| ReflinkEntry::from_homepage(&record.name, &record.homepage))
            .map(|entry| {
                let line = entry.to_string();
                self.remember(&cache_key(&job.cache_namespace, &entry.name), &line);
                (entry.name, line)
            })
            .collect())
    }

    fn remember(&self, key: &str, line: &str) {
        if let Err(e) = self.cache.set(key, line) {
            warn!("Failed to cache {}: {:#}", key, e);
        }
    }
}

/// Case-insensitive name order; exact order breaks ties.
fn sort_by_name<T>(items: &mut [T], name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| {
        let (a, b) = (name(a), name(b));
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
}
