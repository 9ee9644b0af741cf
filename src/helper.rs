//! Template helper facade.
//!
//! Template engines call helpers with loosely typed arguments and a data
//! context. [`Helper`] turns those into a [`ResolutionJob`], merging options
//! found in the context, and pads the result so it reads as its own
//! paragraph when interpolated into surrounding text.

use serde_json::Value;

use crate::cache::LinkCache;
use crate::error::Result;
use crate::manifest::ManifestSource;
use crate::registry::Registry;
use crate::request::{Names, Options, ResolutionJob, lookup_path};
use crate::resolver::Resolver;

const PARAGRAPH_BREAK: &str = "\n\n";

pub struct Helper<'r, M: ManifestSource, G: Registry, C: LinkCache> {
    resolver: &'r Resolver<M, G, C>,
}

impl<'r, M: ManifestSource, G: Registry, C: LinkCache> Helper<'r, M, G, C> {
    pub fn new(resolver: &'r Resolver<M, G, C>) -> Self {
        Self { resolver }
    }

    /// Builds the job for one helper call.
    ///
    /// `args` may be null, a package name, a list of names, or a dotted path
    /// into `context` that leads to a name or a list of names. The context's
    /// `options` object is the lowest option layer and its `names` are
    /// appended to the request.
    pub fn job(&self, args: &Value, options: &Options, context: &Value) -> Result<ResolutionJob> {
        let names = match args {
            Value::String(path) if is_names_path(context, path) => Names::Path(path.clone()),
            other => Names::from_value(other)?,
        };

        let mut context_options = match context.get("options") {
            Some(value) => Options::from_value(value)?,
            None => Options::default(),
        };
        if let Some(value) = context.get("names") {
            let extra = Names::from_value(value)?.into_list(&Value::Null)?;
            context_options
                .names
                .get_or_insert_with(Vec::new)
                .extend(extra);
        }

        ResolutionJob::build(
            names,
            &[options, self.resolver.config(), &context_options],
            context,
        )
    }

    /// Resolves the links for a helper call. Malformed arguments fail before
    /// any lookup starts.
    pub async fn render(&self, args: &Value, options: &Options, context: &Value) -> Result<String> {
        let job = self.job(args, options, context)?;
        let block = self.resolver.run(&job).await?;
        Ok(pad(block))
    }

    /// Like [`Helper::render`] without the registry.
    pub fn render_local(&self, args: &Value, options: &Options, context: &Value) -> Result<String> {
        let job = self.job(args, options, context)?;
        Ok(pad(self.resolver.run_local(&job)))
    }
}

/// A dotted string only counts as a path when it leads to names; package
/// names that happen to match a context key stay package names.
fn is_names_path(context: &Value, arg: &str) -> bool {
    if !arg.contains('.') {
        return false;
    }
    match lookup_path(context, arg) {
        Some(Value::String(_)) => true,
        Some(Value::Array(items)) => items.iter().all(Value::is_string),
        _ => false,
    }
}

fn pad(block: String) -> String {
    if block.is_empty() {
        block
    } else {
        format!("{}{}", PARAGRAPH_BREAK, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::ResolveError;
    use crate::manifest::{MockManifestSource, PackageManifest};
    use crate::registry::{MockRegistry, PackageRecord};
    use serde_json::json;

    fn manifests() -> MockManifestSource {
        let mut manifests = MockManifestSource::new();
        manifests.expect_project_manifest().returning(|| {
            Some(PackageManifest::parse(r#"{"dependencies":{"micromatch":"^4.0.0"}}"#).unwrap())
        });
        manifests
            .expect_installed_manifest()
            .returning(|name| match name {
                "micromatch" => Some(
                    PackageManifest::parse(r#"{"repository":"micromatch/micromatch"}"#).unwrap(),
                ),
                _ => None,
            });
        manifests
    }

    fn registry() -> MockRegistry {
        let mut registry = MockRegistry::new();
        registry.expect_lookup().returning(|names, _| {
            Ok(names
                .iter()
                .filter(|n| n.as_str() != "flflflfl")
                .map(|n| PackageRecord {
                    name: n.clone(),
                    homepage: format!("https://github.com/{}/{}#readme", n, n),
                })
                .collect())
        });
        registry
    }

    #[tokio::test]
    async fn test_render_pads_block() {
        let resolver = Resolver::new(manifests(), registry(), MemoryCache::new());
        let helper = Helper::new(&resolver);

        let out = helper
            .render(&json!(["micromatch"]), &Options::default(), &json!({}))
            .await
            .unwrap();
        assert_eq!(out, "\n\n[micromatch]: https://github.com/micromatch/micromatch");
    }

    #[tokio::test]
    async fn test_render_empty_is_not_padded() {
        let mut manifests = MockManifestSource::new();
        manifests.expect_project_manifest().returning(|| None);
        let resolver = Resolver::new(manifests, MockRegistry::new(), MemoryCache::new());
        let helper = Helper::new(&resolver);

        let out = helper
            .render(&json!(""), &Options::default(), &json!({}))
            .await
            .unwrap();
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn test_render_resolves_context_path() {
        let resolver = Resolver::new(manifests(), registry(), MemoryCache::new());
        let helper = Helper::new(&resolver);
        let context = json!({"verb": {"reflinks": ["micromatch", "generate", "verb"]}});

        let out = helper
            .render(&json!("verb.reflinks"), &Options::default(), &context)
            .await
            .unwrap();
        assert_eq!(
            out,
            "\n\n[micromatch]: https://github.com/micromatch/micromatch\n\
             [generate]: https://github.com/generate/generate\n\
             [verb]: https://github.com/verb/verb"
        );
    }

    #[tokio::test]
    async fn test_render_uses_configured_remove() {
        let resolver = Resolver::new(manifests(), registry(), MemoryCache::new()).with_config(
            Options {
                remove: Some(vec!["flflflfl".to_string()]),
                ..Default::default()
            },
        );
        let helper = Helper::new(&resolver);

        let out = helper
            .render(&json!(["micromatch", "flflflfl"]), &Options::default(), &json!({}))
            .await
            .unwrap();
        assert!(out.contains("[micromatch]"));
        assert!(!out.contains("flflflfl"));
    }

    #[test]
    fn test_name_matching_context_key_stays_a_name() {
        let resolver = Resolver::new(manifests(), registry(), MemoryCache::new());
        let helper = Helper::new(&resolver);

        let context = json!({"verb": {"reflinks": ["micromatch"]}});
        let job = helper
            .job(&json!("verb"), &Options::default(), &context)
            .unwrap();
        assert_eq!(job.requested, vec!["verb"]);

        let context = json!({"micromatch": "4.0.0"});
        let job = helper
            .job(&json!("micromatch"), &Options::default(), &context)
            .unwrap();
        assert_eq!(job.requested, vec!["micromatch"]);
    }

    #[test]
    fn test_dotted_name_without_names_behind_it() {
        let resolver = Resolver::new(manifests(), registry(), MemoryCache::new());
        let helper = Helper::new(&resolver);

        // Not in the context: a package name
        let job = helper
            .job(&json!("lodash.get"), &Options::default(), &json!({}))
            .unwrap();
        assert_eq!(job.requested, vec!["lodash.get"]);

        // Leads to an object: still a package name
        let context = json!({"verb": {"reflinks": {"enabled": true}}});
        let job = helper
            .job(&json!("verb.reflinks"), &Options::default(), &context)
            .unwrap();
        assert_eq!(job.requested, vec!["verb.reflinks"]);

        // Leads to a single name
        let context = json!({"docs": {"main": "generate"}});
        let job = helper
            .job(&json!("docs.main"), &Options::default(), &context)
            .unwrap();
        assert_eq!(job.requested, vec!["generate"]);
    }

    #[tokio::test]
    async fn test_render_name_matching_context_key() {
        let resolver = Resolver::new(manifests(), registry(), MemoryCache::new());
        let helper = Helper::new(&resolver);

        let context = json!({"micromatch": "4.0.0"});

        let out = helper
            .render(&json!("micromatch"), &Options::default(), &context)
            .await
            .unwrap();
        assert_eq!(out, "\n\n[micromatch]: https://github.com/micromatch/micromatch");
    }

    #[test]
    fn test_job_merges_context_options_and_names() {
        let resolver = Resolver::new(manifests(), registry(), MemoryCache::new());
        let helper = Helper::new(&resolver);
        let context = json!({
            "names": ["generate"],
            "options": {"remove": ["verb"], "verbose": true}
        });

        let job = helper
            .job(&json!(["verb", "micromatch"]), &Options::default(), &context)
            .unwrap();
        assert_eq!(job.requested, vec!["micromatch", "generate"]);
        assert!(job.verbose);
    }

    #[test]
    fn test_job_rejects_number() {
        let resolver = Resolver::new(
            MockManifestSource::new(),
            MockRegistry::new(),
            MemoryCache::new(),
        );
        let helper = Helper::new(&resolver);

        let result = helper.job(&json!(42), &Options::default(), &json!({}));
        assert!(matches!(result, Err(ResolveError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_render_rejects_number_before_io() {
        // No expectations: any manifest or registry access would panic
        let resolver = Resolver::new(
            MockManifestSource::new(),
            MockRegistry::new(),
            MemoryCache::new(),
        );
        let helper = Helper::new(&resolver);

        let result = helper
            .render(&json!(3.5), &Options::default(), &json!({}))
            .await;
        assert!(matches!(result, Err(ResolveError::InvalidArgument(_))));
    }

    #[test]
    fn test_render_local_never_queries_registry() {
        let mut registry = MockRegistry::new();
        registry.expect_lookup().never();
        let resolver = Resolver::new(manifests(), registry, MemoryCache::new());
        let helper = Helper::new(&resolver);

        let out = helper
            .render_local(&json!(["micromatch", "verb"]), &Options::default(), &json!({}))
            .unwrap();
        assert_eq!(out, "\n\n[micromatch]: https://github.com/micromatch/micromatch");
    }
}
