//! Normalization of caller input into a [`ResolutionJob`].
//!
//! Callers hand over names in several shapes (nothing, one name, a list, or a
//! dotted path into a template context) plus up to three layers of options.
//! Everything is folded into one job before any resolution work starts, so
//! malformed input is rejected before touching the disk or the network.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::DEFAULT_NAMESPACE;
use crate::error::{ResolveError, Result};

/// The package names a caller asks for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Names {
    /// Every dependency declared by the project manifest.
    #[default]
    All,
    One(String),
    Many(Vec<String>),
    /// A dotted path (`verb.reflinks`) into the caller's context.
    Path(String),
}

impl Names {
    /// Interprets a dynamic value: null, a string or an array of strings.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Names::All),
            Value::String(name) => Ok(Names::One(name.clone())),
            Value::Array(items) => Ok(Names::Many(string_list(items)?)),
            other => Err(ResolveError::InvalidArgument(format!(
                "expected a package name or a list of package names, got {}",
                describe(other)
            ))),
        }
    }

    /// Flattens the request into a list, resolving paths against `context`.
    pub fn into_list(self, context: &Value) -> Result<Vec<String>> {
        match self {
            Names::All => Ok(Vec::new()),
            Names::One(name) => Ok(vec![name]),
            Names::Many(names) => Ok(names),
            Names::Path(path) => match lookup_path(context, &path) {
                None | Some(Value::Null) => Ok(Vec::new()),
                Some(value) => Names::from_value(value)?.into_list(&Value::Null),
            },
        }
    }
}

impl From<&str> for Names {
    fn from(name: &str) -> Self {
        Names::One(name.to_string())
    }
}

impl From<String> for Names {
    fn from(name: String) -> Self {
        Names::One(name)
    }
}

impl From<Vec<String>> for Names {
    fn from(names: Vec<String>) -> Self {
        Names::Many(names)
    }
}

impl From<&[&str]> for Names {
    fn from(names: &[&str]) -> Self {
        Names::Many(names.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Names {
    fn from(names: [&str; N]) -> Self {
        Names::from(&names[..])
    }
}

/// Value at a dotted path, e.g. `verb.reflinks`.
pub fn lookup_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    path.split('.')
        .try_fold(context, |value, segment| value.get(segment))
}

fn string_list(items: &[Value]) -> Result<Vec<String>> {
    items
        .iter()
        .map(|item| match item {
            Value::String(name) => Ok(name.clone()),
            other => Err(ResolveError::InvalidArgument(format!(
                "package names must be strings, got {}",
                describe(other)
            ))),
        })
        .collect()
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One layer of options. Unset fields fall through to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Extra names appended after the requested ones.
    pub names: Option<Vec<String>>,
    /// Names excluded before resolution.
    pub remove: Option<Vec<String>>,
    /// Append the reflinks of every declared dependency.
    #[serde(alias = "node_modules")]
    pub use_local_manifest: Option<bool>,
    pub silent: Option<bool>,
    pub verbose: Option<bool>,
    #[serde(alias = "cacheKeyNamespace")]
    pub cache_namespace: Option<String>,
    /// Glob patterns restricting which registry records are kept.
    pub patterns: Option<Vec<String>>,
}

impl Options {
    /// Reads an options object; anything other than an object is an error.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Options::default()),
            Value::Object(_) => Options::deserialize(value)
                .map_err(|e| ResolveError::InvalidArgument(format!("invalid options: {}", e))),
            other => Err(ResolveError::InvalidArgument(format!(
                "options must be an object, got {}",
                describe(other)
            ))),
        }
    }

    /// Fields set on `self` win over those of `lower`.
    pub fn over(&self, lower: &Options) -> Options {
        Options {
            names: self.names.clone().or_else(|| lower.names.clone()),
            remove: self.remove.clone().or_else(|| lower.remove.clone()),
            use_local_manifest: self.use_local_manifest.or(lower.use_local_manifest),
            silent: self.silent.or(lower.silent),
            verbose: self.verbose.or(lower.verbose),
            cache_namespace: self
                .cache_namespace
                .clone()
                .or_else(|| lower.cache_namespace.clone()),
            patterns: self.patterns.clone().or_else(|| lower.patterns.clone()),
        }
    }
}

/// Everything needed to run one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionJob {
    /// Names in request order; empty means "all declared dependencies".
    pub requested: Vec<String>,
    pub use_local_manifest: bool,
    pub silent: bool,
    pub verbose: bool,
    pub cache_namespace: String,
    pub patterns: Vec<String>,
}

impl ResolutionJob {
    /// Builds a job from the requested names and option layers given from
    /// highest to lowest precedence (call, instance, context).
    ///
    /// The `names` option of every layer is appended in that order, then
    /// blank names and the merged `remove` list are dropped. Duplicates are
    /// kept.
    pub fn build(names: Names, layers: &[&Options], context: &Value) -> Result<Self> {
        let mut requested = names.into_list(context)?;
        for layer in layers {
            if let Some(extra) = &layer.names {
                requested.extend(extra.iter().cloned());
            }
        }

        let merged = layers
            .iter()
            .rev()
            .fold(Options::default(), |lower, layer| layer.over(&lower));

        let remove = merged.remove.unwrap_or_default();
        let requested = requested
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty() && !remove.contains(name))
            .collect();

        Ok(ResolutionJob {
            requested,
            use_local_manifest: merged.use_local_manifest.unwrap_or(false),
            silent: merged.silent.unwrap_or(false),
            verbose: merged.verbose.unwrap_or(false),
            cache_namespace: merged
                .cache_namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            patterns: merged.patterns.unwrap_or_default(),
        })
    }

    /// Whether progress should be drawn for this job.
    pub fn shows_progress(&self) -> bool {
        self.verbose && !self.silent
    }
}
