use anyhow::Result;
use clap::Parser;
use reflinks::cache::{FileCache, LinkCache, MemoryCache};
use reflinks::config::Config;
use reflinks::manifest::NodeModules;
use reflinks::runtime::RealRuntime;
use reflinks::{Names, Options, Resolver};
use std::path::PathBuf;

/// reflinks - markdown reference links for npm packages
///
/// Prints one `[name]: url` line per package, pointing at the package's
/// GitHub repository. Installed packages are read from node_modules, anything
/// else is looked up in the npm registry.
///
/// If the NPM_TOKEN environment variable is set, it will be sent to the registry.
///
/// Examples:
///   reflinks                    # Links for every dependency in package.json
///   reflinks async micromatch   # Links for the given packages
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Package names (defaults to every dependency in package.json)
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,

    /// Exclude a package from the output (repeatable)
    #[arg(long, value_name = "NAME")]
    pub remove: Vec<String>,

    /// Also append the links of every dependency in package.json
    #[arg(long = "node-modules")]
    pub node_modules: bool,

    /// Only use the cache and node_modules, never the registry
    #[arg(long)]
    pub local_only: bool,

    /// Do not read or write the link cache file
    #[arg(long)]
    pub no_cache: bool,

    /// Directory of the link cache (also via REFLINKS_CACHE_DIR)
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Cache key namespace
    #[arg(long, value_name = "NS")]
    pub namespace: Option<String>,

    /// npm registry URL (also via NPM_CONFIG_REGISTRY; defaults to https://registry.npmjs.org)
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// Suppress progress output
    #[arg(long, short = 's')]
    pub silent: bool,

    /// Show progress while querying the registry
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Project directory (defaults to the current directory)
    #[arg(long, value_name = "PATH")]
    pub cwd: Option<PathBuf>,
}

impl Cli {
    /// `-v` raises the default filter so registry status reaches stderr
    /// even when no spinner can be drawn.
    fn default_log_filter(&self) -> &'static str {
        if self.verbose && !self.silent {
            "info"
        } else {
            "warn"
        }
    }

    fn options(&self) -> Options {
        Options {
            names: None,
            remove: (!self.remove.is_empty()).then(|| self.remove.clone()),
            use_local_manifest: self.node_modules.then_some(true),
            silent: self.silent.then_some(true),
            verbose: self.verbose.then_some(true),
            cache_namespace: self.namespace.clone(),
            patterns: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.default_log_filter()),
    )
    .init();
    let runtime = RealRuntime;

    let config = Config::new(&runtime, cli.registry.clone(), cli.cache_dir.clone())?;
    let manifests = match &cli.cwd {
        Some(dir) => NodeModules::new(runtime, dir.clone()),
        None => NodeModules::from_current_dir(runtime)?,
    };
    let cache: Box<dyn LinkCache> = match &config.cache_file {
        Some(path) if !cli.no_cache => Box::new(FileCache::new(RealRuntime, path.clone())),
        _ => Box::new(MemoryCache::new()),
    };

    let resolver = Resolver::new(manifests, config.registry(), cache);
    let options = cli.options();
    let names = Names::Many(cli.names);

    let block = if cli.local_only {
        resolver.resolve_local(names, &options)
    } else {
        resolver.resolve(names, &options).await?
    };

    if !block.is_empty() {
        println!("{}", block);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_names_parsing() {
        let cli = Cli::try_parse_from(["reflinks", "async", "micromatch"]).unwrap();
        assert_eq!(cli.names, vec!["async", "micromatch"]);
        assert!(!cli.local_only);
        assert_eq!(cli.cwd, None);
        assert_eq!(cli.options(), Options::default());
    }

    #[test]
    fn test_cli_no_names() {
        let cli = Cli::try_parse_from(["reflinks"]).unwrap();
        assert!(cli.names.is_empty());
    }

    #[test]
    fn test_cli_options_parsing() {
        let cli = Cli::try_parse_from([
            "reflinks",
            "async",
            "--remove",
            "flflflfl",
            "--remove",
            "verb",
            "--node-modules",
            "--namespace",
            "docs",
            "-v",
        ])
        .unwrap();

        let options = cli.options();
        assert_eq!(
            options.remove,
            Some(vec!["flflflfl".to_string(), "verb".to_string()])
        );
        assert_eq!(options.use_local_manifest, Some(true));
        assert_eq!(options.verbose, Some(true));
        assert_eq!(options.silent, None);
        assert_eq!(options.cache_namespace.as_deref(), Some("docs"));
    }

    #[test]
    fn test_cli_paths_parsing() {
        let cli = Cli::try_parse_from([
            "reflinks",
            "--cwd",
            "/tmp/project",
            "--cache-dir",
            "/tmp/cache",
            "--registry",
            "http://localhost:4873",
            "--local-only",
            "--no-cache",
        ])
        .unwrap();
        assert_eq!(cli.cwd, Some(PathBuf::from("/tmp/project")));
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert_eq!(cli.registry.as_deref(), Some("http://localhost:4873"));
        assert!(cli.local_only);
        assert!(cli.no_cache);
    }

    #[test]
    fn test_cli_verbose_raises_log_filter() {
        let cli = Cli::try_parse_from(["reflinks", "async"]).unwrap();
        assert_eq!(cli.default_log_filter(), "warn");

        let cli = Cli::try_parse_from(["reflinks", "async", "-v"]).unwrap();
        assert_eq!(cli.default_log_filter(), "info");

        let cli = Cli::try_parse_from(["reflinks", "async", "-v", "-s"]).unwrap();
        assert_eq!(cli.default_log_filter(), "warn");
    }

    #[test]
    fn test_cli_unknown_flag_fails() {
        let result = Cli::try_parse_from(["reflinks", "--frobnicate"]);
        assert!(result.is_err());
    }
}
