const HOMEPAGE_HOST: &str = "https://github.com";

/// Owner and name of a source repository, e.g. `caolan/async`.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Parses any of the repository notations found in package manifests:
    ///
    /// - shorthand: `owner/repo`, `github:owner/repo`
    /// - urls: `https://github.com/owner/repo`, `git+https://...`, `git://...`,
    ///   `git+ssh://git@github.com/owner/repo.git`
    /// - scp-like: `git@github.com:owner/repo.git`
    ///
    /// Returns `None` when no owner and repo can be extracted.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let input = input.split(['#', '?']).next().unwrap_or_default();
        let input = input.strip_prefix("git+").unwrap_or(input);

        let path = if let Some((_, rest)) = input.split_once("://") {
            // Drop the authority (host, optional user and port)
            rest.split_once('/').map(|(_, path)| path)?
        } else if let Some((prefix, rest)) = input.split_once(':') {
            // `git@host:owner/repo` and `github:owner/repo`
            if prefix.is_empty() {
                return None;
            }
            rest
        } else {
            input
        };

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let owner = segments.next()?;
        let repo = segments.next()?;
        let repo = repo.strip_suffix(".git").unwrap_or(repo);

        if owner.is_empty() || repo.is_empty() {
            return None;
        }

        Some(RepoRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Canonical homepage URL for the repository.
    pub fn homepage(&self) -> String {
        format!("{}/{}/{}", HOMEPAGE_HOST, self.owner, self.repo)
    }
}

/// Removes the `#readme` anchor npm appends to generated homepages.
pub fn strip_readme_fragment(url: &str) -> &str {
    url.strip_suffix("#readme").unwrap_or(url)
}
