use std::fmt;

use crate::repo::{RepoRef, strip_readme_fragment};

/// A markdown reference link definition: `[name]: url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflinkEntry {
    pub name: String,
    pub url: String,
}

impl ReflinkEntry {
    pub fn from_repo(name: &str, repo: &RepoRef) -> Self {
        Self {
            name: name.to_string(),
            url: repo.homepage(),
        }
    }

    /// Builds an entry from a homepage declared by the registry.
    pub fn from_homepage(name: &str, homepage: &str) -> Option<Self> {
        let url = strip_readme_fragment(homepage.trim());
        if url.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            url: url.to_string(),
        })
    }
}

impl fmt::Display for ReflinkEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.name, self.url)
    }
}

/// Joins lines with `\n`, skipping empty blocks.
pub fn join_blocks<I, S>(blocks: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    blocks
        .into_iter()
        .filter(|b| !b.as_ref().is_empty())
        .map(|b| b.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let entry = ReflinkEntry::from_repo(
            "async",
            &RepoRef {
                owner: "caolan".to_string(),
                repo: "async".to_string(),
            },
        );
        assert_eq!(entry.to_string(), "[async]: https://github.com/caolan/async");
    }

    #[test]
    fn test_from_homepage_strips_readme() {
        let entry =
            ReflinkEntry::from_homepage("verb", "https://github.com/verbose/verb#readme").unwrap();
        assert_eq!(entry.url, "https://github.com/verbose/verb");
    }

    #[test]
    fn test_from_homepage_empty() {
        assert!(ReflinkEntry::from_homepage("verb", "  ").is_none());
    }

    #[test]
    fn test_join_blocks_skips_empty() {
        assert_eq!(join_blocks(["[a]: x", "", "[b]: y"]), "[a]: x\n[b]: y");
        assert_eq!(join_blocks(Vec::<String>::new()), "");
    }
}
