use anyhow::Result;
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    http::HttpClient,
    registry::{DEFAULT_REGISTRY_URL, NpmRegistry},
    runtime::Runtime,
};

const USER_AGENT: &str = "reflinks-cli";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const TOKEN_VAR: &str = "NPM_TOKEN";
const REGISTRY_VAR: &str = "NPM_CONFIG_REGISTRY";
const CACHE_DIR_VAR: &str = "REFLINKS_CACHE_DIR";

const CACHE_DIR_NAME: &str = "reflinks";
const CACHE_FILE_NAME: &str = "links.json";

/// Settings resolved from arguments and the environment.
pub struct Config {
    pub http: HttpClient,
    pub registry_url: String,
    /// Where the persistent link cache lives; `None` when no cache directory
    /// can be determined.
    pub cache_file: Option<PathBuf>,
}

impl Config {
    pub fn new<R: Runtime>(
        runtime: &R,
        registry_url: Option<String>,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(token) = runtime.env_var(TOKEN_VAR) {
            let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            auth_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_value);
            debug!("Using {} for authentication: {}", TOKEN_VAR, mask(&token));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        let registry_url = registry_url
            .or_else(|| runtime.env_var(REGISTRY_VAR).ok())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string());

        let cache_file = cache_dir
            .or_else(|| runtime.env_var(CACHE_DIR_VAR).ok().map(PathBuf::from))
            .or_else(|| runtime.cache_dir().map(|dir| dir.join(CACHE_DIR_NAME)))
            .map(|dir| dir.join(CACHE_FILE_NAME));

        debug!("Registry: {}, cache: {:?}", registry_url, cache_file);

        Ok(Self {
            http: HttpClient::new(client),
            registry_url,
            cache_file,
        })
    }

    pub fn registry(&self) -> NpmRegistry {
        NpmRegistry::new(self.http.clone(), Some(self.registry_url.clone()))
    }
}

/// First and last characters of a secret, enough to tell tokens apart.
fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 12 {
        return "*********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}
