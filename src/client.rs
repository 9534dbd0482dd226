use std::time::Duration;

use url::Url;

use crate::error::Result;

/// Create the default HTTP client for API requests
/// with settings for connection pooling and timeouts
pub fn create_http_client() -> reqwest::Client {
    reqwest::ClientBuilder::new()
        .pool_max_idle_per_host(50)
        .timeout(Duration::from_secs(300)) // 5 minutes
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create HTTP client")
}

const REQUEST_TOKEN_PATH: &str = "oauth/request_token";
const AUTHORIZE_PATH: &str = "oauth/authorize";
const ACCESS_TOKEN_PATH: &str = "oauth/access_token";
const API_VERSION_PREFIX: &str = "1.1";

/// Configuration for the Twitter API client
#[derive(Debug, Clone)]
pub struct Config {
    /// URL scheme (http or https)
    pub scheme: String,
    /// API host, serving both the REST endpoints and the OAuth handshake
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scheme: "https".to_string(),
            host: "api.twitter.com".to_string(),
        }
    }
}

impl Config {
    /// Create a new configuration with the given scheme and host
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Config {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Build an absolute URL for a path below the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.base_url(),
            path.trim_start_matches('/')
        ))?)
    }

    /// Build a versioned REST endpoint URL, e.g. `statuses/update.json`
    pub fn api_url(&self, path: &str) -> Result<Url> {
        self.endpoint(&format!(
            "{}/{}",
            API_VERSION_PREFIX,
            path.trim_start_matches('/')
        ))
    }

    pub fn request_token_url(&self) -> Result<Url> {
        self.endpoint(REQUEST_TOKEN_PATH)
    }

    pub fn authorize_url(&self) -> Result<Url> {
        self.endpoint(AUTHORIZE_PATH)
    }

    pub fn access_token_url(&self) -> Result<Url> {
        self.endpoint(ACCESS_TOKEN_PATH)
    }
}
