use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::{Result, TwitterError};

/// A token/secret pair produced by the OAuth handshake.
///
/// The temporary pair from the request-token step carries no identity
/// fields; the durable pair from the access-token step usually includes the
/// authorizing user's screen name and numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub token: String,
    pub token_secret: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

impl TokenPair {
    pub fn new(token: impl Into<String>, token_secret: impl Into<String>) -> Self {
        TokenPair {
            token: token.into(),
            token_secret: token_secret.into(),
            screen_name: None,
            user_id: None,
        }
    }

    /// Parse a token-exchange response body
    /// (`application/x-www-form-urlencoded`).
    ///
    /// Both `oauth_token` and `oauth_token_secret` must be present;
    /// `screen_name` and `user_id` are captured when the server includes
    /// them. Anything else is ignored.
    pub fn from_response_body(body: &str) -> Result<Self> {
        let mut fields: HashMap<String, String> = form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect();

        let token = fields
            .remove("oauth_token")
            .ok_or_else(|| malformed(body, "oauth_token"))?;
        let token_secret = fields
            .remove("oauth_token_secret")
            .ok_or_else(|| malformed(body, "oauth_token_secret"))?;

        Ok(TokenPair {
            token,
            token_secret,
            screen_name: fields.remove("screen_name"),
            user_id: fields.remove("user_id").and_then(|v| v.parse().ok()),
        })
    }
}

fn malformed(body: &str, key: &str) -> TwitterError {
    TwitterError::protocol(
        200,
        format!("token-exchange response missing {}: {}", key, body),
    )
}

/// Abstract storage for the durable access credentials.
///
/// The client loads at startup, saves after a successful handshake and
/// clears on reset. The format is opaque to the protocol layer.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<TokenPair>>;
    fn save(&self, pair: &TokenPair) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// In-memory store, for tests and short-lived processes
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<TokenPair>> {
        Ok(self.inner.lock().unwrap().clone())
    }

    fn save(&self, pair: &TokenPair) -> Result<()> {
        *self.inner.lock().unwrap() = Some(pair.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock().unwrap() = None;
        Ok(())
    }
}

/// JSON-file-backed store persisting token, secret, screen name and user id
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTokenStore { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<TokenPair>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, pair: &TokenPair) -> Result<()> {
        let contents = serde_json::to_string(pair)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
