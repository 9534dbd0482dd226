use std::sync::Arc;

use log::debug;
use tokio::sync::{Mutex, RwLock};
use url::form_urlencoded;

use crate::auth::{self, AuthState, AuthorizationPresenter, StateCell};
use crate::client::Config;
use crate::error::{Result, TwitterError};
use crate::executor::{HttpExecutor, ReqwestExecutor, WireRequest};
use crate::multipart::{self, MediaPart};
use crate::request::{Method, TwitterRequest};
use crate::response::TwitterResponse;
use crate::signer::{self, Credentials, SignedRequest, SigningParams};
use crate::token::{TokenPair, TokenStore};

/// Client for the Twitter REST API.
///
/// Owns the consumer credentials, the current access token pair and the
/// collaborators for transport, credential storage and the login surface.
/// Signing and encoding are pure, so any number of requests may be in
/// flight concurrently; only one handshake runs at a time.
pub struct TwitterConnect {
    config: Config,
    consumer_key: String,
    consumer_secret: String,
    executor: Arc<dyn HttpExecutor>,
    presenter: Arc<dyn AuthorizationPresenter>,
    store: Arc<dyn TokenStore>,
    /// Current durable pair; replaced atomically on handshake success/reset
    access: RwLock<Option<TokenPair>>,
    /// Serializes handshakes; waiters observe the winner's outcome
    handshake_lock: Mutex<()>,
    state: StateCell,
}

impl TwitterConnect {
    /// Create a client. Saved credentials are loaded from `store` up front,
    /// so a previously authorized application starts out authenticated.
    ///
    /// Fails with a configuration error when the consumer key or secret is
    /// empty.
    pub fn new(
        config: Config,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        store: Arc<dyn TokenStore>,
        presenter: Arc<dyn AuthorizationPresenter>,
    ) -> Result<Self> {
        let consumer_key = consumer_key.into();
        let consumer_secret = consumer_secret.into();
        if consumer_key.is_empty() || consumer_secret.is_empty() {
            return Err(TwitterError::Configuration(
                "consumer key and secret are required".to_string(),
            ));
        }

        let saved = store.load()?;
        let state = StateCell::default();
        if saved.is_some() {
            state.set(AuthState::Authenticated);
        }

        Ok(TwitterConnect {
            config,
            consumer_key,
            consumer_secret,
            executor: Arc::new(ReqwestExecutor::new()),
            presenter,
            store,
            access: RwLock::new(saved),
            handshake_lock: Mutex::new(()),
            state,
        })
    }

    /// Replace the transport, e.g. with a stub for tests
    pub fn with_executor(mut self, executor: Arc<dyn HttpExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current position of the authentication state machine
    pub fn auth_state(&self) -> AuthState {
        self.state.get()
    }

    /// Whether a durable access token is currently held
    pub async fn is_authenticated(&self) -> bool {
        self.access.read().await.is_some()
    }

    /// Remove the saved access token. The next authenticated request will
    /// prompt the user to re-authorize.
    pub async fn reset_access_token(&self) -> Result<()> {
        let _gate = self.handshake_lock.lock().await;
        let mut access = self.access.write().await;
        self.store.clear()?;
        *access = None;
        self.state.set(AuthState::Unauthenticated);
        Ok(())
    }

    /// Run the PIN handshake explicitly and return the durable pair with
    /// the authorizing user's identity fields.
    ///
    /// A no-op returning the current pair when already authenticated. A
    /// previous failed or cancelled handshake is restarted.
    pub async fn authenticate(&self) -> Result<TokenPair> {
        let _gate = self.handshake_lock.lock().await;
        if let Some(pair) = self.access.read().await.clone() {
            return Ok(pair);
        }
        self.state.set(AuthState::Unauthenticated);
        self.run_handshake_locked().await
    }

    /// Perform a request signed with whatever credentials are currently
    /// held. No handshake is started; unauthenticated clients sign with
    /// consumer credentials only.
    pub async fn perform(&self, request: TwitterRequest) -> Result<TwitterResponse> {
        request.validate()?;
        let access = self.access.read().await.clone();
        self.send_signed(&request, access.as_ref()).await
    }

    /// Perform a request that requires user authorization, transparently
    /// running the PIN handshake first when no credentials exist.
    ///
    /// Concurrent callers share a single handshake: whichever caller starts
    /// it, every waiter proceeds (or fails) with that one outcome. A
    /// handshake that ended in failure is not retried here; call
    /// [`TwitterConnect::authenticate`] to restart it.
    pub async fn perform_with_auth(&self, request: TwitterRequest) -> Result<TwitterResponse> {
        request.validate()?;
        let pair = self.ensure_authenticated().await?;
        self.send_signed(&request, Some(&pair)).await
    }

    async fn ensure_authenticated(&self) -> Result<TokenPair> {
        if let Some(pair) = self.access.read().await.clone() {
            return Ok(pair);
        }

        let _gate = self.handshake_lock.lock().await;
        // a handshake may have completed while we waited for the lock
        if let Some(pair) = self.access.read().await.clone() {
            return Ok(pair);
        }
        match self.state.get() {
            AuthState::Failed => Err(TwitterError::AuthenticationFailed),
            AuthState::Cancelled => Err(TwitterError::UserCancelled),
            _ => self.run_handshake_locked().await,
        }
    }

    /// Caller must hold `handshake_lock`
    async fn run_handshake_locked(&self) -> Result<TokenPair> {
        let pair = auth::run_handshake(
            &self.config,
            &self.consumer_key,
            &self.consumer_secret,
            self.executor.as_ref(),
            self.presenter.as_ref(),
            self.store.as_ref(),
            &self.state,
        )
        .await?;
        *self.access.write().await = Some(pair.clone());
        Ok(pair)
    }

    async fn send_signed(
        &self,
        request: &TwitterRequest,
        access: Option<&TokenPair>,
    ) -> Result<TwitterResponse> {
        let credentials = Credentials {
            consumer_key: &self.consumer_key,
            consumer_secret: &self.consumer_secret,
            token: access.map(|p| p.token.as_str()),
            token_secret: access.map(|p| p.token_secret.as_str()),
        };
        let signed = signer::sign(request, &credentials, &SigningParams::default())?;
        let wire = build_wire_request(request, signed);
        debug!("{} {}", wire.method, wire.url);
        self.executor.execute(wire).await
    }

    // Convenience endpoints, thin request constructions over the core.

    /// Post a status update
    pub async fn tweet(&self, message: &str) -> Result<TwitterResponse> {
        let request = TwitterRequest::new(
            self.config.api_url("statuses/update.json")?,
            Method::Post,
        )
        .param("status", message);
        self.perform_with_auth(request).await
    }

    /// Post a status update with attached media
    pub async fn tweet_with_media(
        &self,
        message: &str,
        media: Vec<MediaPart>,
    ) -> Result<TwitterResponse> {
        let mut request = TwitterRequest::new(
            self.config.api_url("statuses/update_with_media.json")?,
            Method::Post,
        )
        .param("status", message);
        for part in media {
            request = request.part(part);
        }
        self.perform_with_auth(request).await
    }

    /// Fetch the most recent statuses posted by a user
    pub async fn user_timeline(&self, screen_name: &str) -> Result<TwitterResponse> {
        let request = TwitterRequest::new(
            self.config.api_url("statuses/user_timeline.json")?,
            Method::Get,
        )
        .param("screen_name", screen_name);
        self.perform_with_auth(request).await
    }

    /// Fetch the most recent mentions of a user
    pub async fn mentions_timeline(&self, screen_name: &str) -> Result<TwitterResponse> {
        let request = TwitterRequest::new(
            self.config.api_url("statuses/mentions_timeline.json")?,
            Method::Get,
        )
        .param("screen_name", screen_name);
        self.perform_with_auth(request).await
    }
}

/// Place the signed parameters on the wire: query string for GET/DELETE,
/// urlencoded or multipart body for POST.
fn build_wire_request(request: &TwitterRequest, signed: SignedRequest) -> WireRequest {
    let mut headers = vec![("Authorization".to_string(), signed.authorization)];

    match request.method() {
        Method::Get | Method::Delete => {
            let mut url = signed.url;
            if !signed.parameters.is_empty() {
                url.query_pairs_mut().extend_pairs(
                    signed.parameters.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                );
            }
            WireRequest {
                method: request.method(),
                url,
                headers,
                body: None,
            }
        }
        Method::Post if request.is_multipart() => {
            let encoded = multipart::encode(
                signed.parameters.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                request.parts(),
            );
            headers.push(("Content-Type".to_string(), encoded.content_type));
            WireRequest {
                method: Method::Post,
                url: signed.url,
                headers,
                body: Some(encoded.body),
            }
        }
        Method::Post => {
            let body = if signed.parameters.is_empty() {
                None
            } else {
                headers.push((
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ));
                let encoded = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(&signed.parameters)
                    .finish();
                Some(encoded.into_bytes())
            };
            WireRequest {
                method: Method::Post,
                url: signed.url,
                headers,
                body,
            }
        }
    }
}
