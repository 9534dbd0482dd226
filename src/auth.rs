use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::debug;
use url::Url;

use crate::client::Config;
use crate::error::{Result, TwitterError};
use crate::executor::{HttpExecutor, WireRequest};
use crate::request::{Method, TwitterRequest};
use crate::signer::{self, Credentials, SignedRequest, SigningParams};
use crate::token::{TokenPair, TokenStore};

/// The only supported callback value: out-of-band, PIN-based authorization
const OOB_CALLBACK: &str = "oob";

/// Outcome of presenting the authorization URL to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// The PIN the user obtained from the authorization page
    Verifier(String),
    /// The user declined to authorize
    Cancelled,
}

/// Presents an authorization URL to the user and returns the verifier they
/// obtained, or a cancellation signal.
///
/// This is the seam towards whatever login surface the application uses
/// (embedded browser, terminal prompt, ...).
#[async_trait]
pub trait AuthorizationPresenter: Send + Sync {
    async fn present(&self, url: Url) -> Authorization;
}

/// Authentication progress of a client.
///
/// `Authenticated`, `Failed` and `Cancelled` are terminal: the machine
/// leaves them only through an explicit restart or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    RequestTokenPending,
    AwaitingVerifier,
    AccessTokenPending,
    Authenticated,
    Failed,
    Cancelled,
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthState::Authenticated | AuthState::Failed | AuthState::Cancelled
        )
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::RequestTokenPending => "request-token pending",
            AuthState::AwaitingVerifier => "awaiting verifier",
            AuthState::AccessTokenPending => "access-token pending",
            AuthState::Authenticated => "authenticated",
            AuthState::Failed => "failed",
            AuthState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Shared handle onto the current authentication state
#[derive(Debug, Clone, Default)]
pub(crate) struct StateCell(Arc<Mutex<AuthState>>);

impl StateCell {
    pub fn get(&self) -> AuthState {
        *self.0.lock().unwrap()
    }

    pub fn set(&self, next: AuthState) {
        let mut state = self.0.lock().unwrap();
        debug!("auth state: {} -> {}", *state, next);
        *state = next;
    }
}

/// Finalizes the handshake state exactly once.
///
/// If the driving future is dropped mid-flight (caller cancellation), the
/// machine lands in `Failed` instead of hanging in a transient state.
struct HandshakeGuard {
    state: StateCell,
    completed: bool,
}

impl HandshakeGuard {
    fn begin(state: StateCell) -> Self {
        HandshakeGuard {
            state,
            completed: false,
        }
    }

    fn complete(&mut self, terminal: AuthState) {
        self.state.set(terminal);
        self.completed = true;
    }
}

impl Drop for HandshakeGuard {
    fn drop(&mut self) {
        if !self.completed {
            debug!("handshake interrupted mid-flight");
            self.state.set(AuthState::Failed);
        }
    }
}

/// Drive the three-legged handshake to completion: request token, user
/// authorization, access token. Persists the durable pair before reporting
/// success. The caller must hold the client's handshake lock.
pub(crate) async fn run_handshake(
    config: &Config,
    consumer_key: &str,
    consumer_secret: &str,
    executor: &dyn HttpExecutor,
    presenter: &dyn AuthorizationPresenter,
    store: &dyn TokenStore,
    state: &StateCell,
) -> Result<TokenPair> {
    let mut guard = HandshakeGuard::begin(state.clone());

    // request-token step, signed with consumer credentials only
    state.set(AuthState::RequestTokenPending);
    let consumer = Credentials {
        consumer_key,
        consumer_secret,
        token: None,
        token_secret: None,
    };
    let request = TwitterRequest::new(config.request_token_url()?, Method::Post);
    let signed = signer::sign(&request, &consumer, &SigningParams::with_callback(OOB_CALLBACK))?;
    let response = executor
        .execute(handshake_wire_request(signed))
        .await?
        .error_for_status()?;
    let temporary = TokenPair::from_response_body(&response.text())?;

    // hand the authorization URL to the presentation layer, wait for the PIN
    state.set(AuthState::AwaitingVerifier);
    let mut authorize = config.authorize_url()?;
    authorize
        .query_pairs_mut()
        .append_pair("oauth_token", &temporary.token);
    let verifier = match presenter.present(authorize).await {
        Authorization::Verifier(pin) => pin,
        Authorization::Cancelled => {
            guard.complete(AuthState::Cancelled);
            return Err(TwitterError::UserCancelled);
        }
    };

    // access-token step, signed with the temporary pair plus the verifier
    state.set(AuthState::AccessTokenPending);
    let temporary_credentials = Credentials {
        consumer_key,
        consumer_secret,
        token: Some(&temporary.token),
        token_secret: Some(&temporary.token_secret),
    };
    let request = TwitterRequest::new(config.access_token_url()?, Method::Post);
    let signed = signer::sign(
        &request,
        &temporary_credentials,
        &SigningParams::with_verifier(verifier),
    )?;
    let response = executor
        .execute(handshake_wire_request(signed))
        .await?
        .error_for_status()?;
    let durable = TokenPair::from_response_body(&response.text())?;

    store.save(&durable)?;
    guard.complete(AuthState::Authenticated);
    debug!(
        "authenticated as {}",
        durable.screen_name.as_deref().unwrap_or("<unknown>")
    );
    Ok(durable)
}

fn handshake_wire_request(signed: SignedRequest) -> WireRequest {
    WireRequest {
        method: Method::Post,
        url: signed.url,
        headers: vec![("Authorization".to_string(), signed.authorization)],
        body: None,
    }
}
