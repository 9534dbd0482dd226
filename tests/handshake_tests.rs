use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use twclient::{
    AuthState, Authorization, AuthorizationPresenter, Config, HttpExecutor, MemoryTokenStore,
    Method, TokenPair, TokenStore, TwitterConnect, TwitterError, TwitterRequest, TwitterResponse,
    WireRequest,
};

const REQUEST_TOKEN_BODY: &[u8] =
    b"oauth_token=TMPTOKEN&oauth_token_secret=TMPSECRET&oauth_callback_confirmed=true";
const ACCESS_TOKEN_BODY: &[u8] =
    b"oauth_token=DURABLE&oauth_token_secret=DURABLESECRET&user_id=6253282&screen_name=twitterapi";

/// Scripted transport: answers the handshake endpoints and records every
/// request it sees.
struct StubExecutor {
    captured: Mutex<Vec<WireRequest>>,
    request_token_status: u16,
    hang_on_request_token: bool,
}

impl StubExecutor {
    fn new() -> Self {
        StubExecutor {
            captured: Mutex::new(Vec::new()),
            request_token_status: 200,
            hang_on_request_token: false,
        }
    }

    fn failing_request_token(status: u16) -> Self {
        StubExecutor {
            request_token_status: status,
            ..Self::new()
        }
    }

    fn hanging_request_token() -> Self {
        StubExecutor {
            hang_on_request_token: true,
            ..Self::new()
        }
    }

    fn paths(&self) -> Vec<String> {
        self.captured
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }

    fn count(&self, path: &str) -> usize {
        self.paths().iter().filter(|p| p == &path).count()
    }

    fn authorization_for(&self, path: &str) -> Option<String> {
        self.captured
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.url.path() == path)
            .and_then(|r| {
                r.headers
                    .iter()
                    .find(|(k, _)| k == "Authorization")
                    .map(|(_, v)| v.clone())
            })
    }
}

#[async_trait]
impl HttpExecutor for StubExecutor {
    async fn execute(&self, request: WireRequest) -> twclient::Result<TwitterResponse> {
        let path = request.url.path().to_string();
        self.captured.lock().unwrap().push(request);

        match path.as_str() {
            "/oauth/request_token" => {
                if self.hang_on_request_token {
                    std::future::pending::<()>().await;
                    unreachable!();
                }
                if self.request_token_status != 200 {
                    return Ok(TwitterResponse::new(
                        self.request_token_status,
                        b"denied".to_vec(),
                    ));
                }
                Ok(TwitterResponse::new(200, REQUEST_TOKEN_BODY.to_vec()))
            }
            "/oauth/access_token" => Ok(TwitterResponse::new(200, ACCESS_TOKEN_BODY.to_vec())),
            _ => Ok(TwitterResponse::new(200, b"{}".to_vec())),
        }
    }
}

/// Presenter with a scripted outcome, recording every URL it is shown
struct PinPresenter {
    outcome: Authorization,
    presented: Mutex<Vec<Url>>,
}

impl PinPresenter {
    fn verifier(pin: &str) -> Self {
        PinPresenter {
            outcome: Authorization::Verifier(pin.to_string()),
            presented: Mutex::new(Vec::new()),
        }
    }

    fn cancelling() -> Self {
        PinPresenter {
            outcome: Authorization::Cancelled,
            presented: Mutex::new(Vec::new()),
        }
    }

    fn presented(&self) -> Vec<Url> {
        self.presented.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorizationPresenter for PinPresenter {
    async fn present(&self, url: Url) -> Authorization {
        self.presented.lock().unwrap().push(url);
        self.outcome.clone()
    }
}

fn protected_request() -> TwitterRequest {
    TwitterRequest::parse(
        "https://api.twitter.com/1.1/account/verify_credentials.json",
        Method::Get,
    )
    .unwrap()
}

fn client(
    executor: Arc<StubExecutor>,
    presenter: Arc<PinPresenter>,
    store: Arc<MemoryTokenStore>,
) -> TwitterConnect {
    TwitterConnect::new(Config::default(), "CK", "CS", store, presenter)
        .expect("client construction failed")
        .with_executor(executor)
}

#[tokio::test]
async fn test_pin_flow_runs_once_and_defers_protected_call() {
    let executor = Arc::new(StubExecutor::new());
    let presenter = Arc::new(PinPresenter::verifier("9371234"));
    let store = Arc::new(MemoryTokenStore::new());
    let client = client(executor.clone(), presenter.clone(), store.clone());

    let response = client.perform_with_auth(protected_request()).await.unwrap();
    assert!(response.is_success());

    // exactly one handshake, and the protected call went out only after it
    assert_eq!(
        executor.paths(),
        vec![
            "/oauth/request_token",
            "/oauth/access_token",
            "/1.1/account/verify_credentials.json",
        ]
    );

    // the authorization URL was built from the temporary token
    let presented = presenter.presented();
    assert_eq!(presented.len(), 1);
    assert_eq!(
        presented[0].as_str(),
        "https://api.twitter.com/oauth/authorize?oauth_token=TMPTOKEN"
    );

    // the durable pair was persisted together with the identity fields
    let saved = store.load().unwrap().expect("no token saved");
    assert_eq!(saved.token, "DURABLE");
    assert_eq!(saved.token_secret, "DURABLESECRET");
    assert_eq!(saved.screen_name.as_deref(), Some("twitterapi"));
    assert_eq!(saved.user_id, Some(6253282));

    assert!(client.is_authenticated().await);
    assert_eq!(client.auth_state(), AuthState::Authenticated);

    // the access-token call carried the verifier
    let access_auth = executor.authorization_for("/oauth/access_token").unwrap();
    assert!(access_auth.contains("oauth_verifier=\"9371234\""));
    assert!(access_auth.contains("oauth_token=\"TMPTOKEN\""));
}

#[tokio::test]
async fn test_concurrent_calls_share_a_single_handshake() {
    let executor = Arc::new(StubExecutor::new());
    let presenter = Arc::new(PinPresenter::verifier("9371234"));
    let client = client(
        executor.clone(),
        presenter,
        Arc::new(MemoryTokenStore::new()),
    );

    let (first, second) = tokio::join!(
        client.perform_with_auth(protected_request()),
        client.perform_with_auth(protected_request()),
    );

    assert!(first.unwrap().is_success());
    assert!(second.unwrap().is_success());
    assert_eq!(executor.count("/oauth/request_token"), 1);
    assert_eq!(executor.count("/oauth/access_token"), 1);
    assert_eq!(executor.count("/1.1/account/verify_credentials.json"), 2);
}

#[tokio::test]
async fn test_authenticated_client_skips_handshake() {
    let executor = Arc::new(StubExecutor::new());
    let presenter = Arc::new(PinPresenter::verifier("9371234"));
    let client = client(
        executor.clone(),
        presenter,
        Arc::new(MemoryTokenStore::new()),
    );

    client.perform_with_auth(protected_request()).await.unwrap();
    client.perform_with_auth(protected_request()).await.unwrap();

    assert_eq!(executor.count("/oauth/request_token"), 1);
    assert_eq!(executor.count("/1.1/account/verify_credentials.json"), 2);
}

#[tokio::test]
async fn test_saved_credentials_load_at_startup() {
    let executor = Arc::new(StubExecutor::new());
    let presenter = Arc::new(PinPresenter::verifier("0000000"));
    let store = Arc::new(MemoryTokenStore::new());
    store
        .save(&TokenPair::new("SAVED", "SAVEDSECRET"))
        .unwrap();

    let client = client(executor.clone(), presenter.clone(), store);
    assert!(client.is_authenticated().await);
    assert_eq!(client.auth_state(), AuthState::Authenticated);

    client.perform_with_auth(protected_request()).await.unwrap();

    assert_eq!(executor.count("/oauth/request_token"), 0);
    assert!(presenter.presented().is_empty());
    let auth = executor
        .authorization_for("/1.1/account/verify_credentials.json")
        .unwrap();
    assert!(auth.contains("oauth_token=\"SAVED\""));
}

#[tokio::test]
async fn test_perform_without_auth_signs_with_consumer_only() {
    let executor = Arc::new(StubExecutor::new());
    let presenter = Arc::new(PinPresenter::verifier("0000000"));
    let client = client(
        executor.clone(),
        presenter.clone(),
        Arc::new(MemoryTokenStore::new()),
    );

    client.perform(protected_request()).await.unwrap();

    assert_eq!(executor.count("/oauth/request_token"), 0);
    assert!(presenter.presented().is_empty());
    let auth = executor
        .authorization_for("/1.1/account/verify_credentials.json")
        .unwrap();
    assert!(auth.contains("oauth_consumer_key=\"CK\""));
    assert!(!auth.contains("oauth_token="));
}

#[tokio::test]
async fn test_user_cancel_is_terminal_until_explicit_restart() {
    let executor = Arc::new(StubExecutor::new());
    let presenter = Arc::new(PinPresenter::cancelling());
    let store = Arc::new(MemoryTokenStore::new());
    let client = client(executor.clone(), presenter, store.clone());

    let err = client
        .perform_with_auth(protected_request())
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(client.auth_state(), AuthState::Cancelled);
    assert_eq!(store.load().unwrap(), None);
    assert_eq!(executor.count("/oauth/request_token"), 1);
    // no access-token call, no protected call
    assert_eq!(executor.count("/oauth/access_token"), 0);
    assert_eq!(executor.count("/1.1/account/verify_credentials.json"), 0);

    // the cancelled outcome is sticky for implicit attempts
    let err = client
        .perform_with_auth(protected_request())
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(executor.count("/oauth/request_token"), 1);

    // an explicit authenticate() restarts the handshake
    let err = client.authenticate().await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(executor.count("/oauth/request_token"), 2);
}

#[tokio::test]
async fn test_request_token_failure_lands_in_failed() {
    let executor = Arc::new(StubExecutor::failing_request_token(401));
    let presenter = Arc::new(PinPresenter::verifier("9371234"));
    let client = client(
        executor.clone(),
        presenter.clone(),
        Arc::new(MemoryTokenStore::new()),
    );

    let err = client
        .perform_with_auth(protected_request())
        .await
        .unwrap_err();
    match err {
        TwitterError::Protocol { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "denied");
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
    assert_eq!(client.auth_state(), AuthState::Failed);
    assert!(presenter.presented().is_empty());

    // failed handshakes are not auto-retried
    let err = client
        .perform_with_auth(protected_request())
        .await
        .unwrap_err();
    assert!(matches!(err, TwitterError::AuthenticationFailed));
    assert_eq!(executor.count("/oauth/request_token"), 1);

    // explicit restart runs a fresh exchange
    let err = client.authenticate().await.unwrap_err();
    assert!(matches!(err, TwitterError::Protocol { status: 401, .. }));
    assert_eq!(executor.count("/oauth/request_token"), 2);
}

#[tokio::test]
async fn test_reset_clears_storage_and_state() {
    let executor = Arc::new(StubExecutor::new());
    let presenter = Arc::new(PinPresenter::verifier("9371234"));
    let store = Arc::new(MemoryTokenStore::new());
    let client = client(executor.clone(), presenter, store.clone());

    client.perform_with_auth(protected_request()).await.unwrap();
    assert!(client.is_authenticated().await);

    client.reset_access_token().await.unwrap();

    assert!(!client.is_authenticated().await);
    assert_eq!(client.auth_state(), AuthState::Unauthenticated);
    assert_eq!(store.load().unwrap(), None);

    // the next authenticated request starts a fresh handshake
    client.perform_with_auth(protected_request()).await.unwrap();
    assert_eq!(executor.count("/oauth/request_token"), 2);
}

#[tokio::test]
async fn test_cancelled_inflight_handshake_lands_in_failed() {
    let executor = Arc::new(StubExecutor::hanging_request_token());
    let presenter = Arc::new(PinPresenter::verifier("9371234"));
    let client = Arc::new(client(
        executor.clone(),
        presenter,
        Arc::new(MemoryTokenStore::new()),
    ));

    let task = {
        let client = client.clone();
        tokio::spawn(async move { client.perform_with_auth(protected_request()).await })
    };

    // wait until the request-token call is actually in flight
    for _ in 0..100 {
        if executor.count("/oauth/request_token") == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(executor.count("/oauth/request_token"), 1);
    assert_eq!(client.auth_state(), AuthState::RequestTokenPending);

    // caller cancellation drops the in-flight future
    task.abort();
    for _ in 0..100 {
        if client.auth_state() == AuthState::Failed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(client.auth_state(), AuthState::Failed);

    // the machine is not stuck: the failure is observable and restartable
    let err = client
        .perform_with_auth(protected_request())
        .await
        .unwrap_err();
    assert!(matches!(err, TwitterError::AuthenticationFailed));
}

#[tokio::test]
async fn test_multipart_tweet_goes_through_should_authenticate() {
    let executor = Arc::new(StubExecutor::new());
    let presenter = Arc::new(PinPresenter::verifier("9371234"));
    let client = client(
        executor.clone(),
        presenter,
        Arc::new(MemoryTokenStore::new()),
    );

    let media = vec![twclient::MediaPart::new(
        vec![0x89u8, 0x50, 0x4e, 0x47],
        "media[]",
        "image/png",
    )];
    client.tweet_with_media("pic!", media).await.unwrap();

    let captured = executor.captured.lock().unwrap();
    let upload = captured
        .iter()
        .find(|r| r.url.path() == "/1.1/statuses/update_with_media.json")
        .expect("upload request not sent");
    assert_eq!(upload.method, Method::Post);
    let content_type = upload
        .headers
        .iter()
        .find(|(k, _)| k == "Content-Type")
        .map(|(_, v)| v.as_str())
        .unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = upload.body.as_deref().unwrap();
    let text = String::from_utf8_lossy(body);
    assert!(text.contains("name=\"status\""));
    assert!(text.contains("name=\"media[]\""));
}
