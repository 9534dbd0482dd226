use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;
use url::Url;
use uuid::Uuid;

use crate::error::{Result, TwitterError};
use crate::request::{Method, TwitterRequest};

type HmacSha1 = Hmac<Sha1>;

// RFC 5849 section 3.6:
// * ALPHA, DIGIT, '-', '.', '_', '~' MUST NOT be encoded.
// * All other characters MUST be encoded, with uppercase hex digits.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const OAUTH_CALLBACK: &str = "oauth_callback";
const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
const OAUTH_NONCE: &str = "oauth_nonce";
const OAUTH_SIGNATURE: &str = "oauth_signature";
const OAUTH_SIGNATURE_METHOD: &str = "oauth_signature_method";
const OAUTH_TIMESTAMP: &str = "oauth_timestamp";
const OAUTH_TOKEN: &str = "oauth_token";
const OAUTH_VERIFIER: &str = "oauth_verifier";
const OAUTH_VERSION: &str = "oauth_version";

const SIGNATURE_METHOD_HMAC_SHA1: &str = "HMAC-SHA1";
const OAUTH_VERSION_1_0: &str = "1.0";

/// Percent-encode a string per the OAuth parameter encoding rules.
///
/// Space becomes `%20` (never `+`) and only RFC 3986 unreserved characters
/// pass through unescaped.
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, UNRESERVED).to_string()
}

/// Credentials borrowed by the signer for a single request.
///
/// The consumer pair must be non-empty; the token pair is absent while the
/// client is unauthenticated and during the request-token handshake step.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: Option<&'a str>,
    pub token_secret: Option<&'a str>,
}

/// Per-request signing inputs.
///
/// Nonce and timestamp default to a fresh UUID and the current Unix time;
/// both are injectable so signatures stay reproducible under test. Verifier
/// and callback are only set during the respective handshake steps.
#[derive(Debug, Clone, Default)]
pub struct SigningParams {
    pub nonce: Option<String>,
    pub timestamp: Option<i64>,
    pub verifier: Option<String>,
    pub callback: Option<String>,
}

impl SigningParams {
    /// Signing inputs for the request-token handshake step
    pub fn with_callback(callback: impl Into<String>) -> Self {
        SigningParams {
            callback: Some(callback.into()),
            ..Default::default()
        }
    }

    /// Signing inputs for the access-token handshake step
    pub fn with_verifier(verifier: impl Into<String>) -> Self {
        SigningParams {
            verifier: Some(verifier.into()),
            ..Default::default()
        }
    }
}

/// A request transformed into its signed wire form
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Base URL, without query
    pub url: Url,
    /// Request parameters, to be carried in the query string or body
    pub parameters: Vec<(String, String)>,
    /// Complete `Authorization` header value
    pub authorization: String,
}

/// Compute the OAuth 1.0a HMAC-SHA1 signature for `request` and produce the
/// signed parameter set and `Authorization` header.
///
/// Signing is a pure function of its inputs: with a fixed nonce and
/// timestamp the output is byte-identical across invocations.
pub fn sign(
    request: &TwitterRequest,
    credentials: &Credentials<'_>,
    signing: &SigningParams,
) -> Result<SignedRequest> {
    if credentials.consumer_key.is_empty() || credentials.consumer_secret.is_empty() {
        return Err(TwitterError::Configuration(
            "consumer key and secret must be configured before signing".to_string(),
        ));
    }

    let nonce = signing
        .nonce
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let timestamp = signing.timestamp.unwrap_or_else(|| Utc::now().timestamp());

    let mut oauth: BTreeMap<&str, String> = BTreeMap::new();
    oauth.insert(OAUTH_CONSUMER_KEY, credentials.consumer_key.to_string());
    oauth.insert(OAUTH_NONCE, nonce);
    oauth.insert(
        OAUTH_SIGNATURE_METHOD,
        SIGNATURE_METHOD_HMAC_SHA1.to_string(),
    );
    oauth.insert(OAUTH_TIMESTAMP, timestamp.to_string());
    oauth.insert(OAUTH_VERSION, OAUTH_VERSION_1_0.to_string());
    if let Some(token) = credentials.token {
        oauth.insert(OAUTH_TOKEN, token.to_string());
    }
    if let Some(ref verifier) = signing.verifier {
        oauth.insert(OAUTH_VERIFIER, verifier.clone());
    }
    if let Some(ref callback) = signing.callback {
        oauth.insert(OAUTH_CALLBACK, callback.clone());
    }

    let base = signature_base_string(request.method(), request.url(), request.parameters(), &oauth);
    debug!("signature base string: {}", base);

    let key = signing_key(credentials.consumer_secret, credentials.token_secret);
    let signature = hmac_sha1_base64(&key, &base)?;
    oauth.insert(OAUTH_SIGNATURE, signature);

    Ok(SignedRequest {
        url: request.url().clone(),
        parameters: request
            .parameters()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        authorization: authorization_header(&oauth),
    })
}

/// Build the signature base string: uppercase method, encoded base URL, and
/// the encoded normalized parameter block. Parameters are sorted
/// byte-lexicographically on their encoded form, ties broken by value; the
/// signature itself is never part of the block.
fn signature_base_string(
    method: Method,
    url: &Url,
    parameters: &BTreeMap<String, String>,
    oauth: &BTreeMap<&str, String>,
) -> String {
    let mut pairs: Vec<(String, String)> = parameters
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    pairs.extend(
        oauth
            .iter()
            .map(|(k, v)| (percent_encode(k), percent_encode(v))),
    );
    pairs.sort();

    let normalized = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.as_str(),
        percent_encode(url.as_str()),
        percent_encode(&normalized)
    )
}

/// The HMAC key: encoded consumer secret and encoded token secret joined by
/// `&`. The token secret contributes an empty string until one exists.
fn signing_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or(""))
    )
}

fn hmac_sha1_base64(key: &str, message: &str) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| TwitterError::Signature(format!("HMAC key setup failed: {}", e)))?;
    mac.update(message.as_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(STANDARD.encode(digest))
}

/// Emit `OAuth k1="v1", k2="v2", ...` over every oauth_* parameter,
/// signature included, keys and values percent-encoded.
fn authorization_header(oauth: &BTreeMap<&str, String>) -> String {
    let fields = oauth
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {}", fields)
}
