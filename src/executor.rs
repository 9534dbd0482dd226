use async_trait::async_trait;
use log::debug;
use url::Url;

use crate::client::create_http_client;
use crate::error::Result;
use crate::request::Method;
use crate::response::TwitterResponse;

/// One wire request, fully assembled by the signing layer.
///
/// Executors must send the header set and body exactly as given.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// Transport seam.
///
/// Implementations surface non-2xx statuses as responses (status plus raw
/// body), reserving `Err` for transport-level failures. Dropping the
/// returned future cancels the in-flight call.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: WireRequest) -> Result<TwitterResponse>;
}

/// Default executor backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new() -> Self {
        ReqwestExecutor {
            client: create_http_client(),
        }
    }

    /// Use a caller-configured reqwest client
    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestExecutor { client }
    }
}

impl Default for ReqwestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: WireRequest) -> Result<TwitterResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        debug!(
            "{} {} -> {} ({} bytes)",
            request.method,
            request.url,
            status,
            body.len()
        );

        Ok(TwitterResponse::new(status, body.to_vec()))
    }
}
