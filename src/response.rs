use serde::de::DeserializeOwned;

use crate::error::{Result, TwitterError};

/// A raw HTTP response handed back to the caller.
///
/// The body is returned unmodified; interpreting the payload is the
/// caller's business. Non-2xx statuses are carried as data, not errors,
/// until the caller opts in via [`TwitterResponse::error_for_status`].
#[derive(Debug, Clone)]
pub struct TwitterResponse {
    status: u16,
    body: Vec<u8>,
}

impl TwitterResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        TwitterResponse { status, body }
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Raw body bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Body decoded as UTF-8, with invalid sequences replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON into the target type
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Into::into)
    }

    /// Convert a non-2xx response into a protocol error carrying the raw
    /// status and body for inspection
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TwitterError::Protocol {
                status: self.status,
                body: self.text(),
            })
        }
    }
}
