use std::collections::BTreeMap;

use url::Url;

use crate::error::{Result, TwitterError};
use crate::multipart::MediaPart;

/// HTTP methods accepted by the Twitter REST API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    /// Uppercase wire form of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of a single API call: target URL, parameters,
/// method and any multipart sections.
///
/// Query pairs present in the URL are absorbed into the parameter map at
/// construction, leaving the stored URL bare. Parameters are keyed uniquely;
/// setting a key twice keeps the later value.
#[derive(Debug, Clone)]
pub struct TwitterRequest {
    url: Url,
    method: Method,
    parameters: BTreeMap<String, String>,
    parts: Vec<MediaPart>,
}

impl TwitterRequest {
    /// Create a request for the given URL and method
    pub fn new(mut url: Url, method: Method) -> Self {
        let mut parameters = BTreeMap::new();
        for (key, value) in url.query_pairs() {
            parameters.insert(key.into_owned(), value.into_owned());
        }
        url.set_query(None);

        TwitterRequest {
            url,
            method,
            parameters,
            parts: Vec::new(),
        }
    }

    /// Create a request from a URL string
    pub fn parse(url: &str, method: Method) -> Result<Self> {
        Ok(TwitterRequest::new(Url::parse(url)?, method))
    }

    /// Add a single parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Add several parameters at once
    pub fn params<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.parameters.insert(key.into(), value.into());
        }
        self
    }

    /// Append a multipart section. The request must use POST to carry parts.
    pub fn part(mut self, part: MediaPart) -> Self {
        self.parts.push(part);
        self
    }

    /// Target URL, without query
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parts(&self) -> &[MediaPart] {
        &self.parts
    }

    /// Whether the request body must be encoded as `multipart/form-data`
    pub fn is_multipart(&self) -> bool {
        !self.parts.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.is_multipart() && self.method != Method::Post {
            return Err(TwitterError::InvalidRequest(
                "multipart requests must use POST".to_string(),
            ));
        }
        Ok(())
    }
}
