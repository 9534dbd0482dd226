//! # twclient - Twitter REST API client for Rust
//!
//! A Rust client for the Twitter REST API with OAuth 1.0a request signing,
//! PIN-based (out-of-band) authorization and media upload support.
//!
//! ## Features
//!
//! - OAuth 1.0a HMAC-SHA1 request signing with RFC 3986 percent-encoding
//! - Three-legged PIN authorization flow with pluggable login presentation
//! - `multipart/form-data` bodies for media uploads
//! - Pluggable credential storage (in-memory and JSON file stores included)
//! - Pluggable transport for testing against stub servers
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::io::{self, Write};
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use twclient::{Authorization, AuthorizationPresenter, Config, FileTokenStore, TwitterConnect};
//! use url::Url;
//!
//! /// Prompts for the PIN on the terminal
//! struct ConsolePresenter;
//!
//! #[async_trait]
//! impl AuthorizationPresenter for ConsolePresenter {
//!     async fn present(&self, url: Url) -> Authorization {
//!         println!("please authorize this application at: {}", url);
//!         print!("PIN: ");
//!         io::stdout().flush().unwrap();
//!         let mut pin = String::new();
//!         io::stdin().read_line(&mut pin).unwrap();
//!         Authorization::Verifier(pin.trim().to_string())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TwitterConnect::new(
//!         Config::default(),
//!         "YOUR_CONSUMER_KEY",
//!         "YOUR_CONSUMER_SECRET",
//!         Arc::new(FileTokenStore::new("twitter-token.json")),
//!         Arc::new(ConsolePresenter),
//!     )?;
//!
//!     // runs the PIN handshake on first use, then signs with the saved token
//!     let response = client.tweet("Hello from Rust!").await?;
//!     println!("status: {}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Requests
//!
//! Any endpoint can be called by building a request directly:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use async_trait::async_trait;
//! # use twclient::*;
//! # struct P;
//! # #[async_trait]
//! # impl AuthorizationPresenter for P {
//! #     async fn present(&self, _url: url::Url) -> Authorization { Authorization::Cancelled }
//! # }
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! # let client = TwitterConnect::new(Config::default(), "ck", "cs",
//! #     Arc::new(MemoryTokenStore::new()), Arc::new(P))?;
//! let request = TwitterRequest::parse(
//!     "https://api.twitter.com/1.1/statuses/user_timeline.json",
//!     Method::Get,
//! )?
//! .param("screen_name", "twitterapi")
//! .param("count", "10");
//!
//! let response = client.perform_with_auth(request).await?;
//! let timeline = response.text();
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod connect;
pub mod error;
pub mod executor;
pub mod multipart;
pub mod request;
pub mod response;
pub mod signer;
pub mod token;

// Re-export main types for convenience
pub use auth::{AuthState, Authorization, AuthorizationPresenter};
pub use client::Config;
pub use connect::TwitterConnect;
pub use error::{Result, TwitterError};
pub use executor::{HttpExecutor, ReqwestExecutor, WireRequest};
pub use multipart::{MediaPart, MultipartBody};
pub use request::{Method, TwitterRequest};
pub use response::TwitterResponse;
pub use signer::{percent_encode, Credentials, SignedRequest, SigningParams};
pub use token::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore};
