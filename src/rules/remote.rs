//! Downloading rule lists over HTTP.
//!
//! Only the transfer happens here. The returned bytes go through
//! [`decode_rule_list`](super::decode_rule_list) like any local file.

use std::time::Duration;

use reqwest::{Client, StatusCode};

/// Upstream location of the gfwlist.
pub const DEFAULT_GFWLIST_URL: &str =
    "https://raw.githubusercontent.com/gfwlist/gfwlist/refs/heads/master/gfwlist.txt";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("pacserve/", env!("CARGO_PKG_VERSION"));

/// Failure to download a rule list.
#[derive(Debug, thiserror::Error)]
pub enum RemoteLoadError {
    #[error("GET {url} returned {status}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("GET {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("cannot build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// HTTP client for fetching rule lists.
#[derive(Debug, Clone)]
pub struct RemoteLoader {
    client: Client,
    timeout: Duration,
}

impl RemoteLoader {
    /// Loader with a 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteLoadError::ClientBuild`] if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, RemoteLoadError> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    /// # Errors
    ///
    /// Returns [`RemoteLoadError::ClientBuild`] if the TLS backend cannot be
    /// initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, RemoteLoadError> {
        Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map(|client| Self { client, timeout })
            .map_err(RemoteLoadError::ClientBuild)
    }

    /// Download `url` and return the response body unmodified.
    ///
    /// # Errors
    ///
    /// Fails on connection errors, on timeouts and on any non-2xx status.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteLoadError> {
        let fail = |source: reqwest::Error| self.transport_error(url, source);

        let response = self.client.get(url).send().await.map_err(fail)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteLoadError::HttpStatus {
                url: url.to_owned(),
                status,
            });
        }

        let body = response.bytes().await.map_err(fail)?;
        tracing::info!(%url, bytes = body.len(), "fetched rule list");
        Ok(body.into())
    }

    fn transport_error(&self, url: &str, source: reqwest::Error) -> RemoteLoadError {
        if source.is_timeout() {
            RemoteLoadError::Timeout {
                url: url.to_owned(),
                timeout: self.timeout,
            }
        } else {
            RemoteLoadError::Network {
                url: url.to_owned(),
                source,
            }
        }
    }
}
