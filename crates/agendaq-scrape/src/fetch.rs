//! HTTP fetcher for the portal: rotating identity, bounded retry.

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{StatusCode, header};
use thiserror::Error;
use tracing::{debug, warn};

use crate::identity::{IdentityRotation, UserAgentPool};

/// Request timeout applied to every portal call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum FetchError {
    /// Worth retrying: connectivity, timeouts, throttling, server errors.
    #[error("transient failure fetching {url}: {reason}")]
    Transient { url: String, reason: String },
    /// Not worth retrying: the resource is gone or the request is wrong.
    #[error("permanent failure fetching {url}: {reason}")]
    Permanent { url: String, reason: String },
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_body() || err.is_decode() {
            Self::Transient {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else {
            Self::Permanent {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    fn from_status(url: &str, status: StatusCode) -> Self {
        let reason = format!("HTTP {status}");
        if status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error()
        {
            Self::Transient {
                url: url.to_string(),
                reason,
            }
        } else {
            Self::Permanent {
                url: url.to_string(),
                reason,
            }
        }
    }
}

/// Portal HTTP client.
///
/// Wraps one `reqwest::Client` for connection reuse; each request presents
/// a fresh identity from the injected rotation strategy. Content is never
/// interpreted here.
pub struct Fetcher {
    client: reqwest::Client,
    identity: Arc<dyn IdentityRotation>,
}

impl Fetcher {
    /// Fetcher with the built-in rotating identity pool.
    ///
    /// Fails only if the TLS backend cannot initialize.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_identity(Arc::new(UserAgentPool::new()))
    }

    /// Fetcher with a caller-supplied identity strategy.
    pub fn with_identity(identity: Arc<dyn IdentityRotation>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, identity })
    }

    /// Fetch a URL's body as text.
    ///
    /// Transient failures are retried with exponential backoff and jitter,
    /// up to three extra attempts; permanent failures return immediately.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(30))
            .with_max_times(3)
            .with_jitter();

        (|| async { self.fetch_once(url).await })
            .retry(&backoff)
            .when(|err: &FetchError| err.is_transient())
            .notify(|err, delay| {
                warn!(url, delay_ms = delay.as_millis() as u64, error = %err, "retrying fetch");
            })
            .await
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let identity = self.identity.next_identity();
        debug!(url, user_agent = %identity.user_agent, "requesting");

        let resp = self
            .client
            .get(url)
            .header(header::USER_AGENT, identity.user_agent.as_str())
            .header(header::ACCEPT, identity.accept.as_str())
            .header(header::ACCEPT_LANGUAGE, identity.accept_language.as_str())
            .header(header::REFERER, identity.referer.as_str())
            .header(header::CONNECTION, identity.connection.as_str())
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(url, err))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::from_status(url, status));
        }
        resp.text()
            .await
            .map_err(|err| FetchError::from_reqwest(url, err))
    }
}
