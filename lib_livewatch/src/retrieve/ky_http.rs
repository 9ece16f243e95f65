//! # HTTP Retrieval Utilities
//!
//! An asynchronous API client wrapper around `reqwest`. Each client carries
//! its own base URL, default headers, timeout and retry policy, so two
//! adapters never share backoff state.
//!
//! Retries are bounded and spaced by a fixed delay. Any failure counts:
//! transport errors, timeouts and every non-2xx status.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{Jitter, RetryTransientMiddleware, Retryable, RetryableStrategy};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors surfaced by [`ApiClient`].
#[derive(Debug, Error)]
pub enum HttpError {
    /// The base URL or a joined path could not be parsed.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The base URL cannot carry path segments (e.g. `mailto:`).
    #[error("url cannot be a base: {0}")]
    NotABase(String),

    /// The underlying `reqwest::Client` could not be built.
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),

    /// Network failure, timeout, or a middleware error after all attempts.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Numeric status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The body could not be read or decoded.
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Bounded retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Pause between two attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Construction options for [`ApiClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Per-request timeout.
    pub timeout: Option<Duration>,
    /// Sent with every request.
    pub default_headers: HeaderMap,
    /// Overrides the default user agent.
    pub user_agent: Option<String>,
    /// `None` disables retries entirely.
    pub retry: Option<RetryConfig>,
}

/// Treats every non-success outcome as worth another attempt.
struct RetryAnyFailure;

impl RetryableStrategy for RetryAnyFailure {
    fn handle(&self, res: &Result<reqwest::Response, reqwest_middleware::Error>) -> Option<Retryable> {
        match res {
            Ok(response) if response.status().is_success() => None,
            Ok(_) | Err(_) => Some(Retryable::Transient),
        }
    }
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`; handles base URLs, default headers
/// and automatic retries.
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL to which all relative paths are appended.
    base_url: Url,
}

impl ApiClient {
    /// Creates a new `ApiClient`.
    ///
    /// # Errors
    /// Fails if `base_url` is not an absolute URL or the TLS backend cannot
    /// be initialised.
    pub fn new(base_url: &str, options: ClientOptions) -> Result<Self, HttpError> {
        let url = Url::parse(base_url)?;
        if url.cannot_be_a_base() {
            return Err(HttpError::NotABase(base_url.to_string()));
        }

        let mut builder = reqwest::Client::builder().default_headers(options.default_headers);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(agent) = options.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder.build().map_err(HttpError::Build)?;

        let mut middleware = ClientBuilder::new(client);
        if let Some(retry) = options.retry.filter(|r| r.max_attempts > 1) {
            // Equal bounds and base 1 turn the exponential policy into a fixed delay.
            let policy = ExponentialBackoff::builder()
                .retry_bounds(retry.delay, retry.delay)
                .jitter(Jitter::None)
                .base(1)
                .build_with_max_retries(retry.max_attempts - 1);
            middleware = middleware.with(RetryTransientMiddleware::new_with_policy_and_strategy(
                policy,
                RetryAnyFailure,
            ));
        }

        Ok(Self {
            inner: middleware.build(),
            base_url: url,
        })
    }

    /// Builds an absolute URL from path segments and query pairs. Segments
    /// are percent-encoded, so identifiers can be passed verbatim.
    pub fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, HttpError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HttpError::NotABase(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Sends a request and rejects any non-2xx answer.
    pub async fn send(&self, method: Method, url: Url, headers: Option<HeaderMap>) -> Result<reqwest::Response, HttpError> {
        let mut req = self.inner.request(method, url.clone());
        if let Some(h) = headers {
            req = req.headers(h);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    /// `GET` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, HttpError> {
        self.send(Method::GET, url, None)
            .await?
            .json::<T>()
            .await
            .map_err(HttpError::Body)
    }

    /// `GET` and return the body as text.
    pub async fn get_text(&self, url: Url) -> Result<String, HttpError> {
        self.send(Method::GET, url, None)
            .await?
            .text()
            .await
            .map_err(HttpError::Body)
    }
}
