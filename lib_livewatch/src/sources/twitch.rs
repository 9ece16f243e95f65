//! # Twitch Adapter
//!
//! Two Helix calls per creator: `users?login=` for the profile image and
//! `streams?user_login=` for the live flag. Every call retries on its own,
//! with a fixed pause between attempts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{LiveSource, SourceError};
use crate::models::{is_blank, SourceResult};
use crate::retrieve::{ApiClient, ClientOptions, HttpError, RetryConfig};

/// Connection settings for the Helix API.
#[derive(Debug, Clone)]
pub struct TwitchConfig {
    /// Helix root, normally `https://api.twitch.tv/helix/`.
    pub api_base: String,
    /// Sent as `Client-ID`.
    pub client_id: Option<String>,
    /// Sent as `Authorization: Bearer ...`.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts and pause per call.
    pub retry: RetryConfig,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitch.tv/helix/".to_string(),
            client_id: None,
            token: None,
            timeout: Duration::from_secs(7),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HelixPage<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    #[serde(default)]
    profile_image_url: String,
}

/// Live-status lookups against the Twitch Helix API.
pub struct TwitchSource {
    client: ApiClient,
}

impl TwitchSource {
    /// Builds the adapter. Missing credentials are not an error here; Helix
    /// will reject the calls and the lookups come back invalid.
    pub fn new(config: &TwitchConfig) -> Result<Self, HttpError> {
        let client = ApiClient::new(
            &config.api_base,
            ClientOptions {
                timeout: Some(config.timeout),
                default_headers: auth_headers(config),
                user_agent: None,
                retry: Some(config.retry),
            },
        )?;
        Ok(Self { client })
    }
}

fn auth_headers(config: &TwitchConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(id) = config.client_id.as_deref().filter(|v| !is_blank(v)) {
        match HeaderValue::from_str(id.trim()) {
            Ok(value) => {
                headers.insert("Client-ID", value);
            }
            Err(_) => warn!("TWITCH_CLIENT_ID contains invalid header characters, not sent"),
        }
    }
    if let Some(token) = config.token.as_deref().filter(|v| !is_blank(v)) {
        match HeaderValue::from_str(&format!("Bearer {}", token.trim())) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => warn!("TWITCH_TOKEN contains invalid header characters, not sent"),
        }
    }
    if headers.is_empty() {
        warn!("Twitch credentials are not configured; lookups will fail");
    }
    headers
}

#[async_trait]
impl LiveSource for TwitchSource {
    fn platform(&self) -> &'static str {
        "twitch"
    }

    async fn lookup(&self, login: &str) -> Result<SourceResult, SourceError> {
        if is_blank(login) {
            return Ok(SourceResult::invalid());
        }
        let login = login.trim();

        let users: HelixPage<HelixUser> = self
            .client
            .get_json(self.client.url(&["users"], &[("login", login)])?)
            .await?;
        let Some(user) = users.data.into_iter().next() else {
            return Err(SourceError::UserNotFound(login.to_string()));
        };

        let streams: HelixPage<IgnoredAny> = self
            .client
            .get_json(self.client.url(&["streams"], &[("user_login", login)])?)
            .await?;
        let live = !streams.data.is_empty();
        debug!(login, live, "twitch lookup done");

        Ok(SourceResult {
            valid: true,
            live,
            icon_url: user.profile_image_url,
            video_id: None,
        })
    }
}
