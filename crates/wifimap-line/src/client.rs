//! HTTP client for the LINE Messaging API reply endpoint.

use std::time::Duration;

use reqwest::{Client, Url};
use wifimap_core::{retry_with_backoff, AppConfig, OutboundMessage};

use crate::error::LineError;
use crate::message::to_wire;
use crate::retry::{is_retriable, MAX_RETRY_DELAY_MS};

const REPLY_PATH: &str = "v2/bot/message/reply";
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BACKOFF_BASE_MS: u64 = 500;

/// Client for the reply endpoint.
///
/// Use [`LineClient::from_config`] in the server or
/// [`LineClient::with_base_url`] to point at a mock server in tests.
#[derive(Clone)]
pub struct LineClient {
    client: Client,
    access_token: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl LineClient {
    /// Creates a client from the channel token, API base and HTTP timeout in
    /// the application config.
    ///
    /// # Errors
    ///
    /// Same as [`LineClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, LineError> {
        Self::with_base_url(
            &config.line_channel_access_token,
            config.http_timeout_secs,
            &config.line_api_base_url,
        )
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`LineError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`LineError::InvalidBaseUrl`] if `base_url`
    /// is not a valid URL.
    pub fn with_base_url(
        access_token: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, LineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("wifimap-bot/0.1")
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| LineError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            access_token: access_token.to_owned(),
            base_url,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    fn reply_url(&self) -> Result<Url, LineError> {
        self.base_url
            .join(REPLY_PATH)
            .map_err(|e| LineError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Sends `messages` as the reply to the event that issued `reply_token`.
    ///
    /// # Errors
    ///
    /// - [`LineError::Api`] if LINE answers with a non-2xx status.
    /// - [`LineError::Http`] on network failure.
    pub async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<(), LineError> {
        let url = self.reply_url()?;
        let body = serde_json::json!({
            "replyToken": reply_token,
            "messages": messages.iter().map(to_wire).collect::<Vec<_>>(),
        });

        retry_with_backoff(
            self.max_retries,
            self.backoff_base_ms,
            MAX_RETRY_DELAY_MS,
            is_retriable,
            || self.post_once(&url, &body),
        )
        .await?;

        tracing::debug!(messages = messages.len(), "reply sent");
        Ok(())
    }

    async fn post_once(&self, url: &Url, body: &serde_json::Value) -> Result<(), LineError> {
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(LineError::Api {
            status: status.as_u16(),
            body,
        })
    }
}
