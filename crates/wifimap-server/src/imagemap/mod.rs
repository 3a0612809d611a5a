//! Image-map proxy: `GET /imagemap/{url}/{size}`.
//!
//! LINE fetches an image map at `{baseUrl}/{size}`. The base URL embeds the
//! static map URL as one percent-encoded path segment; this module fetches
//! that image, squares it to `size` pixels and returns it as PNG.

pub mod render;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use reqwest::{Client, Url};
use serde::Serialize;
use thiserror::Error;
use wifimap_core::{retry_with_backoff, AppConfig};

use crate::api::AppState;
use crate::breaker::CircuitBreaker;

const MAX_RETRY_DELAY_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("size must be an integer between 1 and {max}, got '{0}'", max = render::MAX_SIZE_PX)]
    InvalidSize(String),

    #[error("invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("image host '{0}' is not allowed")]
    HostNotAllowed(String),

    #[error("image fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("image upstream returned {0}")]
    UpstreamStatus(u16),

    #[error("image could not be decoded: {0}")]
    Decode(String),

    #[error("image could not be encoded: {0}")]
    Encode(String),

    #[error("image upstream is failing, try again later")]
    CircuitOpen,
}

impl ProxyError {
    fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidSize(_) | ProxyError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ProxyError::HostNotAllowed(_) => StatusCode::FORBIDDEN,
            ProxyError::Fetch(_) | ProxyError::UpstreamStatus(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ProxyError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::CircuitOpen => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ProxyError::InvalidSize(_) => "invalid_size",
            ProxyError::InvalidUrl(_) => "invalid_url",
            ProxyError::HostNotAllowed(_) => "host_not_allowed",
            ProxyError::Fetch(_) => "upstream_unreachable",
            ProxyError::UpstreamStatus(_) => "upstream_error",
            ProxyError::Decode(_) => "undecodable_image",
            ProxyError::Encode(_) => "encode_failed",
            ProxyError::CircuitOpen => "circuit_open",
        }
    }

    fn is_transient(&self) -> bool {
        match self {
            ProxyError::Fetch(e) => e.is_timeout() || e.is_connect(),
            ProxyError::UpstreamStatus(status) => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Failures that say the upstream itself is unhealthy.
    fn trips_breaker(&self) -> bool {
        match self {
            ProxyError::Fetch(_) => true,
            ProxyError::UpstreamStatus(status) => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProxyErrorBody {
    error: ProxyErrorDetail,
}

#[derive(Debug, Serialize)]
struct ProxyErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "image proxy failed");
        } else {
            tracing::warn!(error = %self, "image proxy rejected request");
        }
        (
            status,
            Json(ProxyErrorBody {
                error: ProxyErrorDetail {
                    code: self.code(),
                    message: self.to_string(),
                },
            }),
        )
            .into_response()
    }
}

/// Fetches map images from allow-listed hosts, with retries and a circuit
/// breaker in front of the upstream.
#[derive(Debug, Clone)]
pub struct ImageProxy {
    client: Client,
    allowed_hosts: Arc<[String]>,
    breaker: CircuitBreaker,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl ImageProxy {
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the HTTP client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("wifimap-bot/0.1 (imagemap)")
            .build()?;

        Ok(Self::new(
            client,
            config.image_proxy_allowed_hosts.clone(),
            CircuitBreaker::new(
                config.image_breaker_threshold,
                Duration::from_secs(config.image_breaker_cooldown_secs),
            ),
            config.image_max_retries,
            config.image_retry_backoff_base_ms,
        ))
    }

    #[must_use]
    pub fn new(
        client: Client,
        allowed_hosts: Vec<String>,
        breaker: CircuitBreaker,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Self {
        Self {
            client,
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            breaker,
            max_retries,
            backoff_base_ms,
        }
    }

    /// Parse the decoded `{url}` segment and check it against the allow-list.
    ///
    /// # Errors
    ///
    /// [`ProxyError::InvalidUrl`] for anything but an absolute http(s) URL
    /// with a host, [`ProxyError::HostNotAllowed`] for other hosts.
    pub fn check_url(&self, raw: &str) -> Result<Url, ProxyError> {
        let url = Url::parse(raw).map_err(|e| ProxyError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ProxyError::InvalidUrl("missing host".to_string()))?
            .to_ascii_lowercase();

        if self.allowed_hosts.iter().any(|allowed| *allowed == host) {
            Ok(url)
        } else {
            Err(ProxyError::HostNotAllowed(host))
        }
    }

    /// Fetch the image body, retrying transient failures.
    ///
    /// # Errors
    ///
    /// [`ProxyError::CircuitOpen`] without contacting the upstream while the
    /// breaker is open; otherwise the last fetch error.
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ProxyError> {
        if !self.breaker.allow().await {
            return Err(ProxyError::CircuitOpen);
        }

        let result = retry_with_backoff(
            self.max_retries,
            self.backoff_base_ms,
            MAX_RETRY_DELAY_MS,
            ProxyError::is_transient,
            || self.fetch_once(url),
        )
        .await;

        match &result {
            Ok(_) => self.breaker.record_success().await,
            Err(e) if e.trips_breaker() => self.breaker.record_failure().await,
            Err(_) => self.breaker.release_trial().await,
        }
        result
    }

    async fn fetch_once(&self, url: &Url) -> Result<Vec<u8>, ProxyError> {
        let mut response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::UpstreamStatus(status.as_u16()));
        }

        // Keep what arrived if the body is cut short; the decoder can salvage
        // a truncated PNG.
        let mut body = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) if !body.is_empty() => {
                    tracing::warn!(error = %e, received = body.len(), "image body cut short");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(body)
    }

    /// Validate, fetch and render one image-map tile.
    ///
    /// # Errors
    ///
    /// Any [`ProxyError`].
    pub async fn render(&self, raw_url: &str, raw_size: &str) -> Result<Vec<u8>, ProxyError> {
        let size = render::parse_size(raw_size)?;
        let url = self.check_url(raw_url)?;
        let bytes = self.fetch(&url).await?;

        tokio::task::spawn_blocking(move || render::render_square_png(&bytes, size))
            .await
            .map_err(|e| ProxyError::Encode(e.to_string()))?
    }
}

pub(crate) async fn serve_imagemap(
    State(state): State<AppState>,
    Path((url, size)): Path<(String, String)>,
) -> Result<impl IntoResponse, ProxyError> {
    let png = state.image_proxy.render(&url, &size).await?;
    tracing::debug!(size = %size, bytes = png.len(), "image map rendered");
    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        png,
    ))
}
