//! In-memory store and state builders shared by the route tests.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use wifimap_core::{
    AppConfig, DatabaseEndpoint, Hotspot, HotspotStore, LocationInput, LocationReplier,
    QueryError,
};
use wifimap_line::LineClient;

use crate::api::AppState;
use crate::breaker::CircuitBreaker;
use crate::imagemap::ImageProxy;

/// `distance_degrees` north of Tokyo Tower.
pub(crate) fn hotspot(id: i64, name: &str, distance_degrees: f64) -> Hotspot {
    Hotspot {
        id,
        name: name.to_string(),
        address: "Minato, Tokyo".to_string(),
        detail: String::new(),
        latitude: 35.6586 + distance_degrees,
        longitude: 139.7454,
        identifier: format!("FREE_WIFI_{id}"),
        reference_url: format!("https://wifi.example.com/spots/{id}"),
        distance_degrees,
    }
}

/// Returns its hotspots, already nearest first, cut to the requested limit.
pub(crate) struct FixedStore {
    hotspots: Vec<Hotspot>,
}

impl FixedStore {
    pub(crate) fn new(hotspots: Vec<Hotspot>) -> Self {
        Self { hotspots }
    }
}

#[async_trait]
impl HotspotStore for FixedStore {
    async fn nearest(
        &self,
        _location: LocationInput,
        limit: u32,
    ) -> Result<Vec<Hotspot>, QueryError> {
        Ok(self
            .hotspots
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), QueryError> {
        Ok(())
    }
}

pub(crate) struct UnreachableStore;

#[async_trait]
impl HotspotStore for UnreachableStore {
    async fn nearest(
        &self,
        _location: LocationInput,
        _limit: u32,
    ) -> Result<Vec<Hotspot>, QueryError> {
        Err(QueryError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), QueryError> {
        Err(QueryError::Unavailable("connection refused".to_string()))
    }
}

pub(crate) struct TestStateOptions {
    pub store: Arc<dyn HotspotStore>,
    pub max_results: u32,
    pub public_base_url: Option<String>,
    pub line_base_url: String,
    pub breaker_threshold: u32,
}

impl TestStateOptions {
    pub(crate) fn new(store: Arc<dyn HotspotStore>) -> Self {
        Self {
            store,
            max_results: 5,
            public_base_url: None,
            // Nothing listens here; tests that reply point this at a mock.
            line_base_url: "http://127.0.0.1:9".to_string(),
            breaker_threshold: 5,
        }
    }
}

pub(crate) fn test_config(options: &TestStateOptions) -> AppConfig {
    AppConfig {
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
        log_level: "debug".to_string(),
        public_base_url: options.public_base_url.clone(),
        line_channel_access_token: "test-token".to_string(),
        line_channel_secret: "test-channel-secret".to_string(),
        line_api_base_url: options.line_base_url.clone(),
        static_map_api_key: "test-map-key".to_string(),
        static_map_base_url: "https://maps.googleapis.com/maps/api/staticmap".to_string(),
        max_results: options.max_results,
        db_endpoint: DatabaseEndpoint::Tcp {
            host: "localhost".to_string(),
            port: 3306,
        },
        db_user: "bot".to_string(),
        db_password: "pw".to_string(),
        db_name: "wifi".to_string(),
        db_max_connections: 5,
        db_min_connections: 0,
        db_acquire_timeout_secs: 5,
        db_query_timeout_secs: 5,
        db_max_retries: 0,
        db_retry_backoff_base_ms: 0,
        http_timeout_secs: 5,
        image_max_retries: 0,
        image_retry_backoff_base_ms: 0,
        image_breaker_threshold: options.breaker_threshold,
        image_breaker_cooldown_secs: 60,
        image_proxy_allowed_hosts: vec![
            "maps.googleapis.com".to_string(),
            "127.0.0.1".to_string(),
        ],
    }
}

pub(crate) fn test_state(options: TestStateOptions) -> AppState {
    let config = Arc::new(test_config(&options));
    let line = LineClient::from_config(&config)
        .expect("line client")
        .with_retry_policy(0, 0);
    let image_proxy = ImageProxy::new(
        reqwest::Client::new(),
        config.image_proxy_allowed_hosts.clone(),
        CircuitBreaker::new(
            config.image_breaker_threshold,
            Duration::from_secs(config.image_breaker_cooldown_secs),
        ),
        config.image_max_retries,
        config.image_retry_backoff_base_ms,
    );

    AppState {
        replier: LocationReplier::new(options.store, &config),
        line,
        image_proxy,
        config,
    }
}
