use std::net::SocketAddr;
use std::path::PathBuf;

/// Where the MySQL server is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseEndpoint {
    /// Unix domain socket, e.g. `/cloudsql/<connection-name>`.
    Socket(PathBuf),
    Tcp { host: String, port: u16 },
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Public origin used to build image map URLs. When `None` the webhook
    /// request's `Host` header is used with an `https` scheme.
    pub public_base_url: Option<String>,
    pub line_channel_access_token: String,
    pub line_channel_secret: String,
    pub line_api_base_url: String,
    pub static_map_api_key: String,
    pub static_map_base_url: String,
    pub max_results: u32,
    pub db_endpoint: DatabaseEndpoint,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub db_query_timeout_secs: u64,
    pub db_max_retries: u32,
    pub db_retry_backoff_base_ms: u64,
    pub http_timeout_secs: u64,
    pub image_max_retries: u32,
    pub image_retry_backoff_base_ms: u64,
    pub image_breaker_threshold: u32,
    pub image_breaker_cooldown_secs: u64,
    pub image_proxy_allowed_hosts: Vec<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("public_base_url", &self.public_base_url)
            .field("line_channel_access_token", &"[redacted]")
            .field("line_channel_secret", &"[redacted]")
            .field("line_api_base_url", &self.line_api_base_url)
            .field("static_map_api_key", &"[redacted]")
            .field("static_map_base_url", &self.static_map_base_url)
            .field("max_results", &self.max_results)
            .field("db_endpoint", &self.db_endpoint)
            .field("db_user", &self.db_user)
            .field("db_password", &"[redacted]")
            .field("db_name", &self.db_name)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("db_query_timeout_secs", &self.db_query_timeout_secs)
            .field("db_max_retries", &self.db_max_retries)
            .field("db_retry_backoff_base_ms", &self.db_retry_backoff_base_ms)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("image_max_retries", &self.image_max_retries)
            .field(
                "image_retry_backoff_base_ms",
                &self.image_retry_backoff_base_ms,
            )
            .field("image_breaker_threshold", &self.image_breaker_threshold)
            .field(
                "image_breaker_cooldown_secs",
                &self.image_breaker_cooldown_secs,
            )
            .field("image_proxy_allowed_hosts", &self.image_proxy_allowed_hosts)
            .finish()
    }
}
