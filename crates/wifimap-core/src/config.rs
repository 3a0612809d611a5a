use std::path::PathBuf;

use crate::app_config::{AppConfig, DatabaseEndpoint};
use crate::ConfigError;

const DEFAULT_LINE_API_BASE_URL: &str = "https://api.line.me";
const DEFAULT_STATIC_MAP_BASE_URL: &str = "https://maps.googleapis.com/maps/api/staticmap";

/// LINE rejects carousel templates with more than ten columns.
pub const MAX_CAROUSEL_COLUMNS: u32 = 10;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// The parsing and validation lives here, decoupled from the real process
/// environment so it can be exercised with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default =
        |var: &str, default: &str| -> String { optional(var).unwrap_or_else(|| default.to_string()) };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let line_channel_access_token = require("LINE_BOT_CHANNEL_ACCESS_TOKEN")?;
    let line_channel_secret = require("LINE_BOT_CHANNEL_SECRET")?;
    let static_map_api_key = require("GOOGLE_MAPS_STATIC_API_KEY")?;
    let db_user = require("MYSQL_USER")?;
    let db_password = require("MYSQL_PASSWORD")?;
    let db_name = require("MYSQL_DATABASE")?;

    let max_results = require("MAX_WIFI_NUM")?
        .trim()
        .parse::<u32>()
        .map_err(|e| invalid("MAX_WIFI_NUM", e.to_string()))?;
    if !(1..=MAX_CAROUSEL_COLUMNS).contains(&max_results) {
        return Err(invalid(
            "MAX_WIFI_NUM",
            format!("must be between 1 and {MAX_CAROUSEL_COLUMNS}, got {max_results}"),
        ));
    }

    let db_endpoint = parse_db_endpoint(&optional)?;

    let bind_addr = or_default("WIFIMAP_BIND_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("WIFIMAP_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("WIFIMAP_LOG_LEVEL", "info");
    let public_base_url =
        optional("WIFIMAP_PUBLIC_BASE_URL").map(|u| u.trim_end_matches('/').to_string());
    let line_api_base_url = or_default("WIFIMAP_LINE_API_BASE_URL", DEFAULT_LINE_API_BASE_URL)
        .trim_end_matches('/')
        .to_string();
    let static_map_base_url =
        or_default("WIFIMAP_STATIC_MAP_BASE_URL", DEFAULT_STATIC_MAP_BASE_URL);

    let db_max_connections = parse_u32("WIFIMAP_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("WIFIMAP_DB_MIN_CONNECTIONS", "0")?;
    let db_acquire_timeout_secs = parse_u64("WIFIMAP_DB_ACQUIRE_TIMEOUT_SECS", "5")?;
    let db_query_timeout_secs = parse_u64("WIFIMAP_DB_QUERY_TIMEOUT_SECS", "5")?;
    let db_max_retries = parse_u32("WIFIMAP_DB_MAX_RETRIES", "2")?;
    let db_retry_backoff_base_ms = parse_u64("WIFIMAP_DB_RETRY_BACKOFF_BASE_MS", "200")?;

    let http_timeout_secs = parse_u64("WIFIMAP_HTTP_TIMEOUT_SECS", "10")?;
    let image_max_retries = parse_u32("WIFIMAP_IMAGE_MAX_RETRIES", "2")?;
    let image_retry_backoff_base_ms = parse_u64("WIFIMAP_IMAGE_RETRY_BACKOFF_BASE_MS", "250")?;
    let image_breaker_threshold = parse_u32("WIFIMAP_IMAGE_BREAKER_THRESHOLD", "5")?;
    let image_breaker_cooldown_secs = parse_u64("WIFIMAP_IMAGE_BREAKER_COOLDOWN_SECS", "30")?;

    let image_proxy_allowed_hosts = match optional("WIFIMAP_IMAGE_PROXY_ALLOWED_HOSTS") {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_lowercase)
            .collect(),
        None => {
            let host = host_of(&static_map_base_url).ok_or_else(|| {
                invalid(
                    "WIFIMAP_STATIC_MAP_BASE_URL",
                    format!("no host in '{static_map_base_url}'"),
                )
            })?;
            vec![host.to_ascii_lowercase()]
        }
    };

    Ok(AppConfig {
        bind_addr,
        log_level,
        public_base_url,
        line_channel_access_token,
        line_channel_secret,
        line_api_base_url,
        static_map_api_key,
        static_map_base_url,
        max_results,
        db_endpoint,
        db_user,
        db_password,
        db_name,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        db_query_timeout_secs,
        db_max_retries,
        db_retry_backoff_base_ms,
        http_timeout_secs,
        image_max_retries,
        image_retry_backoff_base_ms,
        image_breaker_threshold,
        image_breaker_cooldown_secs,
        image_proxy_allowed_hosts,
    })
}

/// `MYSQL_CONNECTION_NAME` (a Cloud SQL instance reached through its unix
/// socket) takes precedence over `MYSQL_HOST`. One of them must be set.
fn parse_db_endpoint<F>(optional: &F) -> Result<DatabaseEndpoint, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = optional("MYSQL_CONNECTION_NAME") {
        return Ok(DatabaseEndpoint::Socket(
            PathBuf::from("/cloudsql").join(name),
        ));
    }

    let host = optional("MYSQL_HOST").ok_or_else(|| {
        ConfigError::MissingEnvVar("MYSQL_HOST (or MYSQL_CONNECTION_NAME)".to_string())
    })?;
    let port = match optional("MYSQL_PORT") {
        Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidEnvVar {
            var: "MYSQL_PORT".to_string(),
            reason: e.to_string(),
        })?,
        None => 3306,
    };

    Ok(DatabaseEndpoint::Tcp { host, port })
}

/// Extract the host component of an absolute `http(s)` URL.
#[must_use]
pub fn host_of(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?;
    let host = host.split(':').next()?;
    (!host.is_empty()).then_some(host)
}
