use thiserror::Error;

/// Startup configuration failures. These abort the process before it binds.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Failure of the nearest-hotspot lookup as seen by the reply pipeline.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("hotspot store unavailable: {0}")]
    Unavailable(String),

    #[error("hotspot query timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("hotspot query failed: {0}")]
    Failed(String),
}
