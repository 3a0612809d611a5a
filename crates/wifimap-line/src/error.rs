use thiserror::Error;

/// Errors returned by the LINE webhook and reply client.
#[derive(Debug, Error)]
pub enum LineError {
    /// The request carried no `x-line-signature` header.
    #[error("missing webhook signature")]
    MissingSignature,

    /// The signature did not match the body under the channel secret.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// The webhook body was not the JSON shape LINE sends.
    #[error("malformed webhook payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured API base URL could not be parsed.
    #[error("invalid LINE API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The reply API answered with a non-2xx status.
    #[error("LINE API returned {status}: {body}")]
    Api { status: u16, body: String },
}
