//! Retry policy for the reply API.
//!
//! A reply token is consumed by the first request LINE accepts, so only
//! failures where LINE cannot have processed the request are retried: the
//! connection was never established, or LINE answered 429.

use crate::error::LineError;

/// Back-off ceiling for reply retries.
pub(crate) const MAX_RETRY_DELAY_MS: u64 = 10_000;

pub(crate) fn is_retriable(err: &LineError) -> bool {
    match err {
        LineError::Http(e) => e.is_connect(),
        LineError::Api { status, .. } => *status == 429,
        LineError::MissingSignature
        | LineError::InvalidSignature
        | LineError::Payload(_)
        | LineError::InvalidBaseUrl { .. } => false,
    }
}
