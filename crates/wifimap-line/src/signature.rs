//! Webhook request signatures.
//!
//! LINE signs every webhook body with HMAC-SHA256 keyed by the channel secret
//! and sends the base64 digest in [`SIGNATURE_HEADER`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::LineError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

fn digest(channel_secret: &str, body: &[u8]) -> Result<Vec<u8>, LineError> {
    // HMAC accepts keys of any length; the error arm is unreachable in practice.
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())
        .map_err(|_| LineError::InvalidSignature)?;
    mac.update(body);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Base64 HMAC-SHA256 of `body` under `channel_secret`.
///
/// # Errors
///
/// Returns [`LineError::InvalidSignature`] if the MAC cannot be keyed.
pub fn sign(channel_secret: &str, body: &[u8]) -> Result<String, LineError> {
    Ok(STANDARD.encode(digest(channel_secret, body)?))
}

/// Check `signature` (the raw header value) against `body`.
///
/// # Errors
///
/// - [`LineError::MissingSignature`] when the header is absent or blank.
/// - [`LineError::InvalidSignature`] when it is not base64 or does not match.
pub fn verify_signature(
    channel_secret: &str,
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), LineError> {
    let signature = signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(LineError::MissingSignature)?;

    let provided = STANDARD
        .decode(signature)
        .map_err(|_| LineError::InvalidSignature)?;
    let expected = digest(channel_secret, body)?;

    if bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
        Ok(())
    } else {
        Err(LineError::InvalidSignature)
    }
}
