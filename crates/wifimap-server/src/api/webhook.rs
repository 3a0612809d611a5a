//! `POST /` — LINE webhook.
//!
//! The signature is checked against the raw body before anything is parsed.
//! Events are handled in delivery order and each gets at most one reply.
//! Reply failures are logged; LINE always gets `200 OK` once the signature
//! and envelope are valid.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use wifimap_core::OutboundMessage;
use wifimap_line::{parse_events, verify_signature, InboundEvent, LineError, SIGNATURE_HEADER};

use super::{ApiError, AppState};
use crate::middleware::RequestId;

pub(super) async fn receive(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = verify_signature(&state.config.line_channel_secret, &body, signature) {
        tracing::warn!(error = %e, "webhook rejected");
        let code = match e {
            LineError::MissingSignature => "missing_signature",
            _ => "invalid_signature",
        };
        return ApiError::new(req_id.0, code, e.to_string()).into_response();
    }

    tracing::debug!(body = %String::from_utf8_lossy(&body), "webhook received");

    let events = match parse_events(&body) {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!(error = %e, "webhook payload rejected");
            return ApiError::new(req_id.0, "bad_request", e.to_string()).into_response();
        }
    };

    let public_base_url = public_base_url(&state, &headers);
    for event in events {
        dispatch(&state, &public_base_url, event).await;
    }

    (StatusCode::OK, "OK").into_response()
}

/// Configured public URL, else `https://{Host}` of the webhook request.
fn public_base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.config.public_base_url {
        return url.trim_end_matches('/').to_string();
    }
    match headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
        Some(host) => format!("https://{host}"),
        None => {
            tracing::warn!("webhook without Host header; image map URL falls back to bind address");
            format!("http://{}", state.config.bind_addr)
        }
    }
}

async fn dispatch(state: &AppState, public_base_url: &str, event: InboundEvent) {
    let (reply_token, messages) = match event {
        InboundEvent::Text { reply_token, .. } => {
            (reply_token, vec![OutboundMessage::location_prompt()])
        }
        InboundEvent::Location {
            reply_token,
            location,
        } => {
            let messages = match state.replier.reply_for(location, public_base_url).await {
                Ok(reply) => {
                    tracing::info!(
                        candidates = reply.candidates.len(),
                        zoom = reply.map.zoom,
                        "location reply built"
                    );
                    reply.messages
                }
                Err(e) => {
                    tracing::error!(error = %e, "hotspot lookup failed");
                    vec![OutboundMessage::lookup_failed()]
                }
            };
            (reply_token, messages)
        }
        InboundEvent::Unsupported { kind } => {
            tracing::debug!(kind = %kind, "ignoring unsupported event");
            return;
        }
    };

    if let Err(e) = state.line.reply(&reply_token, &messages).await {
        tracing::error!(error = %e, "LINE reply failed");
    }
}
