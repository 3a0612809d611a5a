//! Webhook payload parsing.
//!
//! The payload is parsed in two steps: the envelope must be valid JSON with an
//! `events` array, then each event is decoded on its own. An event that does
//! not decode (new event types, missing fields) becomes
//! [`InboundEvent::Unsupported`] instead of failing the whole delivery.

use serde::Deserialize;
use wifimap_core::LocationInput;

use crate::error::LineError;

/// A webhook event reduced to what the bot acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Text {
        reply_token: String,
        text: String,
    },
    Location {
        reply_token: String,
        location: LocationInput,
    },
    Unsupported {
        kind: String,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    events: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    reply_token: Option<String>,
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawMessage {
    Text { text: String },
    Location { latitude: f64, longitude: f64 },
    #[serde(other)]
    Other,
}

/// Parse a webhook body into events, in delivery order.
///
/// # Errors
///
/// Returns [`LineError::Payload`] if the body is not a JSON object with an
/// `events` array.
pub fn parse_events(body: &[u8]) -> Result<Vec<InboundEvent>, LineError> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    Ok(envelope.events.into_iter().map(classify).collect())
}

fn kind_of(value: &serde_json::Value) -> String {
    let event_kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown");
    match value
        .get("message")
        .and_then(|m| m.get("type"))
        .and_then(serde_json::Value::as_str)
    {
        Some(message_kind) => format!("{event_kind}/{message_kind}"),
        None => event_kind.to_string(),
    }
}

fn in_range(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

fn classify(value: serde_json::Value) -> InboundEvent {
    let kind = kind_of(&value);
    let Ok(event) = serde_json::from_value::<RawEvent>(value) else {
        return InboundEvent::Unsupported { kind };
    };

    match (event.kind.as_str(), event.reply_token, event.message) {
        ("message", Some(reply_token), Some(RawMessage::Text { text })) => {
            InboundEvent::Text { reply_token, text }
        }
        ("message", Some(reply_token), Some(RawMessage::Location { latitude, longitude }))
            if in_range(latitude, longitude) =>
        {
            InboundEvent::Location {
                reply_token,
                location: LocationInput::new(latitude, longitude),
            }
        }
        _ => InboundEvent::Unsupported { kind },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: &serde_json::Value) -> Vec<InboundEvent> {
        parse_events(value.to_string().as_bytes()).expect("payload should parse")
    }

    #[test]
    fn text_message_is_parsed() {
        let events = parse(&serde_json::json!({
            "destination": "U123",
            "events": [{
                "type": "message",
                "mode": "active",
                "timestamp": 1_700_000_000_000_u64,
                "source": { "type": "user", "userId": "U456" },
                "webhookEventId": "01H",
                "replyToken": "r-1",
                "message": { "id": "1", "type": "text", "text": "こんにちは" }
            }]
        }));
        assert_eq!(
            events,
            vec![InboundEvent::Text {
                reply_token: "r-1".to_string(),
                text: "こんにちは".to_string(),
            }]
        );
    }

    #[test]
    fn location_message_is_parsed() {
        let events = parse(&serde_json::json!({
            "events": [{
                "type": "message",
                "replyToken": "r-2",
                "message": {
                    "id": "2",
                    "type": "location",
                    "title": "Tokyo Tower",
                    "address": "4-2-8 Shibakoen, Minato",
                    "latitude": 35.6586,
                    "longitude": 139.7454
                }
            }]
        }));
        assert_eq!(
            events,
            vec![InboundEvent::Location {
                reply_token: "r-2".to_string(),
                location: LocationInput::new(35.6586, 139.7454),
            }]
        );
    }

    #[test]
    fn other_events_and_messages_are_unsupported() {
        let events = parse(&serde_json::json!({
            "events": [
                { "type": "follow", "replyToken": "r-3" },
                {
                    "type": "message",
                    "replyToken": "r-4",
                    "message": { "id": "3", "type": "sticker", "packageId": "1", "stickerId": "2" }
                },
                { "type": "unfollow" }
            ]
        }));
        assert_eq!(
            events,
            vec![
                InboundEvent::Unsupported { kind: "follow".to_string() },
                InboundEvent::Unsupported { kind: "message/sticker".to_string() },
                InboundEvent::Unsupported { kind: "unfollow".to_string() },
            ]
        );
    }

    #[test]
    fn malformed_location_does_not_fail_the_delivery() {
        let events = parse(&serde_json::json!({
            "events": [
                {
                    "type": "message",
                    "replyToken": "r-5",
                    "message": { "id": "4", "type": "location", "latitude": "north" }
                },
                {
                    "type": "message",
                    "replyToken": "r-6",
                    "message": { "id": "5", "type": "location", "latitude": 123.0, "longitude": 0.0 }
                },
                {
                    "type": "message",
                    "replyToken": "r-7",
                    "message": { "id": "6", "type": "text", "text": "hi" }
                }
            ]
        }));
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], InboundEvent::Unsupported { kind } if kind == "message/location"));
        assert!(matches!(&events[1], InboundEvent::Unsupported { .. }));
        assert!(matches!(&events[2], InboundEvent::Text { .. }));
    }

    #[test]
    fn empty_or_missing_events_yield_nothing() {
        assert!(parse(&serde_json::json!({ "destination": "U1", "events": [] })).is_empty());
        assert!(parse(&serde_json::json!({ "destination": "U1" })).is_empty());
    }

    #[test]
    fn non_json_body_is_a_payload_error() {
        assert!(matches!(
            parse_events(b"not json"),
            Err(LineError::Payload(_))
        ));
        assert!(matches!(
            parse_events(br#"{"events": {}}"#),
            Err(LineError::Payload(_))
        ));
    }
}
