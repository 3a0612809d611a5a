//! LINE wire format for [`OutboundMessage`].

use serde_json::{json, Value};
use wifimap_core::{CarouselEntry, LinkAction, OutboundMessage};

/// Column text limit for a carousel column that has a title but no image.
pub const COLUMN_TEXT_MAX_CHARS: usize = 60;
pub const ACTION_LABEL_MAX_CHARS: usize = 20;
pub const ALT_TEXT_MAX_CHARS: usize = 400;

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn uri_action(action: &LinkAction) -> Value {
    json!({
        "type": "uri",
        "label": clip(&action.label, ACTION_LABEL_MAX_CHARS),
        "uri": action.uri,
    })
}

fn column(entry: &CarouselEntry) -> Value {
    json!({
        "title": entry.title,
        "text": clip(&entry.body_text, COLUMN_TEXT_MAX_CHARS),
        "actions": [uri_action(&entry.primary_action), uri_action(&entry.secondary_action)],
    })
}

/// JSON object LINE expects in the `messages` array.
#[must_use]
pub fn to_wire(message: &OutboundMessage) -> Value {
    match message {
        OutboundMessage::Text { text } => json!({ "type": "text", "text": text }),
        OutboundMessage::ImageMap {
            base_url,
            alt_text,
            base_size,
        } => json!({
            "type": "imagemap",
            "baseUrl": base_url,
            "altText": clip(alt_text, ALT_TEXT_MAX_CHARS),
            "baseSize": { "width": base_size, "height": base_size },
            "actions": [],
        }),
        OutboundMessage::Carousel { alt_text, columns } => json!({
            "type": "template",
            "altText": clip(alt_text, ALT_TEXT_MAX_CHARS),
            "template": {
                "type": "carousel",
                "columns": columns.iter().map(column).collect::<Vec<_>>(),
            },
        }),
    }
}
