//! Outbound reply messages, independent of the messaging platform's wire
//! format.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::carousel::CarouselEntry;

/// Edge length the platform uses as the image map's base size.
pub const IMAGEMAP_BASE_SIZE: u32 = 1040;

pub const IMAGEMAP_ALT_TEXT: &str = "地図";
pub const CAROUSEL_ALT_TEXT: &str = "近くのWi-Fi情報";
pub const LOCATION_PROMPT_TEXT: &str = "下のボタンから位置情報を送ってね";
pub const NO_RESULTS_TEXT: &str = "近くにWi-Fiスポットが見つかりませんでした";
pub const LOOKUP_FAILED_TEXT: &str =
    "Wi-Fi情報の取得に失敗しました。しばらくしてからもう一度お試しください";

/// Everything except `A-Z a-z 0-9 - . _ ~` is escaped, so the encoded URL is
/// a single path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text {
        text: String,
    },
    ImageMap {
        base_url: String,
        alt_text: String,
        base_size: u32,
    },
    Carousel {
        alt_text: String,
        columns: Vec<CarouselEntry>,
    },
}

impl OutboundMessage {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn location_prompt() -> Self {
        Self::text(LOCATION_PROMPT_TEXT)
    }

    #[must_use]
    pub fn lookup_failed() -> Self {
        Self::text(LOOKUP_FAILED_TEXT)
    }
}

/// `{public_base_url}/imagemap/{encoded map url}`. The platform appends
/// `/{width}` when it fetches the image.
#[must_use]
pub fn imagemap_base_url(public_base_url: &str, map_url: &str) -> String {
    format!(
        "{}/imagemap/{}",
        public_base_url.trim_end_matches('/'),
        utf8_percent_encode(map_url, PATH_SEGMENT)
    )
}

/// Image map first, then the carousel.
///
/// A carousel needs at least one column, so an empty result set is answered
/// with a text message in its place. The map is sent either way.
#[must_use]
pub fn assemble_reply(
    public_base_url: &str,
    map_url: &str,
    entries: Vec<CarouselEntry>,
) -> Vec<OutboundMessage> {
    let image_map = OutboundMessage::ImageMap {
        base_url: imagemap_base_url(public_base_url, map_url),
        alt_text: IMAGEMAP_ALT_TEXT.to_string(),
        base_size: IMAGEMAP_BASE_SIZE,
    };

    let listing = if entries.is_empty() {
        OutboundMessage::text(NO_RESULTS_TEXT)
    } else {
        OutboundMessage::Carousel {
            alt_text: CAROUSEL_ALT_TEXT.to_string(),
            columns: entries,
        }
    };

    vec![image_map, listing]
}
