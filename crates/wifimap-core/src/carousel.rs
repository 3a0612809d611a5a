//! Turns ranked hotspots into carousel columns.

use serde::Serialize;

use crate::config::host_of;
use crate::geo::{Hotspot, RankedCandidate};

/// LINE's limit for a carousel column title.
pub const TITLE_MAX_CHARS: usize = 40;
const ELLIPSIS: &str = "...";

const MAP_SEARCH_LABEL: &str = "Googleマップで開く";
const PROVIDER_LABEL: &str = "Wi-Fi提供元HP";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkAction {
    pub label: String,
    pub uri: String,
}

/// One carousel column, already sized for the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarouselEntry {
    pub title: String,
    pub body_text: String,
    pub primary_action: LinkAction,
    pub secondary_action: LinkAction,
}

/// `"{rank}：{name}"`, cut to 37 characters plus `"..."` when it would
/// exceed [`TITLE_MAX_CHARS`]. Lengths are counted in `char`s.
#[must_use]
pub fn format_title(rank: u32, name: &str) -> String {
    let title = format!("{rank}：{name}");
    if title.chars().count() <= TITLE_MAX_CHARS {
        return title;
    }

    let keep = TITLE_MAX_CHARS - ELLIPSIS.chars().count();
    let mut truncated: String = title.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

#[must_use]
pub fn format_body(distance_meters: i64, identifier: &str) -> String {
    format!("指定位置から{distance_meters}m\nSSID：{identifier}")
}

#[must_use]
pub fn map_search_uri(latitude: f64, longitude: f64) -> String {
    format!("https://www.google.com/maps/search/?api=1&query={latitude},{longitude}")
}

/// The provider's page when it is an absolute http(s) URL with a host.
/// LINE rejects the whole carousel over one bad `uri`, so anything else
/// (including a NULL column read as empty) links to the map search instead.
#[must_use]
pub fn provider_uri(hotspot: &Hotspot) -> String {
    let url = hotspot.reference_url.trim();
    if host_of(url).is_some() && !url.contains(char::is_whitespace) {
        url.to_string()
    } else {
        map_search_uri(hotspot.latitude, hotspot.longitude)
    }
}

#[must_use]
pub fn format_entry(candidate: &RankedCandidate) -> CarouselEntry {
    let hotspot = &candidate.hotspot;
    CarouselEntry {
        title: format_title(candidate.rank, &hotspot.name),
        body_text: format_body(candidate.distance_meters, &hotspot.identifier),
        primary_action: LinkAction {
            label: MAP_SEARCH_LABEL.to_string(),
            uri: map_search_uri(hotspot.latitude, hotspot.longitude),
        },
        secondary_action: LinkAction {
            label: PROVIDER_LABEL.to_string(),
            uri: provider_uri(hotspot),
        },
    }
}

#[must_use]
pub fn format_entries(candidates: &[RankedCandidate]) -> Vec<CarouselEntry> {
    candidates.iter().map(format_entry).collect()
}
