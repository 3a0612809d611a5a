//! Static map request construction.

use std::fmt::Write as _;

use serde::Serialize;

use crate::geo::{max_distance_km, LocationInput, RankedCandidate};
use crate::zoom::estimate_zoom;

/// Requested frame edge in logical pixels. With `scale=2` the service returns
/// an image twice this size, matching the image map base size.
pub const FRAME_SIZE_PX: u32 = 520;
pub const FRAME_SCALE: u32 = 2;

const USER_MARKER_COLOR: &str = "blue";
const HOTSPOT_MARKER_COLOR: &str = "red";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub color: &'static str,
    /// Empty for the user's own position.
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Everything needed to render the map for one reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapRenderSpec {
    pub center: LocationInput,
    pub zoom: u8,
    pub size_px: u32,
    pub scale: u32,
    pub markers: Vec<Marker>,
}

impl MapRenderSpec {
    /// User marker first, then one marker per candidate labelled by rank.
    #[must_use]
    pub fn for_candidates(center: LocationInput, candidates: &[RankedCandidate]) -> Self {
        let mut markers = Vec::with_capacity(candidates.len() + 1);
        markers.push(Marker {
            color: USER_MARKER_COLOR,
            label: String::new(),
            latitude: center.latitude,
            longitude: center.longitude,
        });
        markers.extend(candidates.iter().map(|c| Marker {
            color: HOTSPOT_MARKER_COLOR,
            label: c.rank.to_string(),
            latitude: c.hotspot.latitude,
            longitude: c.hotspot.longitude,
        }));

        Self {
            center,
            zoom: estimate_zoom(max_distance_km(candidates)),
            size_px: FRAME_SIZE_PX,
            scale: FRAME_SCALE,
            markers,
        }
    }

    /// Build the request URL. Markers become repeated `markers=` parameters
    /// in insertion order.
    #[must_use]
    pub fn to_url(&self, base_url: &str, api_key: &str) -> String {
        let mut url = format!(
            "{base_url}?center={},{}&zoom={}&size={size}x{size}&scale={}&maptype=roadmap&key={api_key}",
            self.center.latitude,
            self.center.longitude,
            self.zoom,
            self.scale,
            size = self.size_px,
        );
        for marker in &self.markers {
            // Writing into a String cannot fail.
            let _ = write!(
                url,
                "&markers=color:{}|label:{}|{},{}",
                marker.color, marker.label, marker.latitude, marker.longitude
            );
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{hotspot_fixture, rank_hotspots};

    const BASE: &str = "https://maps.googleapis.com/maps/api/staticmap";

    #[test]
    fn user_marker_comes_first_and_is_unlabelled() {
        let center = LocationInput::new(35.6586, 139.7454);
        let ranked = rank_hotspots(vec![
            hotspot_fixture(1, "a", 0.001),
            hotspot_fixture(2, "b", 0.002),
            hotspot_fixture(3, "c", 0.003),
        ]);
        let spec = MapRenderSpec::for_candidates(center, &ranked);

        assert_eq!(spec.markers.len(), 4);
        assert_eq!(spec.markers[0].color, "blue");
        assert!(spec.markers[0].label.is_empty());
        let labels: Vec<&str> = spec.markers[1..].iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "2", "3"]);
        assert!(spec.markers[1..].iter().all(|m| m.color == "red"));
    }

    #[test]
    fn zoom_follows_farthest_candidate() {
        let center = LocationInput::new(35.0, 139.0);
        // 0.003 degrees is about 0.33 km
        let ranked = rank_hotspots(vec![hotspot_fixture(1, "a", 0.003)]);
        let spec = MapRenderSpec::for_candidates(center, &ranked);
        assert_eq!(spec.zoom, estimate_zoom(ranked[0].distance_km));
        assert_eq!(spec.zoom, 16);
    }

    #[test]
    fn empty_candidates_render_only_the_user() {
        let spec = MapRenderSpec::for_candidates(LocationInput::new(35.0, 139.0), &[]);
        assert_eq!(spec.markers.len(), 1);
        assert_eq!(spec.zoom, crate::zoom::MAX_ZOOM);
    }

    #[test]
    fn url_lists_frame_parameters_then_markers() {
        let center = LocationInput::new(35.6586, 139.7454);
        let mut hotspot = hotspot_fixture(1, "a", 0.001);
        hotspot.latitude = 35.6595;
        hotspot.longitude = 139.7449;
        let ranked = rank_hotspots(vec![hotspot]);
        let spec = MapRenderSpec::for_candidates(center, &ranked);

        let url = spec.to_url(BASE, "KEY");
        assert_eq!(
            url,
            format!(
                "{BASE}?center=35.6586,139.7454&zoom={}&size=520x520&scale=2&maptype=roadmap&key=KEY\
                 &markers=color:blue|label:|35.6586,139.7454\
                 &markers=color:red|label:1|35.6595,139.7449",
                spec.zoom
            )
        );
    }

    #[test]
    fn url_has_one_markers_param_per_marker() {
        let ranked = rank_hotspots(
            (1..=5)
                .map(|i| hotspot_fixture(i, "x", 0.001 * f64::from(u32::try_from(i).unwrap())))
                .collect(),
        );
        let spec = MapRenderSpec::for_candidates(LocationInput::new(35.0, 139.0), &ranked);
        let url = spec.to_url(BASE, "KEY");
        assert_eq!(url.matches("&markers=").count(), 6);
    }
}
