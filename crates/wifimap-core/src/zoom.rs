//! Zoom level selection for the static map.

/// Zoom used when the farthest hotspot is at least [`BASE_RADIUS_KM`] away.
pub const BASE_ZOOM: u8 = 7;
/// Radius covered by the frame at [`BASE_ZOOM`]. Each zoom step halves it.
pub const BASE_RADIUS_KM: f64 = 100.0;
/// Highest zoom the static map service renders. Also bounds the loop when
/// there are no candidates (max distance 0).
pub const MAX_ZOOM: u8 = 21;

/// Pick a zoom level from the farthest candidate distance.
///
/// Starting at zoom 7 with a 100 km radius, the zoom is incremented and the
/// radius halved while the radius is still larger than `max_distance_km`.
/// The result is non-increasing in distance and never exceeds [`MAX_ZOOM`].
/// A NaN distance compares false and yields [`BASE_ZOOM`].
#[must_use]
pub fn estimate_zoom(max_distance_km: f64) -> u8 {
    let mut zoom = BASE_ZOOM;
    let mut radius_km = BASE_RADIUS_KM;

    while radius_km > max_distance_km && zoom < MAX_ZOOM {
        zoom += 1;
        radius_km /= 2.0;
    }

    zoom
}
