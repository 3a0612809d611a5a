//! Locations, hotspot records and the degree-to-metre conversion used for
//! display.

use serde::{Deserialize, Serialize};

/// Kilometres per degree of arc on the equator.
///
/// Distances coming back from the store are planar lengths in degrees; they
/// are converted with this single factor regardless of latitude.
pub const KM_PER_DEGREE: f64 = 40075.0 / 360.0;

/// A coordinate pair shared by a user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationInput {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationInput {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A free Wi-Fi spot as returned by the nearest-neighbor query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub detail: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Network name (SSID).
    pub identifier: String,
    pub reference_url: String,
    /// Planar distance from the query point, in degrees.
    pub distance_degrees: f64,
}

/// A hotspot with its 1-based position in the query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub rank: u32,
    pub hotspot: Hotspot,
    pub distance_km: f64,
    pub distance_meters: i64,
}

#[must_use]
pub fn degrees_to_km(degrees: f64) -> f64 {
    degrees * KM_PER_DEGREE
}

/// Whole metres, rounded toward negative infinity.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn km_to_meters(km: f64) -> i64 {
    (km * 1000.0).floor() as i64
}

/// Attach ranks and display distances, keeping the store's order.
#[must_use]
pub fn rank_hotspots(hotspots: Vec<Hotspot>) -> Vec<RankedCandidate> {
    hotspots
        .into_iter()
        .zip(1u32..)
        .map(|(hotspot, rank)| {
            let distance_km = degrees_to_km(hotspot.distance_degrees);
            RankedCandidate {
                rank,
                distance_meters: km_to_meters(distance_km),
                distance_km,
                hotspot,
            }
        })
        .collect()
}

/// Largest candidate distance in km, or `0.0` when there are none.
#[must_use]
pub fn max_distance_km(candidates: &[RankedCandidate]) -> f64 {
    candidates
        .iter()
        .map(|c| c.distance_km)
        .fold(0.0, f64::max)
}

#[cfg(test)]
pub(crate) fn hotspot_fixture(id: i64, name: &str, distance_degrees: f64) -> Hotspot {
    Hotspot {
        id,
        name: name.to_string(),
        address: format!("{id} Test Street"),
        detail: String::new(),
        latitude: 35.6586 + distance_degrees,
        longitude: 139.7454,
        identifier: format!("FREE_WIFI_{id}"),
        reference_url: format!("https://wifi.example.com/spots/{id}"),
        distance_degrees,
    }
}
