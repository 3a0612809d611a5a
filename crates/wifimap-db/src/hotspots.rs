//! Nearest-neighbor query over the `free_wifi` table.

use sqlx::MySqlConnection;
use wifimap_core::{Hotspot, LocationInput};

/// Distance is the planar length of `LINESTRING(origin, spot)` in SRID 0,
/// i.e. degrees. The origin is bound as WKT text (`"lon lat"`).
const NEAREST_SQL: &str = "\
    SELECT CAST(id AS SIGNED) AS id, \
           name, \
           address, \
           detail_address_info, \
           CAST(latitude AS DOUBLE) AS latitude, \
           CAST(longitude AS DOUBLE) AS longitude, \
           ssid, \
           url, \
           ST_Length(ST_GeomFromText(\
               CONCAT('LINESTRING(', ?, ',', longitude, ' ', latitude, ')')\
           )) AS distance \
    FROM free_wifi \
    ORDER BY distance \
    LIMIT ?";

/// A row from the nearest-hotspot query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HotspotRow {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub detail_address_info: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub ssid: Option<String>,
    pub url: Option<String>,
    pub distance: f64,
}

impl From<HotspotRow> for Hotspot {
    fn from(row: HotspotRow) -> Self {
        Hotspot {
            id: row.id,
            name: row.name,
            address: row.address,
            detail: row.detail_address_info.unwrap_or_default(),
            latitude: row.latitude,
            longitude: row.longitude,
            identifier: row.ssid.unwrap_or_default(),
            reference_url: row.url.unwrap_or_default(),
            distance_degrees: row.distance,
        }
    }
}

/// WKT coordinate for the query origin. WKT puts longitude first.
pub(crate) fn wkt_origin(location: LocationInput) -> String {
    format!("{} {}", location.longitude, location.latitude)
}

/// Return up to `limit` hotspots ordered by ascending distance from `location`.
///
/// Ties keep the table's natural order.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn nearest_hotspots(
    conn: &mut MySqlConnection,
    location: LocationInput,
    limit: u32,
) -> Result<Vec<HotspotRow>, sqlx::Error> {
    sqlx::query_as::<_, HotspotRow>(NEAREST_SQL)
        .bind(wkt_origin(location))
        .bind(limit)
        .fetch_all(conn)
        .await
}
