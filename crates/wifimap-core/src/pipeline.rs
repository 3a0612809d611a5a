//! Location-to-reply pipeline.
//!
//! query → rank → format → zoom and markers → map URL → assembled reply.

use std::sync::Arc;

use async_trait::async_trait;

use crate::app_config::AppConfig;
use crate::carousel::format_entries;
use crate::error::QueryError;
use crate::geo::{rank_hotspots, Hotspot, LocationInput, RankedCandidate};
use crate::reply::{assemble_reply, OutboundMessage};
use crate::static_map::MapRenderSpec;

/// Read access to the hotspot table.
#[async_trait]
pub trait HotspotStore: Send + Sync {
    /// Up to `limit` hotspots, nearest first.
    async fn nearest(
        &self,
        location: LocationInput,
        limit: u32,
    ) -> Result<Vec<Hotspot>, QueryError>;

    /// Cheap liveness probe used by the health endpoint.
    async fn ping(&self) -> Result<(), QueryError>;
}

/// Result of one pipeline run. `messages` is what gets sent; the rest is kept
/// for logging and inspection.
#[derive(Debug, Clone)]
pub struct LocationReply {
    pub candidates: Vec<RankedCandidate>,
    pub map: MapRenderSpec,
    pub map_url: String,
    pub messages: Vec<OutboundMessage>,
}

#[derive(Clone)]
pub struct LocationReplier {
    store: Arc<dyn HotspotStore>,
    max_results: u32,
    static_map_base_url: String,
    static_map_api_key: String,
}

impl LocationReplier {
    #[must_use]
    pub fn new(store: Arc<dyn HotspotStore>, config: &AppConfig) -> Self {
        Self::with_settings(
            store,
            config.max_results,
            &config.static_map_base_url,
            &config.static_map_api_key,
        )
    }

    #[must_use]
    pub fn with_settings(
        store: Arc<dyn HotspotStore>,
        max_results: u32,
        static_map_base_url: &str,
        static_map_api_key: &str,
    ) -> Self {
        Self {
            store,
            max_results,
            static_map_base_url: static_map_base_url.to_string(),
            static_map_api_key: static_map_api_key.to_string(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn HotspotStore> {
        &self.store
    }

    /// Rank the nearest hotspots and build the map for them, without
    /// producing messages.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when the store lookup fails.
    pub async fn locate(
        &self,
        location: LocationInput,
    ) -> Result<(Vec<RankedCandidate>, MapRenderSpec, String), QueryError> {
        let hotspots = self.store.nearest(location, self.max_results).await?;
        let candidates = rank_hotspots(hotspots);
        let map = MapRenderSpec::for_candidates(location, &candidates);
        let map_url = map.to_url(&self.static_map_base_url, &self.static_map_api_key);

        tracing::debug!(
            latitude = location.latitude,
            longitude = location.longitude,
            candidates = candidates.len(),
            zoom = map.zoom,
            "hotspots located"
        );

        Ok((candidates, map, map_url))
    }

    /// Run the whole pipeline for one shared location.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when the store lookup fails. No partial reply is
    /// produced in that case.
    pub async fn reply_for(
        &self,
        location: LocationInput,
        public_base_url: &str,
    ) -> Result<LocationReply, QueryError> {
        let (candidates, map, map_url) = self.locate(location).await?;
        let entries = format_entries(&candidates);
        let messages = assemble_reply(public_base_url, &map_url, entries);

        Ok(LocationReply {
            candidates,
            map,
            map_url,
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::geo::hotspot_fixture;

    struct FixedStore {
        hotspots: Vec<Hotspot>,
        limits: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl HotspotStore for FixedStore {
        async fn nearest(
            &self,
            _location: LocationInput,
            limit: u32,
        ) -> Result<Vec<Hotspot>, QueryError> {
            self.limits.lock().unwrap().push(limit);
            Ok(self
                .hotspots
                .iter()
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn ping(&self) -> Result<(), QueryError> {
            Ok(())
        }
    }

    struct DownStore;

    #[async_trait]
    impl HotspotStore for DownStore {
        async fn nearest(
            &self,
            _location: LocationInput,
            _limit: u32,
        ) -> Result<Vec<Hotspot>, QueryError> {
            Err(QueryError::Unavailable("connection refused".to_string()))
        }

        async fn ping(&self) -> Result<(), QueryError> {
            Err(QueryError::Unavailable("connection refused".to_string()))
        }
    }

    fn replier(store: Arc<dyn HotspotStore>, max_results: u32) -> LocationReplier {
        LocationReplier::with_settings(
            store,
            max_results,
            "https://maps.googleapis.com/maps/api/staticmap",
            "KEY",
        )
    }

    #[tokio::test]
    async fn three_matches_with_max_five_give_three_columns_and_four_markers() {
        let store = Arc::new(FixedStore {
            hotspots: vec![
                hotspot_fixture(1, "a", 0.001),
                hotspot_fixture(2, "b", 0.002),
                hotspot_fixture(3, "c", 0.003),
            ],
            limits: Mutex::new(Vec::new()),
        });
        let reply = replier(store.clone(), 5)
            .reply_for(LocationInput::new(35.6586, 139.7454), "https://bot.example.com")
            .await
            .expect("pipeline should succeed");

        assert_eq!(*store.limits.lock().unwrap(), vec![5]);
        assert_eq!(reply.candidates.len(), 3);
        assert_eq!(reply.map.markers.len(), 4);
        assert_eq!(reply.messages.len(), 2);
        match &reply.messages[1] {
            OutboundMessage::Carousel { columns, .. } => assert_eq!(columns.len(), 3),
            other => panic!("expected carousel, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn image_map_points_at_the_encoded_map_url() {
        let store = Arc::new(FixedStore {
            hotspots: vec![hotspot_fixture(1, "a", 0.001)],
            limits: Mutex::new(Vec::new()),
        });
        let reply = replier(store, 3)
            .reply_for(LocationInput::new(35.6586, 139.7454), "https://bot.example.com")
            .await
            .unwrap();

        let expected = crate::reply::imagemap_base_url("https://bot.example.com", &reply.map_url);
        match &reply.messages[0] {
            OutboundMessage::ImageMap { base_url, .. } => assert_eq!(base_url, &expected),
            other => panic!("expected image map, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn store_failure_is_propagated() {
        let result = replier(Arc::new(DownStore), 3)
            .reply_for(LocationInput::new(35.0, 139.0), "https://bot.example.com")
            .await;
        assert!(matches!(result, Err(QueryError::Unavailable(_))));
    }
}
