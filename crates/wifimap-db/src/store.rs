//! [`HotspotStore`] backed by the MySQL pool.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::MySqlPool;
use wifimap_core::{
    retry_with_backoff, AppConfig, Hotspot, HotspotStore, LocationInput, QueryError,
};

use crate::hotspots::nearest_hotspots;
use crate::{ping, DbError, HotspotRow};

const MAX_RETRY_DELAY_MS: u64 = 5_000;

/// Each attempt acquires its own connection and returns it to the pool when
/// the attempt ends, whether it succeeded, failed or timed out.
#[derive(Clone)]
pub struct MySqlHotspotStore {
    pool: MySqlPool,
    query_timeout: Duration,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl MySqlHotspotStore {
    #[must_use]
    pub fn new(pool: MySqlPool, config: &AppConfig) -> Self {
        Self {
            pool,
            query_timeout: Duration::from_secs(config.db_query_timeout_secs),
            max_retries: config.db_max_retries,
            backoff_base_ms: config.db_retry_backoff_base_ms,
        }
    }

    async fn nearest_once(
        &self,
        location: LocationInput,
        limit: u32,
    ) -> Result<Vec<HotspotRow>, DbError> {
        let attempt = async {
            let mut conn = self.pool.acquire().await?;
            let rows = nearest_hotspots(&mut conn, location, limit).await?;
            Ok::<_, DbError>(rows)
        };

        tokio::time::timeout(self.query_timeout, attempt)
            .await
            .map_err(|_| DbError::Timeout {
                secs: self.query_timeout.as_secs(),
            })?
    }
}

#[async_trait]
impl HotspotStore for MySqlHotspotStore {
    async fn nearest(
        &self,
        location: LocationInput,
        limit: u32,
    ) -> Result<Vec<Hotspot>, QueryError> {
        let rows = retry_with_backoff(
            self.max_retries,
            self.backoff_base_ms,
            MAX_RETRY_DELAY_MS,
            DbError::is_transient,
            || self.nearest_once(location, limit),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "nearest hotspot query failed");
            QueryError::from(e)
        })?;

        Ok(rows.into_iter().map(Hotspot::from).collect())
    }

    async fn ping(&self) -> Result<(), QueryError> {
        tokio::time::timeout(self.query_timeout, ping(&self.pool))
            .await
            .map_err(|_| QueryError::Timeout {
                secs: self.query_timeout.as_secs(),
            })?
            .map_err(|e| QueryError::from(DbError::from(e)))
    }
}
