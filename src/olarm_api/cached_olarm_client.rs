use crate::error::{BridgeError, Result};
use crate::olarm_api::models::area::{AreaRef, AreaSnapshot};
use crate::olarm_api::models::request::actions_request::{AreaAction, PgmCommand};
use crate::olarm_api::olarm_client::OlarmApiTrait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Clone)]
struct CachedArea {
    snapshot: AreaSnapshot,
    fetched_at: Instant,
}

/// Keeps the last snapshot of one area and only goes back to Olarm once the
/// snapshot is older than the caller's minimum age. Writes are never cached.
#[derive(Clone)]
pub struct CachedOlarmClient<T>
where
    T: OlarmApiTrait,
{
    client: T,
    area_name: String,
    area_cache: Cache<String, CachedArea>,
}

impl<T> CachedOlarmClient<T>
where
    T: OlarmApiTrait + Send + Sync,
{
    /// `max_age` is a hard ceiling on how long a snapshot may be kept at all.
    pub fn new(client: T, area_name: &str, max_age: Duration) -> Self {
        Self {
            client,
            area_name: area_name.to_string(),
            area_cache: Cache::builder()
                .max_capacity(8)
                .time_to_live(max_age)
                .build(),
        }
    }

    /// Return the cached snapshot if it is younger than `min_age`, otherwise
    /// fetch the area list, pick the configured area and replace the entry.
    /// Concurrent cold reads share a single fetch.
    pub async fn get_current(&self, min_age: Duration) -> Result<AreaSnapshot> {
        if let Some(cached) = self.area_cache.get(self.area_name.as_str()).await {
            let age = cached.fetched_at.elapsed();
            if age < min_age {
                info!(
                    "GET cached state for {} fetched {}ms ago",
                    self.area_name,
                    age.as_millis()
                );
                return Ok(cached.snapshot);
            }
            // Replace only once the new fetch succeeded, so a failure keeps
            // the last known good snapshot.
            let fresh = self.fetch().await?;
            self.area_cache
                .insert(self.area_name.clone(), fresh.clone())
                .await;
            return Ok(fresh.snapshot);
        }

        self.area_cache
            .try_get_with(self.area_name.clone(), self.fetch())
            .await
            .map(|cached| cached.snapshot)
            .map_err(unshare)
    }

    async fn fetch(&self) -> Result<CachedArea> {
        debug!("Fetching areas from Olarm for {}", self.area_name);
        let areas = self.client.get_areas().await.map_err(BridgeError::Remote)?;
        let snapshot = areas
            .into_iter()
            .find(|a| a.area_name == self.area_name)
            .ok_or_else(|| BridgeError::NotFound {
                area: self.area_name.clone(),
            })?;
        Ok(CachedArea {
            snapshot,
            fetched_at: Instant::now(),
        })
    }

    pub async fn set_area(&self, area: &AreaRef, action: AreaAction) -> Result<()> {
        // don't cache this, it's a POST request
        self.client
            .set_area(area, action)
            .await
            .map_err(BridgeError::Remote)
    }

    pub async fn set_pgm(&self, area: &AreaRef, channel: u32, command: PgmCommand) -> Result<()> {
        self.client
            .set_pgm(area, channel, command)
            .await
            .map_err(BridgeError::Remote)
    }
}

// moka hands the same error to every waiter behind an Arc
fn unshare(e: Arc<BridgeError>) -> BridgeError {
    Arc::try_unwrap(e).unwrap_or_else(|shared| match shared.as_ref() {
        BridgeError::Remote(err) => BridgeError::Remote(anyhow::anyhow!("{:#}", err)),
        BridgeError::NotFound { area } => BridgeError::NotFound { area: area.clone() },
        BridgeError::Configuration(msg) => BridgeError::Configuration(msg.clone()),
    })
}
