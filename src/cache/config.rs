//! Cache configuration and node wiring.

use std::sync::Arc;

use tracing::info;

use super::{
    memory::MemoryCacheStore,
    redis::RedisCacheStore,
    router::CacheRouter,
    store::{CacheError, CacheStore},
};
use crate::observe::Observer;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false, or when no master URL is set, an in-process node is used.
    pub enabled: bool,
    pub master_url: Option<String>,
    /// Falls back to the master when unset.
    pub replica_url: Option<String>,
    pub key_prefix: String,
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            master_url: settings.master_url.clone(),
            replica_url: settings.replica_url.clone(),
            key_prefix: settings.key_prefix.clone(),
        }
    }
}

impl CacheConfig {
    /// Connects both nodes and returns the router over them.
    pub async fn connect(&self, observer: Arc<dyn Observer>) -> Result<CacheRouter, CacheError> {
        let Some(master_url) = self.master_url.as_deref().filter(|_| self.enabled) else {
            info!(
                target: "tasklane::cache",
                "Using in-process cache node"
            );
            return Ok(CacheRouter::single(
                Arc::new(MemoryCacheStore::new()),
                observer,
            ));
        };

        let master: Arc<dyn CacheStore> =
            Arc::new(RedisCacheStore::connect(master_url, &self.key_prefix).await?);
        let replica: Arc<dyn CacheStore> = match self.replica_url.as_deref() {
            Some(url) if url != master_url => {
                Arc::new(RedisCacheStore::connect(url, &self.key_prefix).await?)
            }
            _ => master.clone(),
        };

        Ok(CacheRouter::new(master, replica, observer))
    }
}
