//! Master/replica routing plus the cache failure policy.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::{
    keys::CacheKey,
    store::{CacheError, CacheStore},
};
use crate::observe::{Observer, Signal};

const TARGET: &str = "tasklane::cache";

/// Reads go to the replica, `set`/`delete` go to the master.
///
/// A stale or lagging replica only produces extra misses, which fall through
/// to the relational store.
#[derive(Clone)]
pub struct CacheRouter {
    master: Arc<dyn CacheStore>,
    replica: Arc<dyn CacheStore>,
    observer: Arc<dyn Observer>,
}

impl CacheRouter {
    pub fn new(
        master: Arc<dyn CacheStore>,
        replica: Arc<dyn CacheStore>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            master,
            replica,
            observer,
        }
    }

    /// Uses one node for both roles.
    pub fn single(node: Arc<dyn CacheStore>, observer: Arc<dyn Observer>) -> Self {
        Self::new(node.clone(), node, observer)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, CacheError> {
        match self.replica.get(key.as_str()).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.master.set(key.as_str(), raw, key.ttl()).await
    }

    pub async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.master.delete(key.as_str()).await
    }

    pub async fn exists(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.replica.exists(key.as_str()).await
    }

    /// `get` with errors degraded to a miss.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let pattern = key.pattern().name();
        match self.get(key).await {
            Ok(Some(value)) => {
                debug!(target: TARGET, key = %key, "Cache hit");
                self.observer.record(Signal::CacheHit { pattern });
                Some(value)
            }
            Ok(None) => {
                self.observer.record(Signal::CacheMiss { pattern });
                None
            }
            Err(err) => {
                warn!(
                    target: TARGET,
                    key = %key,
                    error = %err,
                    "Cache read failed; falling back to the store"
                );
                self.observer.record(Signal::CacheFailure { pattern, op: "get" });
                None
            }
        }
    }

    /// `set` with errors logged and swallowed.
    pub async fn populate<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T) {
        if let Err(err) = self.set(key, value).await {
            warn!(
                target: TARGET,
                key = %key,
                error = %err,
                "Failed to populate cache"
            );
            self.observer.record(Signal::CacheFailure {
                pattern: key.pattern().name(),
                op: "set",
            });
        }
    }

    /// Deletes every key; a failed delete does not stop the rest.
    pub async fn invalidate(&self, keys: &[CacheKey]) {
        for key in keys {
            if let Err(err) = self.delete(key).await {
                warn!(
                    target: TARGET,
                    key = %key,
                    error = %err,
                    "Failed to invalidate cache key"
                );
                self.observer.record(Signal::CacheFailure {
                    pattern: key.pattern().name(),
                    op: "delete",
                });
            }
        }
    }
}
