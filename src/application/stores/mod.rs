//! Entity stores: relational access wrapped in the cache-aside protocol.
//!
//! Reads check the replica, fall back to the repository, and populate the
//! master. Writes commit first and only then touch the cache: creates set the
//! by-id key, updates and deletes delete it, and every mutation drops the
//! owner-collection key. Missing rows are never cached.

mod items;
mod lists;
mod users;

pub use items::ItemStore;
pub use lists::ListStore;
pub use users::UserStore;

use std::future::Future;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    application::repos::RepoError,
    cache::{CacheKey, CacheRouter},
    domain::error::DomainError,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Domain(DomainError::NotFound { .. }))
    }
}

async fn read_aside<T, F, Fut>(
    cache: &CacheRouter,
    key: &CacheKey,
    load: F,
) -> Result<Option<T>, RepoError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>, RepoError>>,
{
    if let Some(hit) = cache.lookup::<T>(key).await {
        return Ok(Some(hit));
    }

    let loaded = load().await?;
    if let Some(value) = loaded.as_ref() {
        cache.populate(key, value).await;
    }
    Ok(loaded)
}
