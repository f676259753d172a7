use std::sync::Arc;

use tracing::{debug, instrument};

use super::{StoreError, read_aside};
use crate::{
    application::repos::{ItemsRepo, OwnedItem},
    cache::{CacheRouter, ITEM_BY_ID, LIST_ITEMS},
    domain::{
        entities::{ITEM_ENTITY, ItemPatch, NewItem, TodoItem},
        error::DomainError,
    },
};

#[derive(Clone)]
pub struct ItemStore {
    repo: Arc<dyn ItemsRepo>,
    cache: CacheRouter,
}

impl ItemStore {
    pub fn new(repo: Arc<dyn ItemsRepo>, cache: CacheRouter) -> Self {
        Self { repo, cache }
    }

    #[instrument(skip(self, item))]
    pub async fn create(&self, list_id: i64, item: &NewItem) -> Result<TodoItem, StoreError> {
        let created = self.repo.create_in_list(list_id, item).await?;

        self.cache.populate(&ITEM_BY_ID.key(created.id), &created).await;
        self.cache.invalidate(&[LIST_ITEMS.key(list_id)]).await;

        debug!(item_id = created.id, "Item created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_all(&self, list_id: i64) -> Result<Vec<TodoItem>, StoreError> {
        let items = read_aside(&self.cache, &LIST_ITEMS.key(list_id), || async {
            self.repo.list_for_list(list_id).await.map(Some)
        })
        .await?;
        Ok(items.unwrap_or_default())
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, item_id: i64) -> Result<TodoItem, StoreError> {
        read_aside(&self.cache, &ITEM_BY_ID.key(item_id), || {
            self.repo.find_by_id(item_id)
        })
        .await?
        .ok_or_else(|| DomainError::not_found(ITEM_ENTITY).into())
    }

    /// Uncached batch read. Order does not follow `ids`.
    pub async fn get_many_by_ids(&self, ids: &[i64]) -> Result<Vec<TodoItem>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.repo.find_many(ids).await?)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        list_id: i64,
        item_id: i64,
        patch: &ItemPatch,
    ) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Err(DomainError::empty_update(ITEM_ENTITY).into());
        }
        if !self.repo.update(item_id, patch).await? {
            return Err(DomainError::not_found(ITEM_ENTITY).into());
        }

        self.cache
            .invalidate(&[ITEM_BY_ID.key(item_id), LIST_ITEMS.key(list_id)])
            .await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, list_id: Option<i64>, item_id: i64) -> Result<(), StoreError> {
        if !self.repo.delete(item_id).await? {
            return Err(DomainError::not_found(ITEM_ENTITY).into());
        }

        let mut keys = vec![ITEM_BY_ID.key(item_id)];
        keys.extend(list_id.map(|list_id| LIST_ITEMS.key(list_id)));
        self.cache.invalidate(&keys).await;
        Ok(())
    }

    pub async fn ensure_owner(
        &self,
        user_id: i64,
        list_id: i64,
        item_id: i64,
    ) -> Result<(), StoreError> {
        if self.repo.is_owner(user_id, list_id, item_id).await? {
            Ok(())
        } else {
            Err(DomainError::not_owner(ITEM_ENTITY).into())
        }
    }

    pub async fn all_owned(&self) -> Result<Vec<OwnedItem>, StoreError> {
        Ok(self.repo.list_all_owned().await?)
    }
}
