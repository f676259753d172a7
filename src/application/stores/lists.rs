use std::sync::Arc;

use tracing::{debug, instrument};

use super::{StoreError, read_aside};
use crate::{
    application::repos::{ListsRepo, OwnedList},
    cache::{CacheRouter, LIST_BY_ID, USER_LISTS},
    domain::{
        entities::{LIST_ENTITY, ListPatch, NewList, TodoList},
        error::DomainError,
    },
};

#[derive(Clone)]
pub struct ListStore {
    repo: Arc<dyn ListsRepo>,
    cache: CacheRouter,
}

impl ListStore {
    pub fn new(repo: Arc<dyn ListsRepo>, cache: CacheRouter) -> Self {
        Self { repo, cache }
    }

    #[instrument(skip(self, list))]
    pub async fn create(&self, user_id: i64, list: &NewList) -> Result<TodoList, StoreError> {
        let created = self.repo.create_for_user(user_id, list).await?;

        self.cache.populate(&LIST_BY_ID.key(created.id), &created).await;
        self.cache.invalidate(&[USER_LISTS.key(user_id)]).await;

        debug!(list_id = created.id, "List created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_all(&self, user_id: i64) -> Result<Vec<TodoList>, StoreError> {
        let lists = read_aside(&self.cache, &USER_LISTS.key(user_id), || async {
            self.repo.list_for_user(user_id).await.map(Some)
        })
        .await?;
        Ok(lists.unwrap_or_default())
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, list_id: i64) -> Result<TodoList, StoreError> {
        read_aside(&self.cache, &LIST_BY_ID.key(list_id), || {
            self.repo.find_by_id(list_id)
        })
        .await?
        .ok_or_else(|| DomainError::not_found(LIST_ENTITY).into())
    }

    /// Uncached batch read. Order does not follow `ids`.
    pub async fn get_many_by_ids(&self, ids: &[i64]) -> Result<Vec<TodoList>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.repo.find_many(ids).await?)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        user_id: i64,
        list_id: i64,
        patch: &ListPatch,
    ) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Err(DomainError::empty_update(LIST_ENTITY).into());
        }
        if !self.repo.update(list_id, patch).await? {
            return Err(DomainError::not_found(LIST_ENTITY).into());
        }

        self.cache
            .invalidate(&[LIST_BY_ID.key(list_id), USER_LISTS.key(user_id)])
            .await;
        Ok(())
    }

    /// `owner` is `None` for admin deletes, which leaves the owner collection
    /// to expire on its own.
    #[instrument(skip(self))]
    pub async fn delete(&self, owner: Option<i64>, list_id: i64) -> Result<(), StoreError> {
        if !self.repo.delete(list_id).await? {
            return Err(DomainError::not_found(LIST_ENTITY).into());
        }

        let mut keys = vec![LIST_BY_ID.key(list_id)];
        keys.extend(owner.map(|user_id| USER_LISTS.key(user_id)));
        self.cache.invalidate(&keys).await;
        Ok(())
    }

    /// Always read through to the store; caches never decide authorization.
    pub async fn ensure_owner(&self, user_id: i64, list_id: i64) -> Result<(), StoreError> {
        if self.repo.is_owner(user_id, list_id).await? {
            Ok(())
        } else {
            Err(DomainError::not_owner(LIST_ENTITY).into())
        }
    }

    pub async fn all_owned(&self) -> Result<Vec<OwnedList>, StoreError> {
        Ok(self.repo.list_all_owned().await?)
    }
}
