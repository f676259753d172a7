use std::sync::Arc;

use tracing::instrument;

use super::{StoreError, read_aside};
use crate::{
    application::repos::UsersRepo,
    cache::{CacheRouter, USER_BY_ID, USER_LISTS},
    domain::{
        entities::{NewUser, USER_ENTITY, User},
        error::DomainError,
    },
};

#[derive(Clone)]
pub struct UserStore {
    repo: Arc<dyn UsersRepo>,
    cache: CacheRouter,
}

impl UserStore {
    pub fn new(repo: Arc<dyn UsersRepo>, cache: CacheRouter) -> Self {
        Self { repo, cache }
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    pub async fn create(&self, user: &NewUser) -> Result<User, StoreError> {
        let created = self.repo.create(user).await?;
        self.cache.populate(&USER_BY_ID.key(created.id), &created).await;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, user_id: i64) -> Result<User, StoreError> {
        read_aside(&self.cache, &USER_BY_ID.key(user_id), || {
            self.repo.find_by_id(user_id)
        })
        .await?
        .ok_or_else(|| DomainError::not_found(USER_ENTITY).into())
    }

    /// Also drops the user's list collection; the join rows go with the user.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: i64) -> Result<(), StoreError> {
        if !self.repo.delete(user_id).await? {
            return Err(DomainError::not_found(USER_ENTITY).into());
        }

        self.cache
            .invalidate(&[USER_BY_ID.key(user_id), USER_LISTS.key(user_id)])
            .await;
        Ok(())
    }
}
