//! Relational persistence contracts.
//!
//! Implementations return `Ok(None)` / `Ok(false)` for missing rows and leave
//! the mapping to domain errors to the stores.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    ItemPatch, ListPatch, NewItem, NewList, NewUser, TodoItem, TodoList, User,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// A list with the user that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedList {
    pub user_id: i64,
    pub list: TodoList,
}

/// An item with its list and the owner of that list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedItem {
    pub user_id: i64,
    pub list_id: i64,
    pub item: TodoItem,
}

#[async_trait]
pub trait ListsRepo: Send + Sync {
    /// Inserts the list and its ownership edge in one transaction.
    async fn create_for_user(&self, user_id: i64, list: &NewList) -> Result<TodoList, RepoError>;

    async fn find_by_id(&self, list_id: i64) -> Result<Option<TodoList>, RepoError>;

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<TodoList>, RepoError>;

    /// Unordered batch read; missing ids are skipped.
    async fn find_many(&self, ids: &[i64]) -> Result<Vec<TodoList>, RepoError>;

    /// Returns false when no row matched.
    async fn update(&self, list_id: i64, patch: &ListPatch) -> Result<bool, RepoError>;

    /// Returns false when no row matched.
    async fn delete(&self, list_id: i64) -> Result<bool, RepoError>;

    async fn is_owner(&self, user_id: i64, list_id: i64) -> Result<bool, RepoError>;

    async fn list_all_owned(&self) -> Result<Vec<OwnedList>, RepoError>;
}

#[async_trait]
pub trait ItemsRepo: Send + Sync {
    /// Inserts the item and its list edge in one transaction.
    async fn create_in_list(&self, list_id: i64, item: &NewItem) -> Result<TodoItem, RepoError>;

    async fn find_by_id(&self, item_id: i64) -> Result<Option<TodoItem>, RepoError>;

    async fn list_for_list(&self, list_id: i64) -> Result<Vec<TodoItem>, RepoError>;

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<TodoItem>, RepoError>;

    async fn update(&self, item_id: i64, patch: &ItemPatch) -> Result<bool, RepoError>;

    async fn delete(&self, item_id: i64) -> Result<bool, RepoError>;

    /// True when the item sits in `list_id` and that list belongs to `user_id`.
    async fn is_owner(&self, user_id: i64, list_id: i64, item_id: i64) -> Result<bool, RepoError>;

    async fn list_all_owned(&self) -> Result<Vec<OwnedItem>, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create(&self, user: &NewUser) -> Result<User, RepoError>;

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, RepoError>;

    async fn delete(&self, user_id: i64) -> Result<bool, RepoError>;
}
