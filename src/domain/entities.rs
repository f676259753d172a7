use serde::{Deserialize, Serialize};

use super::error::DomainError;

pub const USER_ENTITY: &str = "user";
pub const LIST_ENTITY: &str = "list";
pub const ITEM_ENTITY: &str = "item";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
}

/// Registration payload. The hash is produced upstream and stored opaquely.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    pub id: i64,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub done: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewList {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl NewList {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        require_title(LIST_ENTITY, &self.title)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl NewItem {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        require_title(ITEM_ENTITY, &self.title)
    }
}

/// Sparse list update. `None` means the column is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl ListPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }

    /// Rejects empty patches and blank titles.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.is_empty() {
            return Err(DomainError::empty_update(LIST_ENTITY));
        }
        match self.title.as_deref() {
            Some(title) => require_title(LIST_ENTITY, title),
            None => Ok(()),
        }
    }

    pub fn apply_to(&self, list: &mut TodoList) {
        if let Some(title) = &self.title {
            list.title = title.clone();
        }
        if let Some(description) = &self.description {
            list.description = description.clone();
        }
    }
}

/// Sparse item update. `None` means the column is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub done: Option<bool>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.done.is_none()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.is_empty() {
            return Err(DomainError::empty_update(ITEM_ENTITY));
        }
        match self.title.as_deref() {
            Some(title) => require_title(ITEM_ENTITY, title),
            None => Ok(()),
        }
    }

    pub fn apply_to(&self, item: &mut TodoItem) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(done) = self.done {
            item.done = done;
        }
    }
}

fn require_title(entity: &'static str, title: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::validation(format!(
            "{entity} title must not be blank"
        )));
    }
    Ok(())
}
