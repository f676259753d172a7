use serde::{Deserialize, Serialize};

use crate::domain::entities::{TodoItem, TodoList};

/// Flattened projection stored in the index. Rebuildable from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    pub id: i64,
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<i64>,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

impl SearchDocument {
    pub fn for_list(user_id: i64, list: &TodoList) -> Self {
        Self {
            id: list.id,
            user_id,
            list_id: None,
            title: list.title.clone(),
            description: list.description.clone(),
            done: None,
        }
    }

    pub fn for_item(user_id: i64, list_id: i64, item: &TodoItem) -> Self {
        Self {
            id: item.id,
            user_id,
            list_id: Some(list_id),
            title: item.title.clone(),
            description: item.description.clone(),
            done: Some(item.done),
        }
    }
}

/// Extra scalar filters for item searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ItemFilter {
    pub list_id: Option<i64>,
    pub done: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub user_id: i64,
    pub text: String,
    pub list_id: Option<i64>,
    pub done: Option<bool>,
}

impl SearchQuery {
    pub fn new(user_id: i64, text: impl Into<String>) -> Self {
        Self {
            user_id,
            text: text.into(),
            list_id: None,
            done: None,
        }
    }

    pub fn with_filter(mut self, filter: ItemFilter) -> Self {
        self.list_id = filter.list_id;
        self.done = filter.done;
        self
    }
}
