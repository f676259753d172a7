//! Mutation events published after a relational commit.
//!
//! Created events embed the full entity. Updated events carry ids only so the
//! consumer has to re-read the current row. Deleted events carry the entity id.

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::entities::{TodoItem, TodoList};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    ListCreated,
    ListUpdated,
    ListDeleted,
    ItemCreated,
    ItemUpdated,
    ItemDeleted,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::ListCreated,
        Topic::ListUpdated,
        Topic::ListDeleted,
        Topic::ItemCreated,
        Topic::ItemUpdated,
        Topic::ItemDeleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::ListCreated => "list_created",
            Topic::ListUpdated => "list_updated",
            Topic::ListDeleted => "list_deleted",
            Topic::ItemCreated => "item_created",
            Topic::ItemUpdated => "item_updated",
            Topic::ItemDeleted => "item_deleted",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload bound to exactly one topic.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync {
    const TOPIC: Topic;

    /// Entity id used to pick the broker partition, keeping per-entity order.
    fn partition_key(&self) -> i64;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCreated {
    pub user_id: i64,
    pub list: TodoList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUpdated {
    pub user_id: i64,
    pub list_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDeleted {
    pub list_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub user_id: i64,
    pub list_id: i64,
    pub item: TodoItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdated {
    pub user_id: i64,
    pub list_id: i64,
    pub item_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDeleted {
    pub item_id: i64,
}

impl DomainEvent for ListCreated {
    const TOPIC: Topic = Topic::ListCreated;

    fn partition_key(&self) -> i64 {
        self.list.id
    }
}

impl DomainEvent for ListUpdated {
    const TOPIC: Topic = Topic::ListUpdated;

    fn partition_key(&self) -> i64 {
        self.list_id
    }
}

impl DomainEvent for ListDeleted {
    const TOPIC: Topic = Topic::ListDeleted;

    fn partition_key(&self) -> i64 {
        self.list_id
    }
}

impl DomainEvent for ItemCreated {
    const TOPIC: Topic = Topic::ItemCreated;

    fn partition_key(&self) -> i64 {
        self.item.id
    }
}

impl DomainEvent for ItemUpdated {
    const TOPIC: Topic = Topic::ItemUpdated;

    fn partition_key(&self) -> i64 {
        self.item_id
    }
}

impl DomainEvent for ItemDeleted {
    const TOPIC: Topic = Topic::ItemDeleted;

    fn partition_key(&self) -> i64 {
        self.item_id
    }
}
