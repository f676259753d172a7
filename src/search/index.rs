use async_trait::async_trait;
use thiserror::Error;

use super::document::{SearchDocument, SearchQuery};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search transport error: {0}")]
    Transport(String),
    #[error("search engine answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("search response could not be decoded: {0}")]
    Decode(String),
}

impl SearchError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// One index holding one entity kind.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Ids of documents owned by `query.user_id` that match the text and filters.
    async fn search_ids(&self, query: &SearchQuery) -> Result<Vec<i64>, SearchError>;

    /// Overwrites any document with the same id.
    async fn upsert(&self, document: &SearchDocument) -> Result<(), SearchError>;

    /// Succeeds when the document is already absent.
    async fn delete(&self, id: i64) -> Result<(), SearchError>;
}
