//! Full-text search over denormalized list and item documents.
//!
//! The index answers with ids only. Field values always come from the entity
//! stores, so a lagging index can hide or surface an entity but never show
//! stale content.

mod document;
mod elastic;
mod index;
mod memory;

pub use document::{ItemFilter, SearchDocument, SearchQuery};
pub use elastic::{ElasticIndex, RefreshPolicy, SearchConfig};
pub use index::{DocumentIndex, SearchError};
pub use memory::MemoryIndex;
