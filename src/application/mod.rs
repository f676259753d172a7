//! Use cases: cache-aside entity stores and the orchestrators that sequence
//! store writes, event publication, and search indexing.

pub mod error;
pub mod items;
pub mod lists;
pub mod reindex;
pub mod repos;
pub mod stores;
pub mod users;
