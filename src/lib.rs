//! Cache-aside repositories and an event pipeline that keeps todo lists and
//! items consistent across Postgres, Redis, and a full-text search index.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod events;
pub mod infra;
pub mod observe;
pub mod search;

pub(crate) mod util;
