//! Entities, mutation patches, and the event payloads derived from them.

pub mod entities;
pub mod error;
pub mod events;
