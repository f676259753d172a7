//! Cache-aside layer over a master/replica key-value pair.
//!
//! - **Keys**: every cached value lives under a [`KeyPattern`] bound to one id
//!   and a fixed TTL (five minutes for all patterns).
//! - **Routing**: [`CacheRouter`] reads from the replica and writes to the master.
//! - **Failure policy**: cache errors never fail a caller. Reads degrade to a
//!   miss, writes and invalidations are logged and dropped.
//!
//! ```toml
//! [cache]
//! enabled = true
//! master_url = "redis://cache-master:6379"
//! replica_url = "redis://cache-replica:6379"
//! key_prefix = "tasklane:"
//! ```

mod config;
mod keys;
mod memory;
mod redis;
mod router;
mod store;

pub use config::CacheConfig;
pub use keys::{
    CacheKey, DEFAULT_TTL, ITEM_BY_ID, KeyPattern, LIST_BY_ID, LIST_ITEMS, USER_BY_ID, USER_LISTS,
};
pub use memory::MemoryCacheStore;
pub use redis::RedisCacheStore;
pub use router::CacheRouter;
pub use store::{CacheError, CacheStore};
