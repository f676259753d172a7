//! Cache key patterns.
//!
//! A pattern renders as `{name}:{id}`. By-id patterns hold one entity, owner
//! patterns hold the whole child collection and are deleted wholesale whenever
//! a member changes.

use std::{fmt, time::Duration};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

pub const LIST_BY_ID: KeyPattern = KeyPattern::new("list_by_id", DEFAULT_TTL);
pub const USER_LISTS: KeyPattern = KeyPattern::new("user_lists", DEFAULT_TTL);
pub const ITEM_BY_ID: KeyPattern = KeyPattern::new("item_by_id", DEFAULT_TTL);
pub const LIST_ITEMS: KeyPattern = KeyPattern::new("list_items", DEFAULT_TTL);
pub const USER_BY_ID: KeyPattern = KeyPattern::new("user_by_id", DEFAULT_TTL);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPattern {
    name: &'static str,
    ttl: Duration,
}

impl KeyPattern {
    pub const fn new(name: &'static str, ttl: Duration) -> Self {
        Self { name, ttl }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key(&self, id: i64) -> CacheKey {
        CacheKey {
            pattern: *self,
            rendered: format!("{}:{id}", self.name),
        }
    }
}

/// A rendered key together with the pattern that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pattern: KeyPattern,
    rendered: String,
}

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    pub fn pattern(&self) -> KeyPattern {
        self.pattern
    }

    pub fn ttl(&self) -> Duration {
        self.pattern.ttl
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_pattern_and_id() {
        assert_eq!(LIST_BY_ID.key(12).as_str(), "list_by_id:12");
        assert_eq!(USER_LISTS.key(1).as_str(), "user_lists:1");
        assert_eq!(ITEM_BY_ID.key(7).to_string(), "item_by_id:7");
        assert_eq!(LIST_ITEMS.key(3).as_str(), "list_items:3");
    }

    #[test]
    fn every_pattern_expires_after_five_minutes() {
        for pattern in [LIST_BY_ID, USER_LISTS, ITEM_BY_ID, LIST_ITEMS, USER_BY_ID] {
            assert_eq!(pattern.ttl(), Duration::from_secs(300));
            assert_eq!(pattern.key(1).ttl(), pattern.ttl());
        }
    }
}
