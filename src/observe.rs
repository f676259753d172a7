//! Observability capability injected into caches, stores, and the event pipeline.
//!
//! Components hold an `Arc<dyn Observer>` handed to their constructor instead of
//! reaching for a process-wide recorder, so tests can swap in [`NoopObserver`]
//! or a recording fake.

use std::sync::Arc;

use crate::domain::events::Topic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Created,
    Updated,
    Deleted,
}

impl Mutation {
    pub fn as_str(self) -> &'static str {
        match self {
            Mutation::Created => "created",
            Mutation::Updated => "updated",
            Mutation::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    CacheHit {
        pattern: &'static str,
    },
    CacheMiss {
        pattern: &'static str,
    },
    CacheFailure {
        pattern: &'static str,
        op: &'static str,
    },
    EntityMutated {
        entity: &'static str,
        mutation: Mutation,
    },
    EventEnqueued {
        topic: Topic,
    },
    EventDropped {
        topic: Topic,
    },
    EventPublished {
        topic: Topic,
    },
    EventPublishFailed {
        topic: Topic,
    },
    EventHandled {
        topic: Topic,
    },
    EventHandlerFailed {
        topic: Topic,
    },
    SearchQueried {
        entity: &'static str,
        hits: usize,
    },
}

pub trait Observer: Send + Sync {
    fn record(&self, signal: Signal);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn record(&self, _signal: Signal) {}
}

pub fn noop() -> Arc<dyn Observer> {
    Arc::new(NoopObserver)
}
