//! `Observer` backed by the `metrics` facade.
//!
//! Counters are labelled by key pattern, topic, or entity. Whatever recorder
//! the process installs receives them; with none installed they are no-ops.

use metrics::{counter, histogram};

use crate::observe::{Observer, Signal};

pub const CACHE_HIT_TOTAL: &str = "tasklane_cache_hit_total";
pub const CACHE_MISS_TOTAL: &str = "tasklane_cache_miss_total";
pub const CACHE_ERROR_TOTAL: &str = "tasklane_cache_error_total";
pub const ENTITY_MUTATION_TOTAL: &str = "tasklane_entity_mutation_total";
pub const EVENT_ENQUEUED_TOTAL: &str = "tasklane_event_enqueued_total";
pub const EVENT_DROPPED_TOTAL: &str = "tasklane_event_dropped_total";
pub const EVENT_PUBLISHED_TOTAL: &str = "tasklane_event_published_total";
pub const EVENT_PUBLISH_FAILED_TOTAL: &str = "tasklane_event_publish_failed_total";
pub const EVENT_HANDLED_TOTAL: &str = "tasklane_event_handled_total";
pub const EVENT_HANDLER_FAILED_TOTAL: &str = "tasklane_event_handler_failed_total";
pub const SEARCH_QUERY_TOTAL: &str = "tasklane_search_query_total";
pub const SEARCH_HITS: &str = "tasklane_search_hits";

#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsObserver;

impl Observer for MetricsObserver {
    fn record(&self, signal: Signal) {
        match signal {
            Signal::CacheHit { pattern } => {
                counter!(CACHE_HIT_TOTAL, "pattern" => pattern).increment(1);
            }
            Signal::CacheMiss { pattern } => {
                counter!(CACHE_MISS_TOTAL, "pattern" => pattern).increment(1);
            }
            Signal::CacheFailure { pattern, op } => {
                counter!(CACHE_ERROR_TOTAL, "pattern" => pattern, "op" => op).increment(1);
            }
            Signal::EntityMutated { entity, mutation } => {
                counter!(
                    ENTITY_MUTATION_TOTAL,
                    "entity" => entity,
                    "mutation" => mutation.as_str()
                )
                .increment(1);
            }
            Signal::EventEnqueued { topic } => {
                counter!(EVENT_ENQUEUED_TOTAL, "topic" => topic.as_str()).increment(1);
            }
            Signal::EventDropped { topic } => {
                counter!(EVENT_DROPPED_TOTAL, "topic" => topic.as_str()).increment(1);
            }
            Signal::EventPublished { topic } => {
                counter!(EVENT_PUBLISHED_TOTAL, "topic" => topic.as_str()).increment(1);
            }
            Signal::EventPublishFailed { topic } => {
                counter!(EVENT_PUBLISH_FAILED_TOTAL, "topic" => topic.as_str()).increment(1);
            }
            Signal::EventHandled { topic } => {
                counter!(EVENT_HANDLED_TOTAL, "topic" => topic.as_str()).increment(1);
            }
            Signal::EventHandlerFailed { topic } => {
                counter!(EVENT_HANDLER_FAILED_TOTAL, "topic" => topic.as_str()).increment(1);
            }
            Signal::SearchQueried { entity, hits } => {
                counter!(SEARCH_QUERY_TOTAL, "entity" => entity).increment(1);
                histogram!(SEARCH_HITS, "entity" => entity).record(hits as f64);
            }
        }
    }
}
