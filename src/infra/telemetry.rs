use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::{error::InfraError, metrics as names};

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            names::CACHE_HIT_TOTAL,
            Unit::Count,
            "Cache lookups answered by the replica node."
        );
        describe_counter!(
            names::CACHE_MISS_TOTAL,
            Unit::Count,
            "Cache lookups that fell through to the relational store."
        );
        describe_counter!(
            names::CACHE_ERROR_TOTAL,
            Unit::Count,
            "Cache operations that failed and were absorbed."
        );
        describe_counter!(
            names::ENTITY_MUTATION_TOTAL,
            Unit::Count,
            "Committed creates, updates, and deletes per entity."
        );
        describe_counter!(
            names::EVENT_ENQUEUED_TOTAL,
            Unit::Count,
            "Events accepted onto the publish queue."
        );
        describe_counter!(
            names::EVENT_DROPPED_TOTAL,
            Unit::Count,
            "Events dropped because the publish queue was full or closed."
        );
        describe_counter!(
            names::EVENT_PUBLISHED_TOTAL,
            Unit::Count,
            "Events handed to the broker."
        );
        describe_counter!(
            names::EVENT_PUBLISH_FAILED_TOTAL,
            Unit::Count,
            "Events the broker refused."
        );
        describe_counter!(
            names::EVENT_HANDLED_TOTAL,
            Unit::Count,
            "Events applied to the search index."
        );
        describe_counter!(
            names::EVENT_HANDLER_FAILED_TOTAL,
            Unit::Count,
            "Events whose handler failed; the consumer moved on."
        );
        describe_counter!(
            names::SEARCH_QUERY_TOTAL,
            Unit::Count,
            "Full-text searches issued."
        );
        describe_histogram!(
            names::SEARCH_HITS,
            Unit::Count,
            "Identifiers returned per search."
        );
    });
}
