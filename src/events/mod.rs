//! Event pipeline from committed writes to the search index.
//!
//! The request path hands events to [`EventProducer`], which never blocks; a
//! worker pool forwards them to a [`MessageBroker`]. [`EventConsumer`] runs one
//! sequential loop per topic partition and applies each event to the index.
//! Delivery is best effort: there is no outbox, retry, or dead-letter queue.

mod broker;
mod consumer;
mod memory;
mod producer;
mod redis_streams;

pub use broker::{
    BrokerError, BrokerMessage, HandlerError, MessageBroker, MessageHandler, Subscription,
    partition_for,
};
pub use consumer::EventConsumer;
pub use memory::InMemoryBroker;
pub use producer::{EventProducer, ProducerConfig, PublishError};
pub use redis_streams::{RedisStreamsBroker, RedisStreamsOptions};
