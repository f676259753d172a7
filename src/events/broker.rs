//! Broker contract shared by the in-memory and Redis Streams backends.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{application::error::AppError, domain::events::Topic};

/// One serialized event on its way through the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub id: Uuid,
    pub topic: Topic,
    /// Entity id; picks the partition.
    pub key: i64,
    pub payload: Vec<u8>,
    pub published_at: OffsetDateTime,
}

impl BrokerMessage {
    pub fn new(topic: Topic, key: i64, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic,
            key,
            payload,
            published_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker backend error: {0}")]
    Backend(String),
    #[error("topic `{topic}` already has a subscriber in this process")]
    AlreadySubscribed { topic: Topic },
    #[error("topic `{topic}` is closed")]
    Closed { topic: Topic },
    #[error("malformed broker entry: {0}")]
    Malformed(String),
}

impl BrokerError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("event payload could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Rejected(#[from] AppError),
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &BrokerMessage) -> Result<(), HandlerError>;
}

#[async_trait]
pub trait MessageBroker: Send + Sync {
    fn partitions(&self) -> usize;

    async fn publish(&self, message: BrokerMessage) -> Result<(), BrokerError>;

    /// Starts one sequential loop per partition of `topic`. Loops stop when
    /// `shutdown` flips to true or its sender is dropped.
    async fn subscribe(
        &self,
        topic: Topic,
        handler: Arc<dyn MessageHandler>,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Result<Subscription, BrokerError>;
}

/// Partition-consumer loops started by one `subscribe` call.
#[derive(Debug)]
pub struct Subscription {
    topic: Topic,
    loops: Vec<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(topic: Topic, loops: Vec<JoinHandle<()>>) -> Self {
        Self { topic, loops }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    /// Waits for every loop to exit.
    pub async fn join(self) {
        for (partition, handle) in self.loops.into_iter().enumerate() {
            if let Err(err) = handle.await {
                warn!(
                    target: "tasklane::events",
                    topic = %self.topic,
                    partition,
                    error = %err,
                    "Partition loop ended abnormally"
                );
            }
        }
    }
}

/// Keeps every event of one entity on one partition.
pub fn partition_for(key: i64, partitions: usize) -> usize {
    let partitions = partitions.max(1) as u64;
    // Partition count is a usize, so the remainder always fits back.
    (key.unsigned_abs() % partitions) as usize
}

/// Runs the handler for one message; failures are logged and the loop moves on.
pub(crate) async fn deliver(handler: &dyn MessageHandler, partition: usize, message: &BrokerMessage) {
    if let Err(err) = handler.handle(message).await {
        error!(
            target: "tasklane::events",
            topic = %message.topic,
            partition,
            message_id = %message.id,
            key = message.key,
            error = %err,
            "Event handler failed; skipping message"
        );
    }
}
