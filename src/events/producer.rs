//! Bounded publish queue drained by a fixed pool of publisher workers.
//!
//! `publish` never waits: the event is serialized and handed to the worker
//! that owns its partition key, or dropped with a warning when that worker's
//! queue is full. Routing by key keeps events for one entity in order.

use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex, RwLock},
};

use futures::future::join_all;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use super::broker::{BrokerMessage, MessageBroker, partition_for};
use crate::{
    domain::events::{DomainEvent, Topic},
    observe::{Observer, Signal},
    util::lock::{mutex_lock, rw_read, rw_write},
};

const OWNER: &str = "events::producer";
const TARGET: &str = "tasklane::events";

#[derive(Debug, Clone, Copy)]
pub struct ProducerConfig {
    pub workers: NonZeroUsize,
    /// Total queue capacity, split evenly across workers.
    pub queue_capacity: NonZeroUsize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            workers: NonZeroUsize::new(2).unwrap_or(NonZeroUsize::MIN),
            queue_capacity: NonZeroUsize::new(1024).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl ProducerConfig {
    fn per_worker_capacity(&self) -> usize {
        (self.queue_capacity.get() / self.workers.get()).max(1)
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("event could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("publish queue for `{topic}` is full")]
    QueueFull { topic: Topic },
    #[error("producer is shut down; `{topic}` event rejected")]
    Closed { topic: Topic },
}

pub struct EventProducer {
    queues: RwLock<Vec<mpsc::Sender<BrokerMessage>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    observer: Arc<dyn Observer>,
}

impl EventProducer {
    /// Spawns the worker pool; must be called inside a tokio runtime.
    pub fn start(
        broker: Arc<dyn MessageBroker>,
        config: ProducerConfig,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let capacity = config.per_worker_capacity();
        let mut queues = Vec::with_capacity(config.workers.get());
        let mut workers = Vec::with_capacity(config.workers.get());

        for worker in 0..config.workers.get() {
            let (sender, receiver) = mpsc::channel(capacity);
            queues.push(sender);
            workers.push(tokio::spawn(publish_worker(
                worker,
                receiver,
                broker.clone(),
                observer.clone(),
            )));
        }

        info!(
            target: TARGET,
            workers = config.workers.get(),
            per_worker_capacity = capacity,
            "Event producer started"
        );

        Self {
            queues: RwLock::new(queues),
            workers: Mutex::new(workers),
            observer,
        }
    }

    /// Fire-and-forget publish; failures are logged and counted, never returned.
    pub fn publish<E: DomainEvent>(&self, event: &E) {
        if let Err(err) = self.try_publish(event) {
            warn!(
                target: TARGET,
                topic = %E::TOPIC,
                key = event.partition_key(),
                error = %err,
                "Dropping event"
            );
            self.observer.record(Signal::EventDropped { topic: E::TOPIC });
        }
    }

    pub fn try_publish<E: DomainEvent>(&self, event: &E) -> Result<(), PublishError> {
        let topic = E::TOPIC;
        let key = event.partition_key();
        let message = BrokerMessage::new(topic, key, serde_json::to_vec(event)?);

        let queues = rw_read(&self.queues, OWNER);
        if queues.is_empty() {
            return Err(PublishError::Closed { topic });
        }
        let queue = &queues[partition_for(key, queues.len())];
        queue.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => PublishError::QueueFull { topic },
            mpsc::error::TrySendError::Closed(_) => PublishError::Closed { topic },
        })?;

        self.observer.record(Signal::EventEnqueued { topic });
        Ok(())
    }

    /// Stops accepting events, lets every worker drain its queue, and waits.
    pub async fn shutdown(&self) {
        rw_write(&self.queues, OWNER).clear();
        let workers = std::mem::take(&mut *mutex_lock(&self.workers, OWNER));
        join_all(workers).await;
        info!(target: TARGET, "Event producer drained");
    }
}

async fn publish_worker(
    worker: usize,
    mut receiver: mpsc::Receiver<BrokerMessage>,
    broker: Arc<dyn MessageBroker>,
    observer: Arc<dyn Observer>,
) {
    while let Some(message) = receiver.recv().await {
        let topic = message.topic;
        let key = message.key;
        let message_id = message.id;
        match broker.publish(message).await {
            Ok(()) => {
                debug!(target: TARGET, worker, %topic, key, %message_id, "Event published");
                observer.record(Signal::EventPublished { topic });
            }
            Err(err) => {
                warn!(
                    target: TARGET,
                    worker,
                    %topic,
                    key,
                    %message_id,
                    error = %err,
                    "Event publish failed"
                );
                observer.record(Signal::EventPublishFailed { topic });
            }
        }
    }
}
