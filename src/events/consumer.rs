//! Subscribes every topic and routes decoded events to the orchestrators.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use super::{
    broker::{
        BrokerError, BrokerMessage, HandlerError, MessageBroker, MessageHandler, Subscription,
    },
    producer::EventProducer,
};
use crate::{
    application::{items::ItemService, lists::ListService},
    domain::events::{
        ItemCreated, ItemDeleted, ItemUpdated, ListCreated, ListDeleted, ListUpdated, Topic,
    },
    observe::{Observer, Signal},
};

const TARGET: &str = "tasklane::events";

pub struct EventConsumer {
    broker: Arc<dyn MessageBroker>,
    handler: Arc<TopicHandler>,
    shutdown: watch::Sender<bool>,
    subscriptions: Vec<Subscription>,
}

impl EventConsumer {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        lists: ListService,
        items: ItemService,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            broker,
            handler: Arc::new(TopicHandler {
                lists,
                items,
                observer,
            }),
            shutdown,
            subscriptions: Vec::new(),
        }
    }

    /// Subscribes all six topics. Each partition gets its own sequential loop.
    pub async fn start(&mut self) -> Result<(), BrokerError> {
        for topic in Topic::ALL {
            let subscription = self
                .broker
                .subscribe(topic, self.handler.clone(), self.shutdown.subscribe())
                .await?;
            debug!(
                target: TARGET,
                %topic,
                loops = subscription.loop_count(),
                "Subscribed"
            );
            self.subscriptions.push(subscription);
        }
        info!(
            target: TARGET,
            topics = self.subscriptions.len(),
            partitions = self.broker.partitions(),
            "Event consumer started"
        );
        Ok(())
    }

    /// Signals every loop and waits for the message in flight to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        join_all(self.subscriptions.into_iter().map(Subscription::join)).await;
        info!(target: TARGET, "Event consumer stopped");
    }

    /// Drains `producer` first so queued events still reach a live partition.
    pub async fn stop_after_drain(self, producer: &EventProducer) {
        producer.shutdown().await;
        self.stop().await;
    }
}

struct TopicHandler {
    lists: ListService,
    items: ItemService,
    observer: Arc<dyn Observer>,
}

impl TopicHandler {
    async fn dispatch(&self, message: &BrokerMessage) -> Result<(), HandlerError> {
        let lists = &self.lists;
        let items = &self.items;
        let outcome = match message.topic {
            Topic::ListCreated => lists.handle_created(&decode::<ListCreated>(message)?).await,
            Topic::ListUpdated => lists.handle_updated(&decode::<ListUpdated>(message)?).await,
            Topic::ListDeleted => lists.handle_deleted(&decode::<ListDeleted>(message)?).await,
            Topic::ItemCreated => items.handle_created(&decode::<ItemCreated>(message)?).await,
            Topic::ItemUpdated => items.handle_updated(&decode::<ItemUpdated>(message)?).await,
            Topic::ItemDeleted => items.handle_deleted(&decode::<ItemDeleted>(message)?).await,
        };
        Ok(outcome?)
    }
}

#[async_trait]
impl MessageHandler for TopicHandler {
    #[instrument(
        name = "event.handle",
        skip_all,
        fields(topic = %message.topic, key = message.key, message_id = %message.id)
    )]
    async fn handle(&self, message: &BrokerMessage) -> Result<(), HandlerError> {
        let lag = OffsetDateTime::now_utc() - message.published_at;
        let lag_ms = i64::try_from(lag.whole_milliseconds()).unwrap_or(i64::MAX);
        debug!(target: TARGET, lag_ms, "Handling event");

        let topic = message.topic;
        let outcome = self.dispatch(message).await;
        self.observer.record(match &outcome {
            Ok(()) => Signal::EventHandled { topic },
            Err(_) => Signal::EventHandlerFailed { topic },
        });
        outcome
    }
}

fn decode<E: DeserializeOwned>(message: &BrokerMessage) -> Result<E, HandlerError> {
    Ok(serde_json::from_slice(&message.payload)?)
}
