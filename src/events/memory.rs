//! Partitioned in-process broker on top of tokio channels.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::broker::{
    BrokerError, BrokerMessage, MessageBroker, MessageHandler, Subscription, deliver,
    partition_for,
};
use crate::{domain::events::Topic, util::lock::mutex_lock};

const OWNER: &str = "events::memory";

struct TopicChannels {
    senders: Vec<mpsc::UnboundedSender<BrokerMessage>>,
    receivers: Option<Vec<mpsc::UnboundedReceiver<BrokerMessage>>>,
}

impl TopicChannels {
    fn new(partitions: usize) -> Self {
        let (senders, receivers) = (0..partitions).map(|_| mpsc::unbounded_channel()).unzip();
        Self {
            senders,
            receivers: Some(receivers),
        }
    }
}

/// Messages published before a subscriber attaches are buffered, matching a
/// broker that retains its log.
pub struct InMemoryBroker {
    partitions: usize,
    topics: Mutex<HashMap<Topic, TopicChannels>>,
}

impl InMemoryBroker {
    pub fn new(partitions: usize) -> Self {
        Self {
            partitions: partitions.max(1),
            topics: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    fn partitions(&self) -> usize {
        self.partitions
    }

    async fn publish(&self, message: BrokerMessage) -> Result<(), BrokerError> {
        let topic = message.topic;
        let partition = partition_for(message.key, self.partitions);
        let mut topics = mutex_lock(&self.topics, OWNER);
        let channels = topics
            .entry(topic)
            .or_insert_with(|| TopicChannels::new(self.partitions));
        channels.senders[partition]
            .send(message)
            .map_err(|_| BrokerError::Closed { topic })
    }

    async fn subscribe(
        &self,
        topic: Topic,
        handler: Arc<dyn MessageHandler>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Subscription, BrokerError> {
        let receivers = {
            let mut topics = mutex_lock(&self.topics, OWNER);
            topics
                .entry(topic)
                .or_insert_with(|| TopicChannels::new(self.partitions))
                .receivers
                .take()
                .ok_or(BrokerError::AlreadySubscribed { topic })?
        };

        let loops = receivers
            .into_iter()
            .enumerate()
            .map(|(partition, receiver)| {
                tokio::spawn(partition_loop(
                    topic,
                    partition,
                    receiver,
                    handler.clone(),
                    shutdown.clone(),
                ))
            })
            .collect();

        Ok(Subscription::new(topic, loops))
    }
}

async fn partition_loop(
    topic: Topic,
    partition: usize,
    mut receiver: mpsc::UnboundedReceiver<BrokerMessage>,
    handler: Arc<dyn MessageHandler>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        let next = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            message = receiver.recv() => message,
        };
        let Some(message) = next else {
            break;
        };
        deliver(handler.as_ref(), partition, &message).await;
    }
    debug!(target: "tasklane::events", %topic, partition, "Partition loop stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::events::broker::HandlerError;

    struct Collect {
        seen: tokio::sync::mpsc::UnboundedSender<(i64, Vec<u8>)>,
    }

    #[async_trait]
    impl MessageHandler for Collect {
        async fn handle(&self, message: &BrokerMessage) -> Result<(), HandlerError> {
            let _ = self.seen.send((message.key, message.payload.clone()));
            if message.payload == b"poison" {
                return Err(HandlerError::Decode(
                    serde_json::from_str::<i64>("poison").expect_err("not json"),
                ));
            }
            Ok(())
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<(i64, Vec<u8>)>) -> (i64, Vec<u8>) {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("delivery in time")
            .expect("channel open")
    }

    #[tokio::test]
    async fn buffered_messages_reach_late_subscriber_in_key_order() {
        let broker = InMemoryBroker::new(3);
        for payload in ["a", "b", "c"] {
            broker
                .publish(BrokerMessage::new(Topic::ListUpdated, 7, payload.into()))
                .await
                .expect("publish");
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (_stop, shutdown) = watch::channel(false);
        let subscription = broker
            .subscribe(Topic::ListUpdated, Arc::new(Collect { seen: tx }), shutdown)
            .await
            .expect("subscribe");
        assert_eq!(subscription.loop_count(), 3);

        for expected in ["a", "b", "c"] {
            assert_eq!(next(&mut rx).await, (7, expected.as_bytes().to_vec()));
        }
    }

    #[tokio::test]
    async fn handler_failure_does_not_stop_the_loop() {
        let broker = InMemoryBroker::new(1);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (_stop, shutdown) = watch::channel(false);
        let _subscription = broker
            .subscribe(Topic::ItemDeleted, Arc::new(Collect { seen: tx }), shutdown)
            .await
            .expect("subscribe");

        broker
            .publish(BrokerMessage::new(Topic::ItemDeleted, 1, b"poison".to_vec()))
            .await
            .expect("publish");
        broker
            .publish(BrokerMessage::new(Topic::ItemDeleted, 1, b"ok".to_vec()))
            .await
            .expect("publish");

        assert_eq!(next(&mut rx).await.1, b"poison".to_vec());
        assert_eq!(next(&mut rx).await.1, b"ok".to_vec());
    }

    #[tokio::test]
    async fn second_subscriber_is_rejected_and_shutdown_stops_loops() {
        let broker = InMemoryBroker::new(2);
        let (tx, _rx) = mpsc::unbounded_channel();
        let handler: Arc<dyn MessageHandler> = Arc::new(Collect { seen: tx });
        let (stop, shutdown) = watch::channel(false);

        let subscription = broker
            .subscribe(Topic::ListCreated, handler.clone(), shutdown.clone())
            .await
            .expect("subscribe");
        assert!(matches!(
            broker
                .subscribe(Topic::ListCreated, handler, shutdown)
                .await,
            Err(BrokerError::AlreadySubscribed { .. })
        ));

        stop.send(true).expect("signal");
        tokio::time::timeout(Duration::from_secs(1), subscription.join())
            .await
            .expect("loops exit");
    }
}
