//! Redis Streams broker: one stream per topic partition.
//!
//! Subscribers start from the newest entry present at subscribe time and keep
//! their position in memory only, so a restart skips whatever was published
//! while the process was down.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, MultiplexedConnection},
    streams::{StreamId, StreamMaxlen, StreamRangeReply, StreamReadOptions, StreamReadReply},
};
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::broker::{
    BrokerError, BrokerMessage, MessageBroker, MessageHandler, Subscription, deliver,
    partition_for,
};
use crate::domain::events::Topic;

const FIELD_ID: &str = "id";
const FIELD_PUBLISHED_AT: &str = "published_at_ms";
const FIELD_KEY: &str = "key";
const FIELD_PAYLOAD: &str = "payload";
const READ_BATCH: usize = 64;
const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct RedisStreamsOptions {
    pub stream_prefix: String,
    pub partitions: usize,
    pub max_len: usize,
    pub block: Duration,
}

pub struct RedisStreamsBroker {
    client: Client,
    publisher: ConnectionManager,
    options: RedisStreamsOptions,
}

impl RedisStreamsBroker {
    pub async fn connect(url: &str, options: RedisStreamsOptions) -> Result<Self, BrokerError> {
        let client = Client::open(url).map_err(BrokerError::backend)?;
        let publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(BrokerError::backend)?;

        info!(
            target: "tasklane::events",
            partitions = options.partitions,
            prefix = %options.stream_prefix,
            "Connected to Redis Streams broker"
        );

        Ok(Self {
            client,
            publisher,
            options: RedisStreamsOptions {
                partitions: options.partitions.max(1),
                ..options
            },
        })
    }

    fn stream_key(&self, topic: Topic, partition: usize) -> String {
        format!("{}{topic}:{partition}", self.options.stream_prefix)
    }
}

#[async_trait]
impl MessageBroker for RedisStreamsBroker {
    fn partitions(&self) -> usize {
        self.options.partitions
    }

    async fn publish(&self, message: BrokerMessage) -> Result<(), BrokerError> {
        let partition = partition_for(message.key, self.options.partitions);
        let stream = self.stream_key(message.topic, partition);
        let published_at_ms = message.published_at.unix_timestamp_nanos() / 1_000_000;

        let fields: [(&str, Vec<u8>); 4] = [
            (FIELD_ID, message.id.to_string().into_bytes()),
            (FIELD_PUBLISHED_AT, published_at_ms.to_string().into_bytes()),
            (FIELD_KEY, message.key.to_string().into_bytes()),
            (FIELD_PAYLOAD, message.payload),
        ];

        let mut conn = self.publisher.clone();
        let _: String = conn
            .xadd_maxlen(
                &stream,
                StreamMaxlen::Approx(self.options.max_len),
                "*",
                &fields[..],
            )
            .await
            .map_err(BrokerError::backend)?;
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: Topic,
        handler: Arc<dyn MessageHandler>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Subscription, BrokerError> {
        let mut loops = Vec::with_capacity(self.options.partitions);
        for partition in 0..self.options.partitions {
            // Blocking reads get their own connection so they never stall publishes.
            let mut conn = self
                .client
                .get_multiplexed_async_connection()
                .await
                .map_err(BrokerError::backend)?;
            let stream = self.stream_key(topic, partition);
            let start = newest_entry_id(&mut conn, &stream).await?;

            loops.push(tokio::spawn(partition_loop(
                PartitionCursor {
                    topic,
                    partition,
                    stream,
                    last_id: start,
                },
                conn,
                self.options.block,
                handler.clone(),
                shutdown.clone(),
            )));
        }
        Ok(Subscription::new(topic, loops))
    }
}

struct PartitionCursor {
    topic: Topic,
    partition: usize,
    stream: String,
    last_id: String,
}

async fn newest_entry_id(
    conn: &mut MultiplexedConnection,
    stream: &str,
) -> Result<String, BrokerError> {
    let reply: StreamRangeReply = conn
        .xrevrange_count(stream, "+", "-", 1)
        .await
        .map_err(BrokerError::backend)?;
    Ok(reply
        .ids
        .into_iter()
        .next()
        .map(|entry| entry.id)
        .unwrap_or_else(|| "0-0".to_string()))
}

async fn partition_loop(
    mut cursor: PartitionCursor,
    mut conn: MultiplexedConnection,
    block: Duration,
    handler: Arc<dyn MessageHandler>,
    mut shutdown: watch::Receiver<bool>,
) {
    let block_ms = usize::try_from(block.as_millis()).unwrap_or(usize::MAX);
    let options = StreamReadOptions::default().block(block_ms).count(READ_BATCH);

    loop {
        if *shutdown.borrow() {
            break;
        }
        let keys = [cursor.stream.as_str()];
        let ids = [cursor.last_id.as_str()];
        let read: redis::RedisResult<StreamReadReply> = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            read = conn.xread_options(&keys, &ids, &options) => read,
        };

        let reply = match read {
            Ok(reply) => reply,
            Err(err) => {
                warn!(
                    target: "tasklane::events",
                    topic = %cursor.topic,
                    partition = cursor.partition,
                    error = %err,
                    "Stream read failed; retrying"
                );
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for entry in reply.keys.into_iter().flat_map(|key| key.ids) {
            cursor.last_id = entry.id.clone();
            match decode_entry(cursor.topic, &entry) {
                Ok(message) => deliver(handler.as_ref(), cursor.partition, &message).await,
                Err(err) => warn!(
                    target: "tasklane::events",
                    topic = %cursor.topic,
                    entry_id = %entry.id,
                    error = %err,
                    "Skipping malformed stream entry"
                ),
            }
        }
    }
    debug!(
        target: "tasklane::events",
        topic = %cursor.topic,
        partition = cursor.partition,
        "Partition loop stopped"
    );
}

fn decode_entry(topic: Topic, entry: &StreamId) -> Result<BrokerMessage, BrokerError> {
    let field = |name: &str| {
        entry
            .get::<String>(name)
            .ok_or_else(|| BrokerError::Malformed(format!("missing field `{name}`")))
    };

    let id = Uuid::parse_str(&field(FIELD_ID)?)
        .map_err(|err| BrokerError::Malformed(format!("bad message id: {err}")))?;
    let key = field(FIELD_KEY)?
        .parse::<i64>()
        .map_err(|err| BrokerError::Malformed(format!("bad key: {err}")))?;
    let published_at_ms = field(FIELD_PUBLISHED_AT)?
        .parse::<i128>()
        .map_err(|err| BrokerError::Malformed(format!("bad timestamp: {err}")))?;
    let published_at = OffsetDateTime::from_unix_timestamp_nanos(published_at_ms * 1_000_000)
        .map_err(|err| BrokerError::Malformed(format!("timestamp out of range: {err}")))?;
    let payload = entry
        .get::<Vec<u8>>(FIELD_PAYLOAD)
        .ok_or_else(|| BrokerError::Malformed(format!("missing field `{FIELD_PAYLOAD}`")))?;

    Ok(BrokerMessage {
        id,
        topic,
        key,
        payload,
        published_at,
    })
}
