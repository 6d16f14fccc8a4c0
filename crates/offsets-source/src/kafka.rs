//! [`Transport`] backed by librdkafka.
//!
//! A single consumer serves the whole offsets topic. The first opened stream
//! assigns every partition and splits each one into its own queue, which the
//! partition's stream then owns. librdkafka invalidates split queues whenever
//! the assignment changes, so the assignment is made once and never extended.

use crate::error::{Error, Result};
use crate::transport::{RawRecord, RecordStream, StartPosition, Transport};
use async_trait::async_trait;
use futures::StreamExt;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::stream_consumer::StreamPartitionQueue;
use rdkafka::consumer::{Consumer as RdkafkaConsumer, DefaultConsumerContext, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Message as RdkafkaMessage};
use rdkafka::{Offset, TopicPartitionList};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Configuration for the Kafka transport
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    pub client_id: String,
    /// Consumer group ID
    ///
    /// librdkafka wants one even for manually assigned partitions. Offsets are
    /// never committed under it.
    pub group_id: String,
    /// Extra librdkafka properties (security, timeouts, ...) applied last
    pub properties: Vec<(String, String)>,
    /// How long to wait for topic metadata
    pub metadata_timeout: Duration,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            client_id: "offsets-tail".to_string(),
            group_id: "offsets-tail".to_string(),
            properties: Vec::new(),
            metadata_timeout: Duration::from_secs(10),
        }
    }
}

impl KafkaConfig {
    fn client_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &self.brokers)
            .set("client.id", &self.client_id)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "false");
        for (key, value) in &self.properties {
            client_config.set(key, value);
        }
        client_config
    }
}

fn start_offset(start: StartPosition) -> Offset {
    match start {
        StartPosition::Oldest => Offset::Beginning,
        StartPosition::Newest => Offset::End,
    }
}

/// Per-partition queues split off the shared consumer, waiting to be opened.
struct PartitionQueues<Q> {
    topic: String,
    start: StartPosition,
    queues: BTreeMap<i32, Q>,
}

impl<Q> PartitionQueues<Q> {
    /// Hands out the queue of `partition`. Each queue can be taken once.
    fn take(&mut self, topic: &str, partition: i32, start: StartPosition) -> Result<Q> {
        if topic != self.topic || start != self.start {
            return Err(Error::OpenStream {
                partition,
                reason: format!(
                    "consumer is already assigned to {} from {:?}",
                    self.topic, self.start
                ),
            });
        }
        self.queues.remove(&partition).ok_or_else(|| Error::OpenStream {
            partition,
            reason: format!("partition {partition} of {topic} is not assigned or already open"),
        })
    }
}

struct Assignment {
    queues: PartitionQueues<StreamPartitionQueue<DefaultConsumerContext>>,
    main_queue: JoinHandle<()>,
}

/// Reads the offsets topic through one librdkafka consumer.
pub struct KafkaTransport {
    config: KafkaConfig,
    consumer: Arc<StreamConsumer>,
    assignment: Mutex<Option<Assignment>>,
}

impl KafkaTransport {
    /// Creates the client.
    ///
    /// librdkafka connects lazily, so an unreachable cluster is only detected
    /// by the first [`Transport::list_partitions`] call.
    pub fn new(config: KafkaConfig) -> Result<Self> {
        if config.brokers.trim().is_empty() {
            return Err(Error::InvalidConfig("no brokers configured".to_string()));
        }

        info!(brokers = %config.brokers, "Connecting to kafka cluster");
        let consumer: StreamConsumer = config
            .client_config()
            .create()
            .map_err(|e| Error::Connectivity(format!("Failed to create client: {e}")))?;

        Ok(Self {
            config,
            consumer: Arc::new(consumer),
            assignment: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &KafkaConfig {
        &self.config
    }

    /// Assigns every partition of `topic` at `start` and splits off their queues.
    async fn assign(&self, topic: &str, partition: i32, start: StartPosition) -> Result<Assignment> {
        let open_err = |e: KafkaError| Error::OpenStream {
            partition,
            reason: e.to_string(),
        };

        let partitions = self.list_partitions(topic).await?;
        let mut tpl = TopicPartitionList::new();
        for &p in &partitions {
            tpl.add_partition_offset(topic, p, start_offset(start))
                .map_err(open_err)?;
        }
        self.consumer.assign(&tpl).map_err(open_err)?;

        let mut queues = BTreeMap::new();
        for p in partitions {
            let queue = self
                .consumer
                .split_partition_queue(topic, p)
                .ok_or_else(|| Error::OpenStream {
                    partition: p,
                    reason: format!("no queue for partition {p} of {topic}"),
                })?;
            queues.insert(p, queue);
        }
        info!(topic, count = queues.len(), ?start, "Assigned partitions");

        Ok(Assignment {
            queues: PartitionQueues {
                topic: topic.to_string(),
                start,
                queues,
            },
            main_queue: tokio::spawn(poll_main_queue(Arc::clone(&self.consumer))),
        })
    }
}

impl Drop for KafkaTransport {
    fn drop(&mut self) {
        if let Some(assignment) = self.assignment.get_mut() {
            assignment.main_queue.abort();
        }
    }
}

#[async_trait]
impl Transport for KafkaTransport {
    async fn list_partitions(&self, topic: &str) -> Result<Vec<i32>> {
        let consumer = Arc::clone(&self.consumer);
        let topic_name = topic.to_string();
        let timeout = self.config.metadata_timeout;

        // fetch_metadata blocks the calling thread until the broker answers
        let metadata = tokio::task::spawn_blocking(move || {
            consumer.fetch_metadata(Some(topic_name.as_str()), timeout)
        })
        .await
        .map_err(|e| Error::Connectivity(format!("Metadata request task failed: {e}")))?
        .map_err(|e| {
            Error::Connectivity(format!("Failed to fetch metadata for topic {topic}: {e}"))
        })?;

        let topic_metadata = metadata
            .topics()
            .iter()
            .find(|t| t.name() == topic)
            .ok_or_else(|| Error::TopicNotFound(topic.to_string()))?;
        if let Some(err) = topic_metadata.error() {
            return Err(Error::TopicNotFound(format!("{topic}: {err:?}")));
        }

        let mut partitions: Vec<i32> = topic_metadata.partitions().iter().map(|p| p.id()).collect();
        if partitions.is_empty() {
            return Err(Error::TopicNotFound(format!("{topic}: no partitions")));
        }
        partitions.sort_unstable();
        info!(topic, count = partitions.len(), "Fetched partitions");
        Ok(partitions)
    }

    async fn open_partition_stream(
        &self,
        topic: &str,
        partition: i32,
        start: StartPosition,
    ) -> Result<RecordStream> {
        let mut guard = self.assignment.lock().await;
        let assignment = match guard.take() {
            Some(assignment) => assignment,
            None => self.assign(topic, partition, start).await?,
        };
        let queue = guard.insert(assignment).queues.take(topic, partition, start)?;
        drop(guard);

        debug!(topic, partition, ?start, "Opened partition stream");
        let stream = futures::stream::unfold(queue, move |queue| async move {
            let item = match queue.recv().await {
                Ok(message) => Ok(raw_record(&message)),
                Err(e) => Err(Error::Stream {
                    partition,
                    reason: e.to_string(),
                }),
            };
            Some((item, queue))
        });
        Ok(stream.boxed())
    }
}

fn raw_record(message: &BorrowedMessage<'_>) -> RawRecord {
    RawRecord {
        key: message.key().map(<[u8]>::to_vec).unwrap_or_default(),
        value: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        offset: message.offset(),
    }
}

/// Services the main queue of the shared consumer.
///
/// Every assigned partition reads from its own queue, so only client-level
/// events and errors arrive here.
async fn poll_main_queue(consumer: Arc<StreamConsumer>) {
    loop {
        match consumer.recv().await {
            Ok(message) => trace!(
                partition = message.partition(),
                offset = message.offset(),
                "Skipping message on main queue"
            ),
            Err(e) => warn!("Kafka client error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_offset() {
        assert_eq!(start_offset(StartPosition::Oldest), Offset::Beginning);
        assert_eq!(start_offset(StartPosition::Newest), Offset::End);
    }

    #[test]
    fn test_client_config_applies_extra_properties_last() {
        let config = KafkaConfig {
            brokers: "b1:9092,b2:9092".to_string(),
            properties: vec![
                ("security.protocol".to_string(), "SASL_SSL".to_string()),
                ("enable.partition.eof".to_string(), "true".to_string()),
            ],
            ..Default::default()
        };
        let client_config = config.client_config();
        assert_eq!(client_config.get("bootstrap.servers"), Some("b1:9092,b2:9092"));
        assert_eq!(client_config.get("enable.auto.commit"), Some("false"));
        assert_eq!(client_config.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(client_config.get("enable.partition.eof"), Some("true"));
    }

    #[test]
    fn test_empty_brokers_rejected() {
        let config = KafkaConfig {
            brokers: " ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            KafkaTransport::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    fn queues() -> PartitionQueues<&'static str> {
        PartitionQueues {
            topic: "__consumer_offsets".to_string(),
            start: StartPosition::Oldest,
            queues: BTreeMap::from([(0, "q0"), (1, "q1")]),
        }
    }

    #[test]
    fn test_partition_queue_taken_once() {
        let mut queues = queues();
        assert_eq!(
            queues.take("__consumer_offsets", 1, StartPosition::Oldest).unwrap(),
            "q1"
        );
        assert!(matches!(
            queues.take("__consumer_offsets", 1, StartPosition::Oldest),
            Err(Error::OpenStream { partition: 1, .. })
        ));
        assert!(matches!(
            queues.take("__consumer_offsets", 7, StartPosition::Oldest),
            Err(Error::OpenStream { partition: 7, .. })
        ));
        assert_eq!(
            queues.take("__consumer_offsets", 0, StartPosition::Oldest).unwrap(),
            "q0"
        );
    }

    #[test]
    fn test_partition_queue_rejects_other_assignment() {
        let mut queues = queues();
        assert!(queues.take("orders", 0, StartPosition::Oldest).is_err());
        assert!(queues.take("__consumer_offsets", 0, StartPosition::Newest).is_err());
        // Rejected requests leave the queue in place
        assert!(queues.take("__consumer_offsets", 0, StartPosition::Oldest).is_ok());
    }

    #[tokio::test]
    #[ignore = "Requires a Kafka broker at localhost:9092"]
    async fn test_partitions_share_one_client() {
        let transport = KafkaTransport::new(KafkaConfig::default()).unwrap();
        let partitions = transport.list_partitions("__consumer_offsets").await.unwrap();

        let mut streams = Vec::new();
        for &partition in &partitions {
            streams.push(
                transport
                    .open_partition_stream("__consumer_offsets", partition, StartPosition::Oldest)
                    .await
                    .unwrap(),
            );
        }

        // The transport, the main queue poller and one queue per partition
        assert_eq!(Arc::strong_count(&transport.consumer), 2 + partitions.len());
        drop(streams);
        assert_eq!(Arc::strong_count(&transport.consumer), 2);
    }
}
