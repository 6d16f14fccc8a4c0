//! Command-line and environment configuration.

mod duration;

pub use duration::parse_duration;

use clap::{Parser, ValueEnum};
use offsets_source::{ConsumerConfig, KafkaConfig, StartPosition};
use offsets_types::DEFAULT_OFFSETS_TOPIC;
use std::path::PathBuf;
use std::time::Duration;

/// Where to start reading each partition of the offsets topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StartFrom {
    /// Replay every retained record, rebuilding the state of all groups
    Oldest,
    /// Only observe commits made after startup
    Newest,
}

impl From<StartFrom> for StartPosition {
    fn from(start: StartFrom) -> Self {
        match start {
            StartFrom::Oldest => StartPosition::Oldest,
            StartFrom::Newest => StartPosition::Newest,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "offsets-tail")]
#[command(about = "Tails the Kafka consumer offsets topic and tracks committed offsets")]
#[command(long_about = None)]
pub struct Config {
    /// Kafka brokers (comma-separated or multiple --brokers)
    #[arg(long, value_delimiter = ',', required = true, env = "KAFKA_BROKERS")]
    pub brokers: Vec<String>,

    /// Name of the consumer offsets topic
    #[arg(long, default_value = DEFAULT_OFFSETS_TOPIC, env = "OFFSETS_TOPIC")]
    pub offsets_topic: String,

    /// Client id reported to the brokers
    #[arg(long, default_value = "offsets-tail", env = "KAFKA_CLIENT_ID")]
    pub client_id: String,

    /// Consumer group id handed to librdkafka (offsets are never committed)
    #[arg(long, default_value = "offsets-tail", env = "KAFKA_GROUP_ID")]
    pub group_id: String,

    /// Extra librdkafka property, e.g. --kafka-property security.protocol=SASL_SSL
    #[arg(long = "kafka-property", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub kafka_properties: Vec<(String, String)>,

    /// Where to start reading each partition
    #[arg(long, value_enum, default_value_t = StartFrom::Oldest, env = "START_FROM")]
    pub start_from: StartFrom,

    /// How long to wait for offsets topic metadata (e.g. "10s", "1m")
    #[arg(long, default_value = "10s", value_parser = parse_duration, env = "METADATA_TIMEOUT")]
    pub metadata_timeout: Duration,

    /// Capacity of the channel between partition consumers and the offset store
    #[arg(long, default_value_t = 1000, value_parser = parse_capacity, env = "SINK_CAPACITY")]
    pub sink_capacity: usize,

    /// How often to log the offset store status (e.g. "30s")
    #[arg(long, default_value = "30s", value_parser = parse_interval, env = "REPORT_INTERVAL")]
    pub report_interval: Duration,

    /// Write the final offset store as JSON to this file on shutdown
    #[arg(long, env = "SNAPSHOT_PATH")]
    pub snapshot_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    pub fn kafka_config(&self) -> KafkaConfig {
        KafkaConfig {
            brokers: self.brokers.join(","),
            client_id: self.client_id.clone(),
            group_id: self.group_id.clone(),
            properties: self.kafka_properties.clone(),
            metadata_timeout: self.metadata_timeout,
        }
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            topic: self.offsets_topic.clone(),
            start_position: self.start_from.into(),
        }
    }
}

fn parse_property(s: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Property key must not be empty in '{s}'");
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_interval(s: &str) -> anyhow::Result<Duration> {
    let interval = parse_duration(s)?;
    if interval.is_zero() {
        anyhow::bail!("Report interval must be greater than zero");
    }
    Ok(interval)
}

fn parse_capacity(s: &str) -> anyhow::Result<usize> {
    let capacity: usize = s
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid capacity '{s}': {e}"))?;
    if capacity == 0 {
        anyhow::bail!("Capacity must be greater than zero");
    }
    Ok(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["offsets-tail", "--brokers", "k1:9092,k2:9092"]).unwrap();
        assert_eq!(config.brokers, vec!["k1:9092", "k2:9092"]);
        assert_eq!(config.offsets_topic, "__consumer_offsets");
        assert_eq!(config.start_from, StartFrom::Oldest);
        assert_eq!(config.metadata_timeout, Duration::from_secs(10));
        assert_eq!(config.sink_capacity, 1000);
        assert_eq!(config.report_interval, Duration::from_secs(30));
        assert!(config.snapshot_path.is_none());

        let kafka = config.kafka_config();
        assert_eq!(kafka.brokers, "k1:9092,k2:9092");
        assert_eq!(kafka.metadata_timeout, Duration::from_secs(10));

        let consumer = config.consumer_config();
        assert_eq!(consumer.topic, "__consumer_offsets");
        assert_eq!(consumer.start_position, StartPosition::Oldest);
    }

    #[test]
    fn test_kafka_properties() {
        let config = Config::try_parse_from([
            "offsets-tail",
            "--brokers",
            "k1:9092",
            "--kafka-property",
            "security.protocol=SASL_SSL",
            "--kafka-property",
            "sasl.password=a=b",
        ])
        .unwrap();
        assert_eq!(
            config.kafka_properties,
            vec![
                ("security.protocol".to_string(), "SASL_SSL".to_string()),
                ("sasl.password".to_string(), "a=b".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_property_rejected() {
        let result = Config::try_parse_from([
            "offsets-tail",
            "--brokers",
            "k1:9092",
            "--kafka-property",
            "no-equals-sign",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result =
            Config::try_parse_from(["offsets-tail", "--brokers", "k1:9092", "--sink-capacity", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_report_interval_rejected() {
        for interval in ["0", "0s", "0ms", "0h"] {
            let result = Config::try_parse_from([
                "offsets-tail",
                "--brokers",
                "k1:9092",
                "--report-interval",
                interval,
            ]);
            assert!(result.is_err(), "{interval} was accepted");
        }
    }

    #[test]
    fn test_newest_and_durations() {
        let config = Config::try_parse_from([
            "offsets-tail",
            "--brokers",
            "k1:9092",
            "--start-from",
            "newest",
            "--metadata-timeout",
            "1m",
            "--report-interval",
            "500ms",
        ])
        .unwrap();
        assert_eq!(config.consumer_config().start_position, StartPosition::Newest);
        assert_eq!(config.metadata_timeout, Duration::from_secs(60));
        assert_eq!(config.report_interval, Duration::from_millis(500));
    }
}
