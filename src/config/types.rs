//! Configuration Type Definitions
//!
//! Core configuration structures for culvert. These types are deserialised
//! from TOML configuration files and used to construct the consumer loop.

use serde::Deserialize;
use std::collections::HashMap;

/// Communication channel type between the consumer and the downstream
/// pipeline.
///
/// Both variants are bounded and exert backpressure; they differ in how
/// many consumers may drain them.
#[derive(Clone, Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Point-to-point MPSC channel (default)
    ///
    /// Single consumer with reliable delivery. The consumer loop will wait
    /// if the downstream falls behind.
    #[default]
    Direct,

    /// Multi-consumer MPMC channel
    ///
    /// Multiple consumers share the event load. Each event is delivered to
    /// exactly one consumer. Good for work distribution.
    Shared,
}

/// Root configuration for the whole process.
///
/// # Example Structure
///
/// ```toml
/// [pubsub]
/// topic = "events"
/// subscription = "logstash"
///
/// [consumer]
/// batch_size = 10
///
/// [codec]
/// type = "plain"
///
/// [sink]
/// type = "direct"
/// capacity = 128
/// ```
#[derive(Clone, Debug, Deserialize, Default)]
pub struct Config {
    /// Topic and subscription provisioning settings
    #[serde(default)]
    pub pubsub: PubSubConfig,

    /// Consumer loop settings (batching, timeouts, backoff)
    #[serde(default)]
    pub consumer: ConsumerConfig,

    /// Payload decoder selection and free-form decoder parameters
    #[serde(default)]
    pub codec: CodecConfig,

    /// Downstream event channel settings
    #[serde(default)]
    pub sink: SinkConfig,

    /// Pipeline metadata stamped onto every forwarded event
    #[serde(default)]
    pub decorate: DecorateConfig,

    /// Optional local publisher that feeds the broker with generated data
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Settings for the startup provisioning step.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PubSubConfig {
    /// Project the subscription lives in
    #[serde(default = "default_project")]
    pub project: String,

    /// Path to credential material (unused by the in-process broker,
    /// carried for parity with managed services)
    pub keyfile: Option<String>,

    /// The name of the topic to consume from
    #[serde(default)]
    pub topic: String,

    /// Autocreate the topic if it doesn't exist
    #[serde(default = "default_true")]
    pub autocreate_topic: bool,

    /// The name of the project that the topic is in (if it's not the
    /// current project)
    pub topic_project: Option<String>,

    /// The name of the subscription on the topic
    #[serde(default = "default_subscription")]
    pub subscription: String,

    /// Autocreate the subscription if it doesn't exist
    #[serde(default = "default_true")]
    pub autocreate_subscription: bool,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            project: default_project(),
            keyfile: None,
            topic: String::new(),
            autocreate_topic: true,
            topic_project: None,
            subscription: default_subscription(),
            autocreate_subscription: true,
        }
    }
}

/// Settings for the consumer loop itself.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Maximum number of messages to pull in a single call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// How long a pull call blocks waiting for at least one message
    #[serde(default = "default_pull_timeout_ms")]
    pub pull_timeout_ms: u64,

    /// How long the broker holds a pulled message before redelivering it
    #[serde(default = "default_ack_deadline_ms")]
    pub ack_deadline_ms: u64,

    /// Initial delay after an empty pull or a transport error
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Upper bound on the backoff delay
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            pull_timeout_ms: default_pull_timeout_ms(),
            ack_deadline_ms: default_ack_deadline_ms(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

/// Codec selection plus free-form decoder parameters.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CodecConfig {
    /// The decoder to instantiate (e.g., "plain", "json", "json_lines")
    #[serde(rename = "type", default = "default_codec")]
    pub r#type: String,

    /// Decoder-specific configuration parameters
    pub parameters: Option<HashMap<String, serde_json::Value>>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            r#type: default_codec(),
            parameters: None,
        }
    }
}

/// Configuration for the downstream event channel.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SinkConfig {
    /// The type of channel to create
    #[serde(rename = "type", default)]
    pub r#type: ChannelType,

    /// Maximum number of events the channel can buffer
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            r#type: ChannelType::default(),
            capacity: default_capacity(),
        }
    }
}

/// Pipeline metadata added to every forwarded event.
#[derive(Clone, Debug, Deserialize, Default, PartialEq, Eq)]
pub struct DecorateConfig {
    /// Fields stamped onto events that do not already carry them
    #[serde(default)]
    pub add_fields: HashMap<String, String>,

    /// Tags appended to each event's `tags` array
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Optional local publisher used to demo the consumer end to end.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SimulatorConfig {
    /// Whether the simulator task is spawned at all
    #[serde(default)]
    pub enabled: bool,

    /// Delay between published messages
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Number of messages to publish; 0 means unbounded
    #[serde(default)]
    pub count: u64,

    /// Value distribution: "uniform" or "normal"
    #[serde(default = "default_distribution")]
    pub distribution: String,

    #[serde(default)]
    pub min_value: f64,

    #[serde(default = "default_max_value")]
    pub max_value: f64,

    /// Field name the generated value is published under
    #[serde(default = "default_value_name")]
    pub value_name: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_interval_ms(),
            count: 0,
            distribution: default_distribution(),
            min_value: 0.0,
            max_value: default_max_value(),
            value_name: default_value_name(),
        }
    }
}

fn default_project() -> String {
    "local".to_string()
}

fn default_subscription() -> String {
    "logstash".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_batch_size() -> usize {
    10
}

const fn default_pull_timeout_ms() -> u64 {
    1000
}

const fn default_ack_deadline_ms() -> u64 {
    30_000
}

const fn default_backoff_initial_ms() -> u64 {
    50
}

const fn default_backoff_max_ms() -> u64 {
    1000
}

fn default_codec() -> String {
    "plain".to_string()
}

const fn default_capacity() -> usize {
    128
}

const fn default_interval_ms() -> u64 {
    1000
}

fn default_distribution() -> String {
    "uniform".to_string()
}

const fn default_max_value() -> f64 {
    100.0
}

fn default_value_name() -> String {
    "value".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [pubsub]
            topic = "events"
            "#,
        )
        .unwrap();

        assert_eq!(config.pubsub.topic, "events");
        assert_eq!(config.pubsub.project, "local");
        assert_eq!(config.pubsub.subscription, "logstash");
        assert!(config.pubsub.autocreate_topic);
        assert!(config.pubsub.autocreate_subscription);
        assert_eq!(config.consumer.batch_size, 10);
        assert_eq!(config.codec.r#type, "plain");
        assert_eq!(config.sink.r#type, ChannelType::Direct);
        assert_eq!(config.sink.capacity, 128);
        assert!(!config.simulator.enabled);
    }

    #[test]
    fn channel_type_parses_lowercase() {
        let config: Config = toml::from_str(
            r#"
            [pubsub]
            topic = "events"

            [sink]
            type = "shared"
            capacity = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.sink.r#type, ChannelType::Shared);
        assert_eq!(config.sink.capacity, 16);
    }
}
