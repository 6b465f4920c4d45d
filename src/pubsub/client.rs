use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the pub/sub service boundary.
///
/// `TopicNotFound` and `SubscriptionNotFound` are provisioning errors and
/// fatal at startup. `Transport` covers pull/acknowledge failures inside the
/// loop, which are retried with backoff and never escalate.
#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("Topic '{topic}' not found in project '{project}'")]
    TopicNotFound { project: String, topic: String },

    #[error("Subscription '{subscription}' not found on topic '{topic}'")]
    SubscriptionNotFound { topic: String, subscription: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Opaque handle acknowledging one delivery of one message.
///
/// A fresh handle is issued on every delivery; acknowledging an expired
/// handle is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AckId(String);

impl AckId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One message delivered by a pull call.
#[derive(Debug, Clone)]
pub struct PulledMessage {
    pub message_id: String,
    pub ack_id: AckId,
    pub payload: Vec<u8>,
    pub attributes: HashMap<String, String>,
}

/// Fully-qualified topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicHandle {
    pub project: String,
    pub topic: String,
}

impl fmt::Display for TopicHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.topic)
    }
}

/// Names the provisioned (topic, subscription) pair the loop pulls from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    pub topic: TopicHandle,
    pub subscription: String,
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.topic, self.subscription)
    }
}

/// Options applied when a subscription is created.
#[derive(Debug, Clone)]
pub struct SubscriptionOptions {
    /// How long a pulled message stays leased before it redelivers.
    pub ack_deadline: Duration,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            ack_deadline: Duration::from_secs(30),
        }
    }
}

/// The pub/sub service boundary.
///
/// Network transport, authentication, and retry policy live behind this
/// trait; the consumer loop only sees pull and acknowledge.
#[async_trait]
pub trait PubSubClient: Send + Sync {
    /// Resolve the topic, creating it when `autocreate` is set.
    async fn ensure_topic(
        &self,
        project: &str,
        topic: &str,
        autocreate: bool,
    ) -> Result<TopicHandle, PubSubError>;

    /// Resolve the subscription on `topic`, creating it when `autocreate`
    /// is set.
    async fn ensure_subscription(
        &self,
        topic: &TopicHandle,
        name: &str,
        autocreate: bool,
        options: SubscriptionOptions,
    ) -> Result<SubscriptionHandle, PubSubError>;

    /// Pull up to `max` messages, blocking until at least one message is
    /// available or `timeout` elapses. May return an empty batch.
    async fn pull(
        &self,
        subscription: &SubscriptionHandle,
        max: usize,
        timeout: Duration,
    ) -> Result<Vec<PulledMessage>, PubSubError>;

    /// Acknowledge a set of deliveries in one call.
    async fn acknowledge(
        &self,
        subscription: &SubscriptionHandle,
        ack_ids: Vec<AckId>,
    ) -> Result<(), PubSubError>;
}
