use crate::codec::Codec;
use crate::config::ConsumerConfig;
use crate::consumer::backoff::Backoff;
use crate::consumer::decorate::Decorator;
use crate::core::channel::EventChannel;
use crate::core::event::Event;
use crate::pubsub::{AckId, PubSubClient, PulledMessage, SubscriptionHandle};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub enum ControlMessage {
    Terminate,
}

/// Outcome of decoding and forwarding a single pulled message.
///
/// Outcomes are plain values aggregated after the batch completes; the
/// acknowledgment set is derived from them in one place.
enum MessageOutcome {
    Delivered { events: usize },
    Failed { error: anyhow::Error },
}

/// The pull/acknowledge consumer loop.
///
/// Each iteration pulls up to `batch_size` messages, forwards the events of
/// each message independently, and acknowledges exactly the messages whose
/// events all reached the output channel. Everything else stays leased and
/// redelivers, which is what makes delivery at-least-once.
pub struct BatchConsumer {
    name: String,
    client: Arc<dyn PubSubClient>,
    subscription: SubscriptionHandle,
    codec: Box<dyn Codec>,
    decorator: Decorator,
    output: Arc<dyn EventChannel<Event>>,
    config: ConsumerConfig,
    control_channel: Option<broadcast::Receiver<ControlMessage>>,
    backoff: Backoff,
}

impl BatchConsumer {
    pub fn new(
        name: &str,
        client: Arc<dyn PubSubClient>,
        subscription: SubscriptionHandle,
        codec: Box<dyn Codec>,
        decorator: Decorator,
        output: Arc<dyn EventChannel<Event>>,
        config: ConsumerConfig,
    ) -> Self {
        let backoff = Backoff::new(
            Duration::from_millis(config.backoff_initial_ms),
            Duration::from_millis(config.backoff_max_ms),
        );

        Self {
            name: name.to_string(),
            client,
            subscription,
            codec,
            decorator,
            output,
            config,
            control_channel: None,
            backoff,
        }
    }

    pub fn attach_control_channel(
        &mut self,
        control_channel: broadcast::Receiver<ControlMessage>,
    ) {
        self.control_channel = Some(control_channel);
        tracing::info!("Consumer [{}] control channel attached", self.name);
    }

    /// Run until a terminate signal arrives.
    ///
    /// The stop check is cooperative: an in-flight batch always completes
    /// (including its acknowledgment call) before the signal is observed.
    /// The pull itself is raced against the control channel so an idle
    /// subscription does not delay shutdown.
    pub async fn run(mut self) {
        tracing::info!("Consumer [{}] is running", self.name);

        let pull_timeout = Duration::from_millis(self.config.pull_timeout_ms);

        loop {
            let pulled = tokio::select! {
                // Handle control messages
                Some(message) = async {
                    if let Some(control_channel) = &mut self.control_channel {
                        control_channel.recv().await.ok()
                    } else {
                        None
                    }
                } => {
                    match message {
                        ControlMessage::Terminate => {
                            tracing::info!("Consumer [{}] received terminate signal", self.name);
                            break;
                        }
                    }
                }

                // Pull the next batch
                pulled = self.client.pull(
                    &self.subscription,
                    self.config.batch_size,
                    pull_timeout,
                ) => pulled,
            };

            match pulled {
                Ok(batch) if batch.is_empty() => {
                    tokio::time::sleep(self.backoff.next_delay()).await;
                }
                Ok(batch) => {
                    self.backoff.reset();
                    self.process_batch(batch).await;
                }
                Err(e) => {
                    // Transport failures are never fatal here; the next
                    // pull retries after the backoff.
                    tracing::warn!("Pull failed on {}: {}", self.subscription, e);
                    tokio::time::sleep(self.backoff.next_delay()).await;
                }
            }
        }

        tracing::info!("Consumer [{}] stopped", self.name);
    }

    /// Forward one batch and acknowledge the messages that fully delivered.
    ///
    /// Messages are processed independently and in arrival order; a failure
    /// confines itself to its message. Returns the acknowledged set.
    pub async fn process_batch(&self, batch: Vec<PulledMessage>) -> Vec<AckId> {
        let mut outcomes: Vec<(PulledMessage, MessageOutcome)> = Vec::with_capacity(batch.len());

        for message in batch {
            let outcome = match self.deliver(&message).await {
                Ok(events) => MessageOutcome::Delivered { events },
                Err(error) => MessageOutcome::Failed { error },
            };
            outcomes.push((message, outcome));
        }

        let mut acked = Vec::new();
        for (message, outcome) in outcomes {
            match outcome {
                MessageOutcome::Delivered { events } => {
                    tracing::debug!(
                        "Message {} forwarded {} event(s)",
                        message.message_id,
                        events
                    );
                    acked.push(message.ack_id);
                }
                MessageOutcome::Failed { error } => {
                    tracing::warn!("Error processing message {}: {:#}", message.message_id, error);
                }
            }
        }

        if !acked.is_empty() {
            if let Err(e) = self
                .client
                .acknowledge(&self.subscription, acked.clone())
                .await
            {
                // The lapsed leases will redeliver; duplicates downstream
                // are tolerated under at-least-once.
                tracing::warn!("Acknowledge failed on {}: {}", self.subscription, e);
            }
        }

        acked
    }

    /// Decode one message and forward every derived event downstream.
    /// Returns the number of events enqueued; zero events is a success.
    async fn deliver(&self, message: &PulledMessage) -> anyhow::Result<usize> {
        let events = self.codec.decode(&message.payload)?;
        let count = events.len();

        for mut event in events {
            event.merge_attributes(&message.attributes);
            self.decorator.decorate(&mut event);
            self.output
                .publish(event)
                .await
                .map_err(|e| anyhow::anyhow!("Downstream enqueue failed: {:?}", e))?;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::create_codec;
    use crate::config::types::{ChannelType, DecorateConfig};
    use crate::core::channel::{Channel, Subscriber};
    use crate::pubsub::{MemoryBroker, PubSubError, SubscriptionOptions, TopicHandle};
    use serde_json::json;
    use std::collections::HashMap;

    struct Fixture {
        broker: Arc<MemoryBroker>,
        topic: TopicHandle,
        subscription: SubscriptionHandle,
        consumer: BatchConsumer,
        subscriber: Subscriber<Event>,
    }

    async fn fixture(codec: &str, ack_deadline_ms: u64) -> Fixture {
        let broker = Arc::new(MemoryBroker::new());
        let topic = broker.ensure_topic("local", "events", true).await.unwrap();
        let subscription = broker
            .ensure_subscription(
                &topic,
                "logstash",
                true,
                SubscriptionOptions {
                    ack_deadline: Duration::from_millis(ack_deadline_ms),
                },
            )
            .await
            .unwrap();

        let channel: Arc<Channel<Event>> = Arc::new(Channel::new(ChannelType::Direct, 64));
        let subscriber = channel.subscribe();

        let config = ConsumerConfig {
            pull_timeout_ms: 50,
            backoff_initial_ms: 1,
            backoff_max_ms: 5,
            ack_deadline_ms,
            ..ConsumerConfig::default()
        };

        let consumer = BatchConsumer::new(
            "pubsub",
            broker.clone(),
            subscription.clone(),
            create_codec(codec, &None).unwrap(),
            Decorator::new(&DecorateConfig::default()),
            channel,
            config,
        );

        Fixture {
            broker,
            topic,
            subscription,
            consumer,
            subscriber,
        }
    }

    fn publish(fixture: &Fixture, payload: &[u8]) -> String {
        fixture
            .broker
            .publish(&fixture.topic, payload.to_vec(), HashMap::new())
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn failed_message_is_skipped_and_redelivered() {
        let mut fixture = fixture("json", 100).await;

        publish(&fixture, br#"{"n": 1}"#);
        let failing = publish(&fixture, b"not json");
        publish(&fixture, br#"{"n": 3}"#);

        let batch = fixture
            .broker
            .pull(&fixture.subscription, 10, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(batch.len(), 3);
        let expected: Vec<AckId> = vec![batch[0].ack_id.clone(), batch[2].ack_id.clone()];

        let acked = fixture.consumer.process_batch(batch).await;

        // Exactly the decodable messages are acknowledged, in pull order.
        assert_eq!(acked, expected);

        let events = [
            fixture.subscriber.recv().await.unwrap(),
            fixture.subscriber.recv().await.unwrap(),
        ];
        assert_eq!(events[0].get("n"), Some(&json!(1)));
        assert_eq!(events[1].get("n"), Some(&json!(3)));
        assert_eq!(fixture.subscriber.try_recv().await, None);

        // Only the failed message redelivers once its lease lapses.
        let redelivered = fixture
            .broker
            .pull(&fixture.subscription, 10, Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].message_id, failing);
    }

    #[tokio::test]
    async fn zero_event_message_is_acknowledged() {
        let mut fixture = fixture("json", 30_000).await;
        publish(&fixture, b"[]");

        let batch = fixture
            .broker
            .pull(&fixture.subscription, 10, Duration::from_millis(10))
            .await
            .unwrap();
        let acked = fixture.consumer.process_batch(batch).await;

        assert_eq!(acked.len(), 1);
        assert_eq!(fixture.subscriber.try_recv().await, None);
    }

    #[tokio::test]
    async fn empty_batch_acknowledges_nothing() {
        let fixture = fixture("json", 30_000).await;
        let acked = fixture.consumer.process_batch(Vec::new()).await;
        assert!(acked.is_empty());
    }

    #[tokio::test]
    async fn attributes_override_decoded_fields() {
        let mut fixture = fixture("json", 30_000).await;

        let mut attributes = HashMap::new();
        attributes.insert("source".to_string(), "gateway".to_string());
        fixture
            .broker
            .publish(
                &fixture.topic,
                br#"{"source": "decoded", "n": 7}"#.to_vec(),
                attributes,
            )
            .unwrap();

        let batch = fixture
            .broker
            .pull(&fixture.subscription, 10, Duration::from_millis(10))
            .await
            .unwrap();
        fixture.consumer.process_batch(batch).await;

        let event = fixture.subscriber.recv().await.unwrap();
        assert_eq!(event.get("source"), Some(&json!("gateway")));
        assert_eq!(event.get("n"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn run_forwards_until_terminated() {
        let Fixture {
            broker,
            topic,
            mut consumer,
            mut subscriber,
            ..
        } = fixture("json", 30_000).await;

        let (control, control_rx) = broadcast::channel(4);
        consumer.attach_control_channel(control_rx);
        let handle = tokio::spawn(consumer.run());

        broker
            .publish(&topic, br#"{"n": 1}"#.to_vec(), HashMap::new())
            .unwrap();
        broker
            .publish(&topic, br#"{"n": 2}"#.to_vec(), HashMap::new())
            .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(5), subscriber.recv())
            .await
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), subscriber.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.get("n"), Some(&json!(1)));
        assert_eq!(second.get("n"), Some(&json!(2)));

        control.send(ControlMessage::Terminate).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn transport_error_surfaces_as_failed_pull() {
        // A pull against a never-provisioned subscription is the transport
        // failure path; the loop treats it like an empty batch plus backoff.
        let broker = MemoryBroker::new();
        let ghost = SubscriptionHandle {
            topic: TopicHandle {
                project: "local".to_string(),
                topic: "ghost".to_string(),
            },
            subscription: "ghost".to_string(),
        };

        let result = broker.pull(&ghost, 1, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(PubSubError::TopicNotFound { .. })));
    }
}
