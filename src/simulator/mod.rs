use crate::config::types::SimulatorConfig;
use crate::core::time::now_millis;
use crate::pubsub::{MemoryBroker, TopicHandle};

use rand_distr::{Distribution, Normal, Uniform};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;

/// Publishes generated JSON payloads to the local broker so the consumer
/// can be exercised end to end without an external service.
pub struct Simulator {
    name: String,
    config: SimulatorConfig,
    broker: Arc<MemoryBroker>,
    topic: TopicHandle,
}

impl Simulator {
    pub fn new(
        name: &str,
        config: SimulatorConfig,
        broker: Arc<MemoryBroker>,
        topic: TopicHandle,
    ) -> Self {
        Self {
            name: name.to_string(),
            config,
            broker,
            topic,
        }
    }

    pub async fn run(self) {
        tracing::info!("Simulator '{}' publishing to {}", self.name, self.topic);

        let mut published = 0u64;

        loop {
            if self.config.count > 0 && published >= self.config.count {
                break;
            }

            tokio::time::sleep(Duration::from_millis(self.config.interval_ms)).await;

            // The rng is dropped before the publish so the task stays Send.
            let value = {
                let mut rng = rand::rng();
                match self.config.distribution.as_str() {
                    "uniform" => {
                        let uniform = Uniform::new(self.config.min_value, self.config.max_value)
                            .unwrap_or_else(|_| Uniform::new(0.0, 1.0).unwrap());
                        uniform.sample(&mut rng)
                    }
                    "normal" => {
                        let mean = (self.config.min_value + self.config.max_value) / 2.0;
                        let stddev = (self.config.max_value - self.config.min_value) / 6.0;
                        let normal = Normal::new(mean, stddev)
                            .unwrap_or_else(|_| Normal::new(0.0, 1.0).unwrap());
                        normal
                            .sample(&mut rng)
                            .clamp(self.config.min_value, self.config.max_value)
                    }
                    _ => {
                        tracing::warn!(
                            "Unknown distribution type: {}, using uniform",
                            self.config.distribution
                        );
                        let uniform = Uniform::new(self.config.min_value, self.config.max_value)
                            .unwrap_or_else(|_| Uniform::new(0.0, 1.0).unwrap());
                        uniform.sample(&mut rng)
                    }
                }
            };

            let mut fields = serde_json::Map::new();
            fields.insert(self.config.value_name.clone(), serde_json::json!(value));
            let payload = serde_json::Value::Object(fields).to_string().into_bytes();

            let mut attributes = HashMap::new();
            attributes.insert("origin".to_string(), self.name.clone());
            attributes.insert("published_ms".to_string(), now_millis().to_string());

            match self.broker.publish(&self.topic, payload, attributes) {
                Ok(message_id) => tracing::debug!("Simulator published message {}", message_id),
                Err(e) => {
                    tracing::warn!("Simulator publish failed: {}", e);
                    break;
                }
            }

            published += 1;
        }

        tracing::info!(
            "Simulator '{}' finished after {} message(s)",
            self.name,
            published
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubsub::{PubSubClient, SubscriptionOptions};

    #[tokio::test(start_paused = true)]
    async fn publishes_the_configured_count_and_stops() {
        let broker = Arc::new(MemoryBroker::new());
        let topic = broker.ensure_topic("local", "events", true).await.unwrap();
        let subscription = broker
            .ensure_subscription(&topic, "logstash", true, SubscriptionOptions::default())
            .await
            .unwrap();

        let config = SimulatorConfig {
            enabled: true,
            interval_ms: 10,
            count: 3,
            ..SimulatorConfig::default()
        };

        Simulator::new("sim", config, broker.clone(), topic).run().await;

        let batch = broker
            .pull(&subscription, 10, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].attributes.get("origin").unwrap(), "sim");

        let payload: serde_json::Value = serde_json::from_slice(&batch[0].payload).unwrap();
        assert!(payload.get("value").is_some());
    }
}
