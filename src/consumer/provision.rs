use crate::config::{ConsumerConfig, PubSubConfig};
use crate::pubsub::{PubSubClient, PubSubError, SubscriptionHandle, SubscriptionOptions};
use std::time::Duration;

/// Resolve (or create) the topic and subscription the consumer pulls from.
///
/// Runs exactly once per process and is not retried: a missing topic or
/// subscription with autocreation disabled is fatal to startup.
pub async fn provision(
    client: &dyn PubSubClient,
    pubsub: &PubSubConfig,
    consumer: &ConsumerConfig,
) -> Result<SubscriptionHandle, PubSubError> {
    tracing::info!(
        "Registering pub/sub consumer (project: {}, keyfile: {:?}, topic: {}, subscription: {})",
        pubsub.project,
        pubsub.keyfile,
        pubsub.topic,
        pubsub.subscription
    );

    let topic_project = pubsub.topic_project.as_deref().unwrap_or(&pubsub.project);
    let topic = client
        .ensure_topic(topic_project, &pubsub.topic, pubsub.autocreate_topic)
        .await?;
    tracing::debug!("Topic: {}", topic);

    let subscription = client
        .ensure_subscription(
            &topic,
            &pubsub.subscription,
            pubsub.autocreate_subscription,
            SubscriptionOptions {
                ack_deadline: Duration::from_millis(consumer.ack_deadline_ms),
            },
        )
        .await?;
    tracing::debug!("Subscription: {}", subscription);

    Ok(subscription)
}
