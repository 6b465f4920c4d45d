use super::client::{
    AckId, PubSubClient, PubSubError, PulledMessage, SubscriptionHandle, SubscriptionOptions,
    TopicHandle,
};

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

/// An in-process broker implementing the pub/sub service boundary.
///
/// Backs the demo binary and the test suite. Messages published to a topic
/// fan out to every subscription on it; pulled messages are leased for the
/// subscription's ack deadline and return to the queue when the lease
/// expires, which is what makes delivery at-least-once.
pub struct MemoryBroker {
    state: Mutex<BrokerState>,
    notify: Notify,
}

#[derive(Default)]
struct BrokerState {
    topics: HashMap<TopicHandle, TopicState>,
    next_seq: u64,
}

#[derive(Default)]
struct TopicState {
    subscriptions: HashMap<String, SubscriptionState>,
}

struct SubscriptionState {
    ack_deadline: Duration,
    queue: VecDeque<StoredMessage>,
    leased: HashMap<AckId, Lease>,
}

#[derive(Clone)]
struct StoredMessage {
    seq: u64,
    message_id: String,
    payload: Vec<u8>,
    attributes: HashMap<String, String>,
}

struct Lease {
    message: StoredMessage,
    expires_at: Instant,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BrokerState::default()),
            notify: Notify::new(),
        }
    }

    /// Publish a message to a topic, fanning out to all its subscriptions.
    /// Returns the broker-assigned message id.
    pub fn publish(
        &self,
        topic: &TopicHandle,
        payload: Vec<u8>,
        attributes: HashMap<String, String>,
    ) -> Result<String, PubSubError> {
        let mut state = self.state.lock().expect("broker state mutex poisoned");

        let seq = state.next_seq;
        state.next_seq += 1;

        let topic_state =
            state
                .topics
                .get_mut(topic)
                .ok_or_else(|| PubSubError::TopicNotFound {
                    project: topic.project.clone(),
                    topic: topic.topic.clone(),
                })?;

        let message = StoredMessage {
            seq,
            message_id: Uuid::new_v4().to_string(),
            payload,
            attributes,
        };

        for subscription in topic_state.subscriptions.values_mut() {
            subscription.queue.push_back(message.clone());
        }

        drop(state);
        self.notify.notify_waiters();

        Ok(message.message_id)
    }

    fn subscription_mut<'a>(
        state: &'a mut BrokerState,
        handle: &SubscriptionHandle,
    ) -> Result<&'a mut SubscriptionState, PubSubError> {
        state
            .topics
            .get_mut(&handle.topic)
            .ok_or_else(|| PubSubError::TopicNotFound {
                project: handle.topic.project.clone(),
                topic: handle.topic.topic.clone(),
            })?
            .subscriptions
            .get_mut(&handle.subscription)
            .ok_or_else(|| PubSubError::SubscriptionNotFound {
                topic: handle.topic.topic.clone(),
                subscription: handle.subscription.clone(),
            })
    }

    /// Return expired leases to the queue, oldest first.
    fn reclaim_expired(subscription: &mut SubscriptionState, now: Instant) {
        let expired: Vec<AckId> = subscription
            .leased
            .iter()
            .filter(|(_, lease)| lease.expires_at <= now)
            .map(|(ack_id, _)| ack_id.clone())
            .collect();

        if expired.is_empty() {
            return;
        }

        for ack_id in expired {
            if let Some(lease) = subscription.leased.remove(&ack_id) {
                subscription.queue.push_back(lease.message);
            }
        }

        subscription
            .queue
            .make_contiguous()
            .sort_by_key(|message| message.seq);
    }

    fn earliest_expiry(subscription: &SubscriptionState) -> Option<Instant> {
        subscription
            .leased
            .values()
            .map(|lease| lease.expires_at)
            .min()
    }

    fn lease_batch(
        subscription: &mut SubscriptionState,
        max: usize,
        now: Instant,
    ) -> Vec<PulledMessage> {
        let mut batch = Vec::new();

        while batch.len() < max {
            let Some(message) = subscription.queue.pop_front() else {
                break;
            };

            let ack_id = AckId::new(Uuid::new_v4().to_string());
            batch.push(PulledMessage {
                message_id: message.message_id.clone(),
                ack_id: ack_id.clone(),
                payload: message.payload.clone(),
                attributes: message.attributes.clone(),
            });

            subscription.leased.insert(
                ack_id,
                Lease {
                    message,
                    expires_at: now + subscription.ack_deadline,
                },
            );
        }

        batch
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PubSubClient for MemoryBroker {
    async fn ensure_topic(
        &self,
        project: &str,
        topic: &str,
        autocreate: bool,
    ) -> Result<TopicHandle, PubSubError> {
        let handle = TopicHandle {
            project: project.to_string(),
            topic: topic.to_string(),
        };

        let mut state = self.state.lock().expect("broker state mutex poisoned");

        if state.topics.contains_key(&handle) {
            return Ok(handle);
        }

        if !autocreate {
            return Err(PubSubError::TopicNotFound {
                project: project.to_string(),
                topic: topic.to_string(),
            });
        }

        state.topics.insert(handle.clone(), TopicState::default());
        Ok(handle)
    }

    async fn ensure_subscription(
        &self,
        topic: &TopicHandle,
        name: &str,
        autocreate: bool,
        options: SubscriptionOptions,
    ) -> Result<SubscriptionHandle, PubSubError> {
        let mut state = self.state.lock().expect("broker state mutex poisoned");

        let topic_state =
            state
                .topics
                .get_mut(topic)
                .ok_or_else(|| PubSubError::TopicNotFound {
                    project: topic.project.clone(),
                    topic: topic.topic.clone(),
                })?;

        if !topic_state.subscriptions.contains_key(name) {
            if !autocreate {
                return Err(PubSubError::SubscriptionNotFound {
                    topic: topic.topic.clone(),
                    subscription: name.to_string(),
                });
            }

            topic_state.subscriptions.insert(
                name.to_string(),
                SubscriptionState {
                    ack_deadline: options.ack_deadline,
                    queue: VecDeque::new(),
                    leased: HashMap::new(),
                },
            );
        }

        Ok(SubscriptionHandle {
            topic: topic.clone(),
            subscription: name.to_string(),
        })
    }

    async fn pull(
        &self,
        subscription: &SubscriptionHandle,
        max: usize,
        timeout: Duration,
    ) -> Result<Vec<PulledMessage>, PubSubError> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register for wakeups before checking state, so a publish
            // racing the check is not lost.
            notified.as_mut().enable();

            let next_expiry = {
                let mut state = self.state.lock().expect("broker state mutex poisoned");
                let sub = Self::subscription_mut(&mut state, subscription)?;

                let now = Instant::now();
                Self::reclaim_expired(sub, now);

                if !sub.queue.is_empty() {
                    return Ok(Self::lease_batch(sub, max, now));
                }

                Self::earliest_expiry(sub)
            };

            let now = Instant::now();
            let remaining = deadline.saturating_duration_since(now);
            if remaining.is_zero() {
                return Ok(Vec::new());
            }

            // Wake early if an outstanding lease expires before the pull
            // deadline, so redelivery is not delayed by a sleeping pull.
            let wait = match next_expiry {
                Some(expiry) => expiry.saturating_duration_since(now).min(remaining),
                None => remaining,
            };

            if wait.is_zero() {
                continue;
            }

            if tokio::time::timeout(wait, notified).await.is_err() && next_expiry.is_none() {
                return Ok(Vec::new());
            }
        }
    }

    async fn acknowledge(
        &self,
        subscription: &SubscriptionHandle,
        ack_ids: Vec<AckId>,
    ) -> Result<(), PubSubError> {
        let mut state = self.state.lock().expect("broker state mutex poisoned");
        let sub = Self::subscription_mut(&mut state, subscription)?;

        // Unknown or expired handles are ignored: the lease already lapsed
        // and the message will redeliver.
        for ack_id in ack_ids {
            sub.leased.remove(&ack_id);
        }

        Ok(())
    }
}
