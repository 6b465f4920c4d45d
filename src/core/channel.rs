use crate::config::types::ChannelType;
use async_trait::async_trait;
use flume;
use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum PublishError<M> {
    MpscError(mpsc::error::SendError<M>),
    FlumeError(flume::SendError<M>),
}

pub enum Subscriber<M> {
    Mpsc(mpsc::Receiver<M>),
    Flume(flume::Receiver<M>),
}

impl<M> Subscriber<M> {
    /// Receive the next message from the channel.
    /// - mpsc: returns `None` if the channel is closed.
    /// - flume: returns `None` if disconnected.
    pub async fn recv(&mut self) -> Option<M> {
        match self {
            Subscriber::Mpsc(rx) => rx.recv().await,
            Subscriber::Flume(rx) => match rx.recv_async().await {
                Ok(msg) => Some(msg),
                Err(flume::RecvError::Disconnected) => None,
            },
        }
    }

    pub async fn try_recv(&mut self) -> Option<M> {
        match self {
            Subscriber::Mpsc(rx) => match rx.try_recv() {
                Ok(msg) => Some(msg),
                _ => None,
            },
            Subscriber::Flume(rx) => match rx.try_recv() {
                Ok(msg) => Some(msg),
                _ => None,
            },
        }
    }
}

/// A bounded channel carrying decoded events to the downstream pipeline.
///
/// Publishing blocks while the buffer is full. That stall delays
/// acknowledgment of the source messages, which in turn delays redelivery
/// suppression: backpressure propagates all the way to the subscription.
#[async_trait]
pub trait EventChannel<M>: Send + Sync {
    /// Publish a message to the channel.
    async fn publish(&self, msg: M) -> Result<(), PublishError<M>>;

    /// Subscribe to the channel to get a fresh receiver.
    fn subscribe(&self) -> Subscriber<M>;
}

/// MPSC / point-to-point channel
pub struct MpscChannel<M> {
    sender: mpsc::Sender<M>,
    receiver: Mutex<Option<mpsc::Receiver<M>>>,
}

impl<M> MpscChannel<M> {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }
}

#[async_trait]
impl<M> EventChannel<M> for MpscChannel<M>
where
    M: Send + 'static,
{
    async fn publish(&self, msg: M) -> Result<(), PublishError<M>> {
        self.sender.send(msg).await.map_err(PublishError::MpscError)
    }

    fn subscribe(&self) -> Subscriber<M> {
        let mut guard = self
            .receiver
            .lock()
            .expect("mpsc: lock failed, poisoned receiver mutex!");

        Subscriber::Mpsc(
            guard
                .take()
                .expect("mpsc: subscribe() called more than once"),
        )
    }
}

/// Flume channel / work-sharing MPMC channel (at-least-once)
pub struct FlumeChannel<M> {
    sender: flume::Sender<M>,
    receiver: flume::Receiver<M>,
}

impl<M> FlumeChannel<M> {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity);
        Self { sender, receiver }
    }
}

#[async_trait]
impl<M> EventChannel<M> for FlumeChannel<M>
where
    M: Send + 'static,
{
    async fn publish(&self, msg: M) -> Result<(), PublishError<M>> {
        self.sender
            .send_async(msg)
            .await
            .map_err(PublishError::FlumeError)
    }

    fn subscribe(&self) -> Subscriber<M> {
        Subscriber::Flume(self.receiver.clone())
    }
}

// Enum wrapper for different channel types
pub enum Channel<M> {
    Mpsc(MpscChannel<M>),
    Flume(FlumeChannel<M>),
}

impl<M> Channel<M>
where
    M: Send + 'static,
{
    pub fn new(kind: ChannelType, capacity: usize) -> Self {
        match kind {
            ChannelType::Direct => Channel::Mpsc(MpscChannel::new(capacity)),
            ChannelType::Shared => Channel::Flume(FlumeChannel::new(capacity)),
        }
    }
}

#[async_trait]
impl<M> EventChannel<M> for Channel<M>
where
    M: Send + 'static,
{
    async fn publish(&self, msg: M) -> Result<(), PublishError<M>> {
        match self {
            Channel::Mpsc(mc) => mc.publish(msg).await,
            Channel::Flume(fc) => fc.publish(msg).await,
        }
    }

    fn subscribe(&self) -> Subscriber<M> {
        match self {
            Channel::Mpsc(mc) => mc.subscribe(),
            Channel::Flume(fc) => fc.subscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn direct_channel_delivers_in_order() {
        let channel: Channel<u32> = Channel::new(ChannelType::Direct, 8);
        let mut subscriber = channel.subscribe();

        for n in 0..3 {
            channel.publish(n).await.unwrap();
        }

        assert_eq!(subscriber.recv().await, Some(0));
        assert_eq!(subscriber.recv().await, Some(1));
        assert_eq!(subscriber.recv().await, Some(2));
    }

    #[tokio::test]
    async fn shared_channel_delivers_each_message_once() {
        let channel: Channel<u32> = Channel::new(ChannelType::Shared, 8);
        let mut first = channel.subscribe();
        let mut second = channel.subscribe();

        channel.publish(1).await.unwrap();
        channel.publish(2).await.unwrap();

        let mut received = Vec::new();
        received.push(first.recv().await.unwrap());
        received.push(second.recv().await.unwrap());
        received.sort();

        assert_eq!(received, vec![1, 2]);
        assert_eq!(first.try_recv().await, None);
    }

    #[tokio::test]
    async fn full_direct_channel_blocks_publish() {
        let channel: Channel<u32> = Channel::new(ChannelType::Direct, 1);
        channel.publish(1).await.unwrap();

        let pending = channel.publish(2);
        tokio::pin!(pending);

        // Buffer is full, so the second publish must not complete yet.
        let raced =
            tokio::time::timeout(tokio::time::Duration::from_millis(50), pending.as_mut()).await;
        assert!(raced.is_err());

        let mut subscriber = channel.subscribe();
        assert_eq!(subscriber.recv().await, Some(1));
        pending.await.unwrap();
        assert_eq!(subscriber.recv().await, Some(2));
    }
}
