pub mod client;
pub mod memory;

pub use client::{
    AckId, PubSubClient, PubSubError, PulledMessage, SubscriptionHandle, SubscriptionOptions,
    TopicHandle,
};
pub use memory::MemoryBroker;
