pub mod backoff;
pub mod batch;
pub mod decorate;
pub mod provision;

pub use batch::{BatchConsumer, ControlMessage};
pub use decorate::Decorator;
pub use provision::provision;
