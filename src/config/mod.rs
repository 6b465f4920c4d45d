///! Configuration Module

pub mod loader;
pub mod params;
pub mod traits;
pub mod types;
pub mod validation;

pub use traits::DecoderConfig;

pub use loader::load_config;
pub use params::extract_param;
pub use types::{ChannelType, CodecConfig, Config, ConsumerConfig, DecorateConfig, PubSubConfig};
pub use validation::validate_config;
