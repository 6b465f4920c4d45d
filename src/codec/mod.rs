pub mod json;
pub mod json_lines;
pub mod plain;

pub use json::JsonCodec;
pub use json_lines::JsonLinesCodec;
pub use plain::PlainCodec;

use crate::core::event::Event;
use std::collections::HashMap;

/// Decodes a message payload into zero-or-more events.
///
/// Decoding is all-or-nothing per message: an error from any part of the
/// payload fails the whole message, leaving it unacknowledged.
pub trait Codec: Send + Sync {
    fn decode(&self, payload: &[u8]) -> anyhow::Result<Vec<Event>>;
}

/// Creates a codec with the given type name and configuration.
/// # Arguments
/// * `name` - The codec type name.
/// * `parameters` - Free-form decoder parameters from the configuration.
/// # Returns
/// * The created codec, or an error if the type name is unknown.
pub fn create_codec(
    name: &str,
    parameters: &Option<HashMap<String, serde_json::Value>>,
) -> anyhow::Result<Box<dyn Codec>> {
    tracing::info!("Creating codec '{}'", name);

    match name {
        "plain" => PlainCodec::new(parameters),
        "json" => JsonCodec::new(parameters),
        "json_lines" => JsonLinesCodec::new(parameters),
        _ => Err(anyhow::anyhow!("Unknown codec type: {}", name)),
    }
}

/// Codec type names accepted by `create_codec`.
pub fn list_codecs() -> Vec<&'static str> {
    vec!["plain", "json", "json_lines"]
}
