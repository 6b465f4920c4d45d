use super::Codec;
use crate::config::{extract_param, DecoderConfig};
use crate::core::event::Event;

use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct JsonConfig {
    /// Field non-object JSON values are stored under
    pub field: String,
}

impl DecoderConfig for JsonConfig {
    fn from_params(params: &Option<HashMap<String, serde_json::Value>>) -> anyhow::Result<Self> {
        let field = extract_param(params, "field", "message".to_string());
        Ok(Self { field })
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.field.is_empty() {
            return Err(anyhow::anyhow!("JSON codec field cannot be empty"));
        }
        Ok(())
    }
}

/// Expand one parsed JSON value into events.
///
/// An object becomes one event; an array becomes one event per element
/// (so an empty array decodes to zero events); anything else is wrapped
/// under `field`.
pub(super) fn events_from_value(value: Value, field: &str) -> Vec<Event> {
    match value {
        Value::Array(elements) => elements
            .into_iter()
            .map(|element| event_from_element(element, field))
            .collect(),
        other => vec![event_from_element(other, field)],
    }
}

fn event_from_element(value: Value, field: &str) -> Event {
    match value {
        Value::Object(fields) => Event { fields },
        other => Event::new().with_field(field, other),
    }
}

/// Decodes the payload as a single JSON document.
pub struct JsonCodec {
    config: JsonConfig,
}

impl JsonCodec {
    pub fn new(params: &Option<HashMap<String, serde_json::Value>>) -> anyhow::Result<Box<dyn Codec>> {
        let config = JsonConfig::from_params(params)?;
        config.validate()?;

        Ok(Box::new(Self { config }))
    }
}

impl Codec for JsonCodec {
    fn decode(&self, payload: &[u8]) -> anyhow::Result<Vec<Event>> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| anyhow::anyhow!("Invalid JSON payload: {}", e))?;

        Ok(events_from_value(value, &self.config.field))
    }
}
