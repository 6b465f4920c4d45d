use super::json::events_from_value;
use super::Codec;
use crate::config::{extract_param, DecoderConfig};
use crate::core::event::Event;

use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct JsonLinesConfig {
    pub field: String,
}

impl DecoderConfig for JsonLinesConfig {
    fn from_params(params: &Option<HashMap<String, serde_json::Value>>) -> anyhow::Result<Self> {
        let field = extract_param(params, "field", "message".to_string());
        Ok(Self { field })
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.field.is_empty() {
            return Err(anyhow::anyhow!("JSON lines codec field cannot be empty"));
        }
        Ok(())
    }
}

/// Decodes newline-delimited JSON: one document per non-blank line.
///
/// A malformed line fails the whole message so it stays unacknowledged;
/// partial delivery of a multi-line payload would break the
/// all-events-or-nothing acknowledgment rule.
pub struct JsonLinesCodec {
    config: JsonLinesConfig,
}

impl JsonLinesCodec {
    pub fn new(params: &Option<HashMap<String, serde_json::Value>>) -> anyhow::Result<Box<dyn Codec>> {
        let config = JsonLinesConfig::from_params(params)?;
        config.validate()?;

        Ok(Box::new(Self { config }))
    }
}

impl Codec for JsonLinesCodec {
    fn decode(&self, payload: &[u8]) -> anyhow::Result<Vec<Event>> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| anyhow::anyhow!("Payload is not valid UTF-8: {}", e))?;

        let mut events = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let value: Value = serde_json::from_str(line)
                .map_err(|e| anyhow::anyhow!("Invalid JSON on line {}: {}", index + 1, e))?;
            events.extend(events_from_value(value, &self.config.field));
        }

        Ok(events)
    }
}
