use super::Codec;
use crate::config::{extract_param, DecoderConfig};
use crate::core::event::Event;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PlainConfig {
    /// Field the payload text is stored under
    pub field: String,
}

impl DecoderConfig for PlainConfig {
    fn from_params(params: &Option<HashMap<String, serde_json::Value>>) -> anyhow::Result<Self> {
        let field = extract_param(params, "field", "message".to_string());
        Ok(Self { field })
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.field.is_empty() {
            return Err(anyhow::anyhow!("Plain codec field cannot be empty"));
        }
        Ok(())
    }
}

/// Treats the payload as opaque text producing exactly one event.
///
/// Payloads that are not valid UTF-8 are carried base64-encoded under
/// `message_b64` rather than rejected.
pub struct PlainCodec {
    config: PlainConfig,
}

impl PlainCodec {
    pub fn new(params: &Option<HashMap<String, serde_json::Value>>) -> anyhow::Result<Box<dyn Codec>> {
        let config = PlainConfig::from_params(params)?;
        config.validate()?;

        Ok(Box::new(Self { config }))
    }
}

impl Codec for PlainCodec {
    fn decode(&self, payload: &[u8]) -> anyhow::Result<Vec<Event>> {
        let event = match std::str::from_utf8(payload) {
            Ok(text) => Event::new().with_field(&self.config.field, Value::String(text.to_owned())),
            Err(_) => Event::new()
                .with_field("message_b64", Value::String(BASE64.encode(payload))),
        };

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn utf8_payload_produces_one_event() {
        let codec = PlainCodec::new(&None).unwrap();
        let events = codec.decode(b"a log line").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].get("message"), Some(&json!("a log line")));
    }

    #[test]
    fn field_name_is_configurable() {
        let mut params = HashMap::new();
        params.insert("field".to_string(), json!("raw"));

        let codec = PlainCodec::new(&Some(params)).unwrap();
        let events = codec.decode(b"text").unwrap();
        assert_eq!(events[0].get("raw"), Some(&json!("text")));
    }

    #[test]
    fn non_utf8_payload_falls_back_to_base64() {
        let codec = PlainCodec::new(&None).unwrap();
        let events = codec.decode(&[0xff, 0xfe, 0x01]).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].get("message_b64"), Some(&json!("//4B")));
    }

    #[test]
    fn empty_field_is_rejected() {
        let mut params = HashMap::new();
        params.insert("field".to_string(), json!(""));
        assert!(PlainCodec::new(&Some(params)).is_err());
    }
}
