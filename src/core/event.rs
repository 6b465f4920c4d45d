use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// A single decoded record flowing towards the downstream pipeline.
///
/// An event is a flat mapping of field names to JSON values. One pulled
/// message may decode into zero, one, or many events depending on the codec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub fields: Map<String, Value>,
}

impl Event {
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Merge message attributes into the event.
    /// Attribute values replace decoded fields on key collision.
    pub fn merge_attributes(&mut self, attributes: &HashMap<String, String>) {
        for (key, value) in attributes {
            self.fields
                .insert(key.clone(), Value::String(value.clone()));
        }
    }

    /// Append a tag to the event's `tags` array, creating it if missing.
    /// Duplicate tags are skipped.
    pub fn append_tag(&mut self, tag: &str) {
        let tags = self
            .fields
            .entry("tags")
            .or_insert_with(|| Value::Array(Vec::new()));

        if let Value::Array(list) = tags {
            if !list.iter().any(|t| t == tag) {
                list.push(Value::String(tag.to_string()));
            }
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.fields.clone()))
    }
}
