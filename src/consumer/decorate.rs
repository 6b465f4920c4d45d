use crate::config::DecorateConfig;
use crate::core::event::Event;
use serde_json::Value;

/// Stamps pipeline metadata onto every forwarded event.
///
/// Pure and infallible. Configured fields are only added when absent, so
/// decoded data and message attributes take precedence; tags are appended
/// to the event's `tags` array.
pub struct Decorator {
    add_fields: Vec<(String, String)>,
    tags: Vec<String>,
}

impl Decorator {
    pub fn new(config: &DecorateConfig) -> Self {
        Self {
            add_fields: config
                .add_fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            tags: config.tags.clone(),
        }
    }

    pub fn decorate(&self, event: &mut Event) {
        for (key, value) in &self.add_fields {
            if !event.contains(key) {
                event.set(key, Value::String(value.clone()));
            }
        }

        for tag in &self.tags {
            event.append_tag(tag);
        }
    }
}
