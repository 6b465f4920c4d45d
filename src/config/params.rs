//! Parameter Extraction Module
//!
//! Utilities for extracting typed values from the generic
//! `HashMap<String, serde_json::Value>` parameter maps carried by codec
//! configurations.

use std::collections::HashMap;

/// Extracts a typed parameter from a free-form parameter map.
///
/// Uses Serde deserialisation for type safety with graceful fallback: if
/// the map is missing, the key is absent, or the value cannot be converted
/// to `T`, the default is returned and the error is silently handled.
///
/// # Arguments
///
/// * `params` - Optional parameter map from a codec configuration
/// * `key` - The parameter name to extract
/// * `default` - The value to return if extraction fails
pub fn extract_param<T>(
    params: &Option<HashMap<String, serde_json::Value>>,
    key: &str,
    default: T,
) -> T
where
    T: serde::de::DeserializeOwned + Clone,
{
    params
        .as_ref()
        .and_then(|p| p.get(key))
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_typed_values_with_defaults() {
        let mut params = HashMap::new();
        params.insert("field".to_string(), json!("payload"));
        params.insert("limit".to_string(), json!(100));
        let params = Some(params);

        let field: String = extract_param(&params, "field", "message".to_string());
        assert_eq!(field, "payload");

        let limit: i64 = extract_param(&params, "limit", 10);
        assert_eq!(limit, 100);

        // Missing key falls back to the default.
        let missing: bool = extract_param(&params, "missing", true);
        assert!(missing);

        // Type mismatch falls back to the default.
        let mismatched: String = extract_param(&params, "limit", "default".to_string());
        assert_eq!(mismatched, "default");
    }

    #[test]
    fn absent_map_returns_default() {
        let value: u64 = extract_param(&None, "anything", 7);
        assert_eq!(value, 7);
    }
}
