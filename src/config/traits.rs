use std::collections::HashMap;

pub trait DecoderConfig: Sized {
    fn from_params(params: &Option<HashMap<String, serde_json::Value>>) -> anyhow::Result<Self>;
    fn validate(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
