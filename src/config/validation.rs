use super::types::Config;

pub fn validate_config(config: &Config) -> Result<(), String> {
    if config.pubsub.topic.is_empty() {
        return Err("No pub/sub topic defined".into());
    }

    if config.pubsub.subscription.is_empty() {
        return Err("No pub/sub subscription defined".into());
    }

    if config.consumer.batch_size == 0 {
        return Err("batch_size must be at least 1".into());
    }

    if config.consumer.backoff_initial_ms > config.consumer.backoff_max_ms {
        return Err("backoff_initial_ms must not exceed backoff_max_ms".into());
    }

    if config.sink.capacity == 0 {
        return Err("Sink capacity must be at least 1".into());
    }

    if !crate::codec::list_codecs().contains(&config.codec.r#type.as_str()) {
        return Err(format!("Unknown codec type: {}", config.codec.r#type));
    }

    if config.simulator.enabled && config.simulator.interval_ms == 0 {
        return Err("Simulator interval_ms must be at least 1".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::load_config_from_string;

    #[test]
    fn missing_topic_is_rejected() {
        let config = load_config_from_string("[pubsub]\nsubscription = \"sub\"").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = load_config_from_string(
            "[pubsub]\ntopic = \"events\"\n[consumer]\nbatch_size = 0",
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn unknown_codec_is_rejected() {
        let config = load_config_from_string(
            "[pubsub]\ntopic = \"events\"\n[codec]\ntype = \"msgpack\"",
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn valid_config_passes() {
        let config = load_config_from_string("[pubsub]\ntopic = \"events\"").unwrap();
        assert!(validate_config(&config).is_ok());
    }
}
