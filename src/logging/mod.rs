use tracing_subscriber::EnvFilter;

/// Initialise logging with the given default level.
/// `RUST_LOG` takes precedence when set.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
