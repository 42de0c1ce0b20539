use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber. `RUST_LOG` controls the filter;
/// defaults to `info` for our crates and `warn` elsewhere.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,server=info,sqlx=warn,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
