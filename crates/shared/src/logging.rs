use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Noisy HTTP internals stay at warn unless RUST_LOG says otherwise
const QUIET_DEPENDENCIES: &str = "hyper=warn,reqwest=warn";

fn filter_or(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{}", level, QUIET_DEPENDENCIES)))
}

/// JSON lines at info, for deployed services
pub fn init_logging() {
    let json = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .json();

    tracing_subscriber::registry()
        .with(filter_or("info"))
        .with(json)
        .init();

    tracing::info!(format = "json", "Submission logging ready");
}

/// Multi-line debug output for local runs
pub fn init_logging_pretty() {
    let pretty = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(filter_or("debug"))
        .with(pretty)
        .init();

    tracing::info!(format = "pretty", "Submission logging ready");
}

/// Captured by the test harness; a second call is a no-op
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or("debug"))
        .with_test_writer()
        .try_init();
}
