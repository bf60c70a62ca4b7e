use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global JSON subscriber.
/// Level is controlled by `RUST_LOG`. Events from the `log` crate (actix's
/// access logger) are forwarded into tracing.
pub fn init_telemetry() {
    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(formatting_layer)
        .init();
}

/// Like `init_telemetry`, but tolerates a subscriber already being set.
/// Output goes through the test harness's capture.
pub fn try_init_telemetry() {
    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .json();

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(formatting_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_does_not_panic() {
        try_init_telemetry();
        try_init_telemetry();
        tracing::info!("telemetry ready");
    }
}
