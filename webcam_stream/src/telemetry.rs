use crate::config::LogLevel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter_directive(log_level: &LogLevel) -> String {
    format!("{},ort=info", log_level.as_str())
}

/// Installs the global JSON subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init_subscriber(log_level: &LogLevel) {
    let directive = filter_directive(log_level);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| directive.into()))
        .with(tracing_subscriber::fmt::layer().json().with_level(true))
        .init();
}
