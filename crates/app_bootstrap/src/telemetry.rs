//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::error::BootstrapError;

/// Builds the level filter
///
/// `RUST_LOG` wins when set; otherwise `log_level` is used, and `info` if
/// that does not parse.
pub fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global tracing subscriber
///
/// # Errors
///
/// Returns `BootstrapError::Telemetry` if a global subscriber is already set.
pub fn init_tracing(log_level: &str, format: LogFormat) -> Result<(), BootstrapError> {
    let registry = tracing_subscriber::registry().with(build_filter(log_level));

    let installed = match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
    };

    installed.map_err(|e| BootstrapError::Telemetry(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparseable_level_falls_back() {
        let filter = build_filter("not a [valid filter");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_second_install_is_an_error() {
        let _ = init_tracing("debug", LogFormat::Json);
        let second = init_tracing("debug", LogFormat::Pretty);

        assert!(matches!(second, Err(BootstrapError::Telemetry(_))));
    }
}
