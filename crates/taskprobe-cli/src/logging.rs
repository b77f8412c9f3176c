//! `tracing` subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise the filter follows `-v`/`-q`. Logs go
//! to stderr so `--format json` reports on stdout stay parseable.

use crate::config::{LogFormat, Verbosity};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter from `RUST_LOG`, falling back to the verbosity default
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbosity: Verbosity, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(env_filter(verbosity));
    let result = match format {
        LogFormat::Compact => registry
            .with(fmt::layer().with_writer(std::io::stderr).compact().with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init(Verbosity::Quiet, LogFormat::Compact);
        init(Verbosity::Debug, LogFormat::Json);
    }
}
