//! Logging setup: `tracing` events formatted to stderr.

use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber
///
/// `level` is the default directive (e.g. `info`, `spectraplane=debug`);
/// `RUST_LOG` takes precedence when set. Calling this twice is harmless.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // Already initialised (tests, embedding apps)
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init("debug");
        init("not a directive ===");
        tracing::info!("logging initialised");
    }
}
