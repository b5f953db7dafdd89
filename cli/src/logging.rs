//! Diagnostic logging to stderr.
//!
//! The level comes from `CALTRACK_LOG` (e.g. `CALTRACK_LOG=debug`) and
//! defaults to `warn`, so normal output on stdout stays clean.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "CALTRACK_LOG";
const DEFAULT_LEVEL: &str = "warn";

pub fn init() {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
