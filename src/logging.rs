//! Tracing setup for the `aitess` binary.

use std::sync::OnceLock;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "AITESS_LOG";

static INIT: OnceLock<()> = OnceLock::new();

/// Install the stderr subscriber once; later calls are no-ops.
pub fn init(component: &str) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        // Fails only when a subscriber is already installed.
        let _ = SubscriberBuilder::default()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_ansi(true)
            .compact()
            .try_init();
    });
    tracing::debug!(component, "tracing initialised");
}
