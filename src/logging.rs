//! Tracing bootstrap for host binaries and tests.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Configure tracing subscribers so logs include spans by default.
///
/// Respects `RUST_LOG`; defaults to `info` otherwise. Calling it twice is
/// harmless (later calls are ignored), so tests can invoke it freely. Host
/// applications that install their own subscriber should skip this.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
