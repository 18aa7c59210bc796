//! Tracing setup for binaries and tests.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,stockflow=debug,sqlx=warn";

/// Initializes the global tracing subscriber.
///
/// Honors `RUST_LOG`; falls back to [`DEFAULT_FILTER`]. Calling it more
/// than once is harmless.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
