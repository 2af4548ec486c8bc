//! Subscriber setup for hosts that do not install their own.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Install a fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call (or a subscriber the host
/// installed earlier) takes effect. Returns whether this call installed it.
pub fn init() -> bool {
    init_with_default(DEFAULT_FILTER)
}

/// Like [`init`] with a custom fallback filter, e.g. `"kiln_engine=debug"`.
pub fn init_with_default(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
