//! Logging setup for binaries embedding the library.

use tracing_subscriber::EnvFilter;

/// Initialize tracing with the `RUST_LOG` filter, defaulting to `info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Initialize logging for tests (captured per test, never panics on re-init).
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
