//! Logging setup.
//!
//! Filtering follows `RUST_LOG` (default `info`). Output is either
//! human-readable or one JSON object per line.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Call once, from `main`.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
