//! Tracing subscriber setup for the binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter directives.
#[must_use]
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "qbr=debug,info"
    } else {
        "qbr=info,warn"
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the defaults.
pub fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
