//! Stderr output for the engine's `log` records through `tracing-subscriber`.

use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count: warnings by default, one level per `-v`.
pub fn directive_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Without `-v`, `RUST_LOG` may pick the filter.
fn filter_for(verbosity: u8) -> EnvFilter {
    if verbosity == 0 {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    EnvFilter::new(directive_for(verbosity))
}

/// Install the subscriber and the `log` bridge. Later calls are no-ops.
pub fn init(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .without_time()
        .try_init();
}
