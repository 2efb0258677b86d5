//! Process-wide tracing subscriber, installed once.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Install the fmt subscriber. `RUST_LOG` overrides the default `info` filter.
///
/// Logs go to stderr so JSONL written to stdout stays clean.
pub fn init_logger(json: bool) {
    LOGGER_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        if json {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        } else {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_line_number(true)
                .with_writer(std::io::stderr)
                .init();
        }

        tracing::debug!(json, "logger initialized");
    });
}
