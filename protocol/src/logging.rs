//! # Structured Logging
//!
//! Initializes the `tracing` subscriber with configurable format (JSON or
//! pretty-printed) and environment-based filtering via `RUST_LOG`.
//!
//! Library code only emits events; embedding applications decide where they
//! go. Output is written to stderr so stdout stays free for data.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for local development.
    Pretty,
    /// JSON lines for log aggregation.
    Json,
}

impl LogFormat {
    /// Parse a format string. Accepts "json" or "pretty" (case-insensitive).
    /// Returns `Pretty` for any unrecognized value.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the global tracing subscriber.
///
/// Call this exactly once, early in `main()`. Subsequent calls will panic;
/// use [`try_init_logging`] where several call sites race (tests).
///
/// `RUST_LOG` overrides `default_level` when set, e.g.
/// `RUST_LOG=veil_contracts=debug,veil_protocol=info`.
pub fn init_logging(default_level: &str, format: LogFormat) {
    if !try_init_logging(default_level, format) {
        panic!("global tracing subscriber already installed");
    }
    tracing::info!("logging initialized (format={:?})", format);
}

/// Install the global subscriber unless one is already set.
///
/// Returns `true` if this call installed it.
pub fn try_init_logging(default_level: &str, format: LogFormat) -> bool {
    let filter = env_filter(default_level);
    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init(),
    };
    result.is_ok()
}
