//! Structured logging for da-core.
//!
//! - stdout is reserved for command payloads (JSON or summary output)
//! - stderr receives all log output, human-readable or JSON lines
//! - each HTTP request runs inside a span carrying a short request id
//!
//! ```ignore
//! use da_core::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from_env(None, None));
//! let request_id = da_core::logging::generate_request_id();
//! let _guard = da_core::logging::request_span(&request_id, "GET", "/devices").entered();
//! tracing::info!("listing devices");
//! ```

pub mod config;

pub use config::{LogConfig, LogFormat, LogLevel};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` directives, when valid, replace the level filter entirely.
/// Returns `false` if a subscriber was already installed.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("da_core={},da_common={}", config.level, config.level))
    });

    match config.format {
        LogFormat::Human => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
                    .is_ok()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
                    .is_ok()
            }
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .flatten_event(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init()
                .is_ok()
        }
    }
}

/// Short correlation id for one HTTP request.
pub fn generate_request_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("req-{}", &uuid.simple().to_string()[..12])
}

/// Span wrapping the handling of one request.
pub fn request_span(request_id: &str, method: &str, path: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path
    )
}

/// Shorten a long value (raw device output) for a log field.
pub fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &s[..end])
}
