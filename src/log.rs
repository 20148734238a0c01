use std::env;
use std::sync::Once;

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CHESS_LOG";
const DEFAULT_DIRECTIVE: &str = "error";

static INIT: Once = Once::new();

/// Build the filter from `CHESS_LOG`, falling back to errors only.
///
/// Accepts the same short level names the extension always honoured
/// (`err`, `warning`) in addition to full `tracing` directives.
fn filter_from_env(raw: Option<String>) -> EnvFilter {
    let directive = match raw.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_DIRECTIVE.to_string(),
        Some(s) => match s.to_lowercase().as_str() {
            "err" => "error".to_string(),
            "warning" => "warn".to_string(),
            other => other.to_string(),
        },
    };

    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install a stderr subscriber once per process.
///
/// The host process may already own a global subscriber; in that case ours
/// is silently not installed.
pub fn init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter_from_env(env::var(LOG_ENV).ok()))
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
