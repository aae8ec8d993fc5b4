//! CLI-specific error formatting for user-facing messages.

use crate::error::FolioError;

/// Map a [`FolioError`] to a user-facing help string with actionable guidance.
pub fn format_error_help(err: &FolioError) -> String {
    match err {
        FolioError::Authentication(msg) => {
            format!("Authentication failed: {msg}. Set GEMINI_API_KEY in the environment or .env")
        }
        FolioError::Configuration(msg) => {
            format!("Configuration error: {msg}. Check your config.toml, profile or .env")
        }
        FolioError::Toml(e) => format!("Invalid TOML: {e}"),
        FolioError::RateLimited {
            retry_after_ms: Some(ms),
        } => format!("Rate limited. Try again in {}s", ms.div_ceil(1000)),
        other => format!("{other}"),
    }
}
