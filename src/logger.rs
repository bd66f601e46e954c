//! Structured logging for the bot.
//!
//! Events go to stderr through `tracing-subscriber`. The level comes from
//! `[bot] log_level` or `GEMINI_BOT_LOG_LEVEL`; an operator can still
//! narrow things per module with `RUST_LOG` (e.g. `gemini_bot=debug,teloxide=warn`).

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Install the global subscriber. Must run once, after config is loaded.
///
/// A valid `RUST_LOG` overrides `level`.
pub fn init(level: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| AppError::Logger(format!("bad log filter '{level}': {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("subscriber already installed: {e}")))?;

    Ok(())
}

/// Check a configured level name (`off`, `error` … `trace`, any case).
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    let level = level.trim();
    if level.is_empty() {
        return Err(AppError::Logger("log_level is empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("log_level '{level}' is not a level name")))
}
