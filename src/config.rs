//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the file named by `GEMINI_BOT_CONFIG`), then applies the
//! `GEMINI_BOT_LOG_LEVEL` override. Secrets are never read from TOML:
//! `TELEGRAM_BOT_TOKEN` and `GEMINI_API_KEY` come from the environment only.

use std::{
    collections::HashSet,
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;
use crate::logger;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Gemini provider configuration (`[llm.gemini]`).
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL of the models collection; the model name and action are appended.
    pub api_base_url: String,
    pub model: String,
}

/// LLM configuration (`[llm]`).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Active provider: `"gemini"` or `"dummy"`.
    pub provider: String,
    /// Upper bound on a single generation call, in seconds.
    pub timeout_seconds: u64,
    pub gemini: GeminiConfig,
}

/// Fully-resolved bot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub log_level: String,
    pub llm: LlmConfig,
    /// Longest message the transport accepts, in characters.
    pub max_message_length: usize,
    /// Maximum number of turns kept per chat.
    pub history_cap: usize,
    /// Lower-cased restricted words, in config order.
    pub restricted_words: Vec<String>,
    pub admin_ids: HashSet<u64>,
    /// From `TELEGRAM_BOT_TOKEN`.
    pub telegram_token: Option<String>,
    /// From `GEMINI_API_KEY`.
    pub gemini_api_key: Option<String>,
}

impl Config {
    /// Telegram token, or a config error naming the missing variable.
    pub fn require_telegram_token(&self) -> Result<&str, AppError> {
        self.telegram_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Config("TELEGRAM_BOT_TOKEN is not set".into()))
    }
}

// ── Raw TOML shape ──────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    bot: RawBot,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    telegram: RawTelegram,
    #[serde(default)]
    session: RawSession,
    #[serde(default)]
    moderation: RawModeration,
    #[serde(default)]
    admin: RawAdmin,
}

#[derive(Deserialize)]
struct RawBot {
    #[serde(default = "default_bot_name")]
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawBot {
    fn default() -> Self {
        Self { name: default_bot_name(), log_level: default_log_level() }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default)]
    gemini: RawGemini,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            timeout_seconds: default_timeout_seconds(),
            gemini: RawGemini::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawGemini {
    #[serde(default = "default_gemini_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_gemini_model")]
    model: String,
}

impl Default for RawGemini {
    fn default() -> Self {
        Self { api_base_url: default_gemini_api_base_url(), model: default_gemini_model() }
    }
}

#[derive(Deserialize)]
struct RawTelegram {
    #[serde(default = "default_max_message_length")]
    max_message_length: usize,
}

impl Default for RawTelegram {
    fn default() -> Self {
        Self { max_message_length: default_max_message_length() }
    }
}

#[derive(Deserialize)]
struct RawSession {
    #[serde(default = "default_history_cap")]
    history_cap: usize,
}

impl Default for RawSession {
    fn default() -> Self {
        Self { history_cap: default_history_cap() }
    }
}

#[derive(Deserialize)]
struct RawModeration {
    #[serde(default = "default_restricted_words")]
    restricted_words: Vec<String>,
}

impl Default for RawModeration {
    fn default() -> Self {
        Self { restricted_words: default_restricted_words() }
    }
}

#[derive(Deserialize, Default)]
struct RawAdmin {
    #[serde(default)]
    user_ids: Vec<u64>,
}

fn default_bot_name() -> String { "Gemini BOT".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_llm_provider() -> String { "gemini".to_string() }
fn default_timeout_seconds() -> u64 { 10 }
fn default_gemini_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}
fn default_gemini_model() -> String { "gemini-1.5-flash".to_string() }
fn default_max_message_length() -> usize { 4000 }
fn default_history_cap() -> usize { 0 }
fn default_restricted_words() -> Vec<String> {
    vec!["spam".to_string(), "scam".to_string(), "hate".to_string()]
}

// ── Loading ─────────────────────────────────────────────────────────────────

/// Load the config file, then apply env-var overrides and secrets.
pub fn load() -> Result<Config, AppError> {
    let path = env::var("GEMINI_BOT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let log_level_override = env::var("GEMINI_BOT_LOG_LEVEL").ok();

    let mut config = load_from(&path, log_level_override.as_deref())?;
    config.telegram_token = env::var("TELEGRAM_BOT_TOKEN").ok();
    config.gemini_api_key = env::var("GEMINI_API_KEY").ok();
    Ok(config)
}

/// Internal loader. Accepts an explicit path and optional override.
/// Tests pass overrides directly instead of mutating env vars; secrets are
/// left unset.
pub fn load_from(path: &Path, log_level_override: Option<&str>) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, log_level_override)
}

fn resolve(parsed: RawConfig, log_level_override: Option<&str>) -> Result<Config, AppError> {
    let log_level = log_level_override.unwrap_or(&parsed.bot.log_level).trim().to_string();
    logger::parse_level(&log_level).map_err(|e| AppError::Config(e.to_string()))?;

    if parsed.llm.timeout_seconds == 0 {
        return Err(AppError::Config("llm.timeout_seconds must be greater than 0".into()));
    }
    if parsed.telegram.max_message_length == 0 {
        return Err(AppError::Config("telegram.max_message_length must be greater than 0".into()));
    }
    if parsed.session.history_cap == 1 {
        return Err(AppError::Config(
            "session.history_cap must be 0 (unlimited) or at least 2".into(),
        ));
    }

    let restricted_words = parsed
        .moderation
        .restricted_words
        .into_iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();

    Ok(Config {
        bot_name: parsed.bot.name,
        log_level,
        llm: LlmConfig {
            provider: parsed.llm.provider,
            timeout_seconds: parsed.llm.timeout_seconds,
            gemini: GeminiConfig {
                api_base_url: parsed.llm.gemini.api_base_url,
                model: parsed.llm.gemini.model,
            },
        },
        max_message_length: parsed.telegram.max_message_length,
        history_cap: parsed.session.history_cap,
        restricted_words,
        admin_ids: parsed.admin.user_ids.into_iter().collect(),
        telegram_token: None,
        gemini_api_key: None,
    })
}

impl Config {
    /// Safe `Config` for tests: dummy LLM, no secrets, no external calls.
    pub fn test_default() -> Self {
        Self {
            bot_name: "test".into(),
            log_level: default_log_level(),
            llm: LlmConfig {
                provider: "dummy".into(),
                timeout_seconds: default_timeout_seconds(),
                gemini: GeminiConfig {
                    api_base_url: "http://localhost:0/v1beta/models".into(),
                    model: "test-model".into(),
                },
            },
            max_message_length: default_max_message_length(),
            history_cap: default_history_cap(),
            restricted_words: default_restricted_words(),
            admin_ids: HashSet::new(),
            telegram_token: None,
            gemini_api_key: None,
        }
    }
}
