//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities; clone them freely.
//! Providers are stateless: the caller owns the conversation and passes the
//! full ordered history on every call.

pub mod providers;

use thiserror::Error;

use crate::session::Turn;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("missing API key: {0} is not set")]
    MissingApiKey(&'static str),
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("malformed provider response: {0}")]
    Malformed(String),
    #[error("prompt blocked by provider: {0}")]
    Blocked(String),
    #[error("provider returned an empty reply")]
    Empty,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `complete` arm.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    Gemini(providers::gemini::GeminiProvider),
}

impl LlmProvider {
    /// Send the ordered conversation to the provider and return the full
    /// reply text.
    pub async fn complete(&self, turns: &[Turn]) -> Result<String, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(turns).await,
            LlmProvider::Gemini(p) => p.complete(turns).await,
        }
    }

    /// Provider name as written in config.
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::Gemini(_) => "gemini",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            LlmProvider::Dummy(_) => "echo",
            LlmProvider::Gemini(p) => p.model(),
        }
    }
}
