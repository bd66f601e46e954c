//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory, called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod gemini;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct a `LlmProvider` from config and an optional API key.
///
/// `api_key` is sourced from `GEMINI_API_KEY` env (never TOML); it is
/// required for `gemini` and ignored by `dummy`.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider::new())),
        "gemini" => {
            let api_key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or(ProviderError::MissingApiKey("GEMINI_API_KEY"))?;
            let g = &config.gemini;
            let p = gemini::GeminiProvider::new(g.api_base_url.clone(), g.model.clone(), api_key)?;
            Ok(LlmProvider::Gemini(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn dummy_needs_no_key() {
        let config = Config::test_default();
        let provider = build(&config.llm, None).unwrap();
        assert_eq!(provider.name(), "dummy");
    }

    #[test]
    fn gemini_requires_key() {
        let mut config = Config::test_default();
        config.llm.provider = "gemini".into();
        let err = build(&config.llm, None).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
        assert!(build(&config.llm, Some("  ".into())).is_err());

        let provider = build(&config.llm, Some("key".into())).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), "test-model");
    }

    #[test]
    fn unknown_provider_errors() {
        let mut config = Config::test_default();
        config.llm.provider = "gpt".into();
        assert!(matches!(build(&config.llm, None), Err(ProviderError::UnknownProvider(p)) if p == "gpt"));
    }
}
