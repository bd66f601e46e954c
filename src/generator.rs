//! Response generation under a fixed time budget.
//!
//! The provider call is raced against a deadline with
//! [`tokio::time::timeout`]. On expiry the in-flight request future is
//! dropped (the HTTP request is abandoned) and the caller gets
//! [`GenerationError::Timeout`] straight away. There is no retry: the user
//! resends if they want another attempt.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, warn};

use crate::llm::{LlmProvider, ProviderError};
use crate::session::Turn;

pub const TIMEOUT_MESSAGE: &str = "⌛ The AI took too long to respond. Please try again.";
pub const APOLOGY_MESSAGE: &str = "⚠️ Sorry, I encountered an error. Please try again later.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Backend(#[from] ProviderError),
}

impl GenerationError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::Timeout(_) => TIMEOUT_MESSAGE,
            GenerationError::Backend(_) => APOLOGY_MESSAGE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseGenerator {
    provider: LlmProvider,
    timeout: Duration,
}

impl ResponseGenerator {
    pub fn new(provider: LlmProvider, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Generate a reply for the full ordered history.
    ///
    /// Failures are logged here with their cause; callers only need
    /// [`GenerationError::user_message`].
    pub async fn generate(&self, history: &[Turn]) -> Result<String, GenerationError> {
        match tokio::time::timeout(self.timeout, self.provider.complete(history)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                error!(provider = self.provider.name(), error = %e, "generation failed");
                Err(GenerationError::Backend(e))
            }
            Err(_) => {
                warn!(
                    provider = self.provider.name(),
                    timeout_secs = self.timeout.as_secs_f32(),
                    "generation timed out"
                );
                Err(GenerationError::Timeout(self.timeout))
            }
        }
    }

    /// Generate a reply for a single prompt with no history.
    pub async fn generate_prompt(&self, prompt: &str) -> Result<String, GenerationError> {
        self.generate(&[Turn::user(prompt)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::dummy::DummyProvider;

    fn generator(provider: DummyProvider, secs: u64) -> ResponseGenerator {
        ResponseGenerator::new(LlmProvider::Dummy(provider), Duration::from_secs(secs))
    }

    #[tokio::test]
    async fn success_returns_text() {
        let g = generator(DummyProvider::new(), 10);
        assert_eq!(g.generate(&[Turn::user("hello")]).await.unwrap(), "[echo] hello");
        assert_eq!(g.generate_prompt("ping").await.unwrap(), "[echo] ping");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let g = generator(DummyProvider::new().with_latency(Duration::from_secs(60)), 10);
        let started = tokio::time::Instant::now();
        let err = g.generate(&[Turn::user("hello")]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Timeout(d) if d == Duration::from_secs(10)));
        assert_eq!(err.user_message(), TIMEOUT_MESSAGE);
        // Returned at the deadline, not when the backend would have answered.
        assert!(started.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test]
    async fn backend_failure_is_apology() {
        let g = generator(DummyProvider::new().failing("401 unauthorized"), 10);
        let err = g.generate(&[Turn::user("hello")]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Backend(_)));
        assert_eq!(err.user_message(), APOLOGY_MESSAGE);
    }
}
