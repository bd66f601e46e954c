//! Dummy LLM provider: echoes the latest user turn prefixed with `[echo]`.
//!
//! Runs the whole bot without an API key. Latency and failure can be
//! simulated to exercise the timeout and apology paths.

use std::time::Duration;

use crate::llm::ProviderError;
use crate::session::{Role, Turn};

#[derive(Debug, Clone, Default)]
pub struct DummyProvider {
    latency: Option<Duration>,
    failure: Option<String>,
}

impl DummyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every request with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub async fn complete(&self, turns: &[Turn]) -> Result<String, ProviderError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = &self.failure {
            return Err(ProviderError::Request(message.clone()));
        }
        let last = turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.text.as_str())
            .unwrap_or_default();
        Ok(format!("[echo] {last}"))
    }
}
