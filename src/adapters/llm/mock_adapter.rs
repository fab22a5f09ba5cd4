//! Mock narrative adapter for running without an API key.
//!
//! Returns a canned narrative for development and testing purposes.

use crate::domain::DomainError;
use crate::ports::NarrativePort;
use std::time::Duration;
use tracing::info;

/// Mock narrative adapter.
///
/// Returns a predetermined response without making API calls.
/// Simulates network latency with configurable delay.
pub struct MockNarrativeAdapter {
    /// Simulated network delay in milliseconds.
    delay_ms: u64,
}

impl MockNarrativeAdapter {
    /// Create a new mock adapter with default delay (100ms).
    pub fn new() -> Self {
        Self { delay_ms: 100 }
    }

    /// Create a mock adapter with custom delay.
    pub fn with_delay(delay_ms: u64) -> Self {
        Self { delay_ms }
    }
}

impl Default for MockNarrativeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NarrativePort for MockNarrativeAdapter {
    async fn generate(&self, prompt: &str) -> Result<String, DomainError> {
        info!(prompt_len = prompt.len(), "[MOCK] Simulating narrative generation");

        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;

        Ok(format!(
            "[MOCK] A generated explanation would appear here, covering what the condition is, \
             why it has its severity rating, common causes, remedies with generic medicine \
             names, and when to see a doctor. Configure TRIAGE_LLM_API_KEY to enable the hosted \
             model. (prompt: {} lines)",
            prompt.lines().count()
        ))
    }
}
