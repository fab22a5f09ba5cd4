//! Outbound ports. Application calls into model runtimes and remote services.
//!
//! Implemented by adapters.

use crate::domain::{ClassificationResult, DomainError, SeverityTier};

/// Image classification model.
#[async_trait::async_trait]
pub trait ImageClassifierPort: Send + Sync {
    /// Classify raw (encoded) image bytes.
    ///
    /// Returns every label ranked by descending confidence; never empty on success.
    /// Undecodable bytes fail with `DomainError::InvalidImage`.
    async fn classify(&self, image: &[u8]) -> Result<Vec<ClassificationResult>, DomainError>;
}

/// Text classifier that maps free text to a severity tier.
#[async_trait::async_trait]
pub trait TextSeverityPort: Send + Sync {
    /// Returns `None` for empty or whitespace-only text without running the model.
    async fn classify_severity(&self, text: &str) -> Result<Option<SeverityTier>, DomainError>;
}

/// Hosted generative model producing patient-facing text.
#[async_trait::async_trait]
pub trait NarrativePort: Send + Sync {
    /// Generate a narrative for the prompt. Returned text is trimmed and non-empty.
    async fn generate(&self, prompt: &str) -> Result<String, DomainError>;
}
