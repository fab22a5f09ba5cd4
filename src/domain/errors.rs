//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    #[error("Please upload an image for diagnosis.")]
    MissingImage,

    #[error("No valid input provided.")]
    MissingInput,

    #[error("Classification failed: {0}")]
    Classification(String),

    /// The adapter's model failed to load at startup; every call fails until restart.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Severity resolution failed: {0}")]
    SeverityResolution(String),

    #[error("Narrative generation failed: {0}")]
    NarrativeGenerationFailed(String),

    #[error("Configuration load failed: {0}")]
    ConfigurationLoadFailed(String),
}

impl DomainError {
    /// True for faults in the caller's input (surfaced as 400-class responses).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidImage(_) | Self::MissingImage | Self::MissingInput
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(DomainError::MissingImage.is_client_error());
        assert!(DomainError::MissingInput.is_client_error());
        assert!(DomainError::InvalidImage("truncated".into()).is_client_error());
        assert!(!DomainError::NarrativeGenerationFailed("quota".into()).is_client_error());
        assert!(!DomainError::ModelUnavailable("vit".into()).is_client_error());
        assert!(!DomainError::Classification("shape".into()).is_client_error());
    }
}
