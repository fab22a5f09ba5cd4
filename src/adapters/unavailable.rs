//! Stand-in for a model that failed to load at startup.
//!
//! The service keeps running; every call through this adapter fails.

use crate::domain::{ClassificationResult, DomainError, SeverityTier};
use crate::ports::{ImageClassifierPort, TextSeverityPort};

pub struct UnavailableModel {
    name: &'static str,
    reason: String,
}

impl UnavailableModel {
    pub fn new(name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            name,
            reason: reason.into(),
        }
    }

    fn error(&self) -> DomainError {
        DomainError::ModelUnavailable(format!("{} failed to load: {}", self.name, self.reason))
    }
}

#[async_trait::async_trait]
impl ImageClassifierPort for UnavailableModel {
    async fn classify(&self, _image: &[u8]) -> Result<Vec<ClassificationResult>, DomainError> {
        Err(self.error())
    }
}

#[async_trait::async_trait]
impl TextSeverityPort for UnavailableModel {
    async fn classify_severity(&self, text: &str) -> Result<Option<SeverityTier>, DomainError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        Err(self.error())
    }
}
