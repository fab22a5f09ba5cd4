//! Severity resolution port. One capability, selected per deployment by configuration.

use crate::domain::{DomainError, SeverityTier};

/// Which request modalities a resolver needs before the pipeline may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPolicy {
    /// An image must be present.
    ImageRequired,
    /// At least one of image or message must be present.
    AnyModality,
}

/// Inputs available to a resolver once the image stage has run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeverityContext<'a> {
    /// Top label from the image classifier, if an image was supplied.
    pub disease: Option<&'a str>,
    /// User message, if non-blank.
    pub message: Option<&'a str>,
}

#[async_trait::async_trait]
pub trait SeverityResolver: Send + Sync {
    /// Short strategy name for logs and health output.
    fn name(&self) -> &'static str;

    fn input_policy(&self) -> InputPolicy;

    async fn resolve(&self, ctx: SeverityContext<'_>) -> Result<SeverityTier, DomainError>;
}
