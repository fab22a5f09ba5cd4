//! Inbound port. The HTTP adapter calls into the application.

use crate::domain::{DiagnosisRequest, DiagnosisResponse, DomainError};

/// Runs the triage pipeline for one request.
#[async_trait::async_trait]
pub trait DiagnosisUseCase: Send + Sync {
    async fn diagnose(&self, request: DiagnosisRequest) -> Result<DiagnosisResponse, DomainError>;

    /// Name of the configured severity strategy.
    fn severity_strategy(&self) -> &'static str;
}
