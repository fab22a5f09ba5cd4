//! Wire types for `POST /chat` and `GET /health`.

use crate::domain::{DiagnosisRequest, DiagnosisResponse, DomainError, SeverityTier};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    /// Base64 image, optionally prefixed with a data-URI header.
    #[serde(default)]
    pub image: Option<String>,
}

impl ChatRequest {
    /// Decode the payload into a domain request. Bad base64 is `InvalidImage`.
    pub fn into_domain(self) -> Result<DiagnosisRequest, DomainError> {
        let image = match self.image.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(decode_image_payload(raw)?),
            _ => None,
        };
        Ok(DiagnosisRequest::new(image, self.message))
    }
}

/// Strip an optional `data:<mime>;base64,` header and decode the rest.
pub fn decode_image_payload(raw: &str) -> Result<Vec<u8>, DomainError> {
    let encoded = match raw.split_once(',') {
        Some((_, data)) => data,
        None => raw,
    };
    BASE64_STANDARD
        .decode(encoded.trim())
        .map_err(|e| DomainError::InvalidImage(format!("base64 decode: {}", e)))
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub disease: Option<String>,
    pub confidence: Option<f64>,
    pub severity: SeverityTier,
    pub info: String,
}

impl From<DiagnosisResponse> for ChatResponse {
    fn from(r: DiagnosisResponse) -> Self {
        Self {
            disease: r.disease,
            confidence: r.confidence,
            severity: r.severity,
            info: r.narrative,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub severity_strategy: String,
    pub severity_entries: usize,
}
