//! Domain entities. Pure data structures for the core business.
//!
//! No model-runtime or HTTP types here; adapters map into these.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Clinical severity tier attached to a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SeverityTier {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl SeverityTier {
    /// Parse a tier name from tabular or configuration data.
    ///
    /// Case-insensitive and whitespace tolerant. Anything unrecognized is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text-classifier class index -> tier, as a sorted label encoder assigns them.
pub const DEFAULT_LABEL_MAP: [SeverityTier; 3] =
    [SeverityTier::High, SeverityTier::Low, SeverityTier::Medium];

/// One (label, confidence) pair from the image classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    /// Softmax probability in [0, 1].
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Confidence as a percentage rounded to 2 decimal places (0.9421 -> 94.21).
    pub fn confidence_percent(&self) -> f64 {
        (f64::from(self.confidence) * 100.0 * 100.0).round() / 100.0
    }
}

/// Condition name and its tier, as stored in the severity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityEntry {
    /// Lowercased and trimmed.
    pub condition: String,
    pub tier: SeverityTier,
}

impl SeverityEntry {
    pub fn new(condition: &str, tier: SeverityTier) -> Self {
        Self {
            condition: normalize_condition(condition),
            tier,
        }
    }
}

/// Normalize a condition name for table keys and lookups.
pub fn normalize_condition(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// One incoming triage request. Built per call by the inbound adapter.
#[derive(Debug, Clone, Default)]
pub struct DiagnosisRequest {
    pub image: Option<Vec<u8>>,
    pub message: Option<String>,
}

impl DiagnosisRequest {
    pub fn new(image: Option<Vec<u8>>, message: Option<String>) -> Self {
        Self { image, message }
    }

    /// Image bytes, if present and non-empty.
    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref().filter(|bytes| !bytes.is_empty())
    }

    /// User message, if present and not whitespace-only.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }

    pub fn has_image(&self) -> bool {
        self.image().is_some()
    }

    pub fn has_message(&self) -> bool {
        self.message().is_some()
    }
}

/// Assembled result of one triage request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisResponse {
    pub disease: Option<String>,
    /// Percentage, 2 decimals.
    pub confidence: Option<f64>,
    pub severity: SeverityTier,
    pub narrative: String,
}
