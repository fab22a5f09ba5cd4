//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod severity_table;

pub use entities::{
    ClassificationResult, DEFAULT_LABEL_MAP, DiagnosisRequest, DiagnosisResponse, SeverityEntry,
    SeverityTier, normalize_condition,
};
pub use errors::DomainError;
pub use severity_table::SeverityTable;
