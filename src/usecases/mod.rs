//! Application use cases. Orchestrate domain logic via ports.

pub mod diagnosis_service;
pub mod prompt;
pub mod severity_resolver;

pub use diagnosis_service::DiagnosisService;
pub use prompt::compose_prompt;
pub use severity_resolver::{TableLookupResolver, TextModelResolver};
