//! Port traits. API boundaries for the hexagon.
//!
//! - Inbound: Called by the HTTP adapter into the application
//! - Outbound: Called by the application into model runtimes and remote services

pub mod inbound;
pub mod outbound;
pub mod severity;

pub use inbound::DiagnosisUseCase;
pub use outbound::{ImageClassifierPort, NarrativePort, TextSeverityPort};
pub use severity::{InputPolicy, SeverityContext, SeverityResolver};
