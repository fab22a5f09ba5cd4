//! Infrastructure adapters. Implement outbound ports.
//!
//! Model runtimes (ViT, BERT), hosted LLMs, the severity CSV, and the HTTP
//! surface. Map errors to DomainError.

pub mod checkpoint;
pub mod http;
pub mod llm;
pub mod severity;
pub mod text;
pub mod unavailable;
pub mod vision;
