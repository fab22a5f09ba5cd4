//! HTTP adapter. Drives the DiagnosisUseCase inbound port.

pub mod dto;
pub mod server;

pub use dto::{ChatRequest, ChatResponse, decode_image_payload};
pub use server::{AppState, build_app, serve};
