//! Narrative generator adapters. Implement NarrativePort for hosted LLMs.
//!
//! Provides Gemini and OpenAI-compatible adapters and a mock adapter for offline use.

pub mod gemini_adapter;
pub mod mock_adapter;
pub mod openai_adapter;

pub use gemini_adapter::GeminiAdapter;
pub use mock_adapter::MockNarrativeAdapter;
pub use openai_adapter::OpenAiAdapter;
