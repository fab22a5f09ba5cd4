//! Cross-cutting configuration shared by the server and training binaries.

pub mod config;
pub mod logging;
