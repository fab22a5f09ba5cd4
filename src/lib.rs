//! derm-triage: skin and scalp image triage with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod training;
pub mod usecases;
