//! Offline fine-tuning drivers for the image and text classifiers.
//!
//! Shares the serving path's checkpoint layout, preprocessing, and tokenizer
//! setup so trained output loads directly into the service.

pub mod bert;
pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod schedule;
pub mod trainer;
pub mod vit;

pub use config::{HyperParams, TrainingConfig};
