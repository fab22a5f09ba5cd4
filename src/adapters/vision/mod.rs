//! Image classification adapter (ViT via Candle).

pub mod labels;
pub mod preprocess;
pub mod vit_classifier;

pub use labels::{labels_from_image_folder, labels_from_model_config};
pub use preprocess::{PixelValues, PreprocessorConfig, decode_rgb};
pub use vit_classifier::{VitClassifier, rank};
