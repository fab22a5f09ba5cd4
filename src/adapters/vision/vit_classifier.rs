//! ViT image classifier. Implements ImageClassifierPort with Candle.
//!
//! Loads a fine-tuned HuggingFace `ViTForImageClassification` checkpoint.

use super::labels::{labels_from_image_folder, labels_from_model_config};
use super::preprocess::PreprocessorConfig;
use crate::adapters::checkpoint::{self, CONFIG_FILE};
use crate::domain::{ClassificationResult, DomainError};
use crate::ports::ImageClassifierPort;
use candle_core::{D, Device};
use candle_transformers::models::vit;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

struct VitInner {
    model: vit::Model,
    labels: Vec<String>,
    preprocessor: PreprocessorConfig,
    device: Device,
}

/// Image classifier backed by a ViT checkpoint.
///
/// Cheap to clone; the model is shared read-only across requests.
#[derive(Clone)]
pub struct VitClassifier {
    inner: Arc<VitInner>,
}

impl VitClassifier {
    /// Load the checkpoint in `model_dir`.
    ///
    /// Labels come from `labels_dir` (sorted class folders) when given, else from
    /// `id2label` in `config.json`.
    pub fn load(model_dir: &Path, labels_dir: Option<&Path>) -> Result<Self, DomainError> {
        let device = Device::Cpu;

        let config_json = checkpoint::read_json(&checkpoint::require_file(model_dir, CONFIG_FILE)?)?;
        let config: vit::Config = serde_json::from_value(config_json.clone()).map_err(|e| {
            DomainError::ConfigurationLoadFailed(format!("parse ViT config: {}", e))
        })?;

        let labels = match labels_dir {
            Some(dir) => labels_from_image_folder(dir)?,
            None => labels_from_model_config(&config_json)?,
        };

        let preprocessor = PreprocessorConfig::load(model_dir)?;
        let vb = checkpoint::weights(model_dir, &device)?;
        let model = vit::Model::new(&config, labels.len(), vb).map_err(|e| {
            DomainError::ConfigurationLoadFailed(format!(
                "build ViT with {} labels: {}",
                labels.len(),
                e
            ))
        })?;

        info!(
            path = %model_dir.display(),
            labels = labels.len(),
            image_size = config.image_size,
            "ViT image classifier loaded"
        );

        Ok(Self {
            inner: Arc::new(VitInner {
                model,
                labels,
                preprocessor,
                device,
            }),
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.inner.labels
    }
}

impl VitInner {
    fn infer(&self, image: &[u8]) -> Result<Vec<ClassificationResult>, DomainError> {
        let pixels = self
            .preprocessor
            .to_tensor(image, &self.device)?
            .unsqueeze(0)
            .map_err(classification_error)?;

        let probs = self
            .model
            .forward(&pixels)
            .and_then(|logits| candle_nn::ops::softmax(&logits, D::Minus1))
            .and_then(|p| p.squeeze(0))
            .and_then(|p| p.to_vec1::<f32>())
            .map_err(classification_error)?;

        rank(&self.labels, &probs)
    }
}

fn classification_error(e: candle_core::Error) -> DomainError {
    DomainError::Classification(e.to_string())
}

/// Pair labels with probabilities and sort by descending confidence.
///
/// The sort is stable, so equal confidences keep label-index order.
pub fn rank(labels: &[String], probs: &[f32]) -> Result<Vec<ClassificationResult>, DomainError> {
    if labels.len() != probs.len() || probs.is_empty() {
        return Err(DomainError::Classification(format!(
            "model produced {} scores for {} labels",
            probs.len(),
            labels.len()
        )));
    }
    let mut ranked: Vec<ClassificationResult> = labels
        .iter()
        .zip(probs)
        .map(|(label, p)| ClassificationResult::new(label.clone(), *p))
        .collect();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    Ok(ranked)
}

#[async_trait::async_trait]
impl ImageClassifierPort for VitClassifier {
    async fn classify(&self, image: &[u8]) -> Result<Vec<ClassificationResult>, DomainError> {
        let inner = Arc::clone(&self.inner);
        let bytes = image.to_vec();
        let ranked = tokio::task::spawn_blocking(move || inner.infer(&bytes))
            .await
            .map_err(|e| DomainError::Classification(format!("inference task failed: {}", e)))??;

        if let Some(top) = ranked.first() {
            debug!(label = %top.label, confidence = top.confidence, "image classified");
        }
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rank_orders_descending() {
        let ranked = rank(
            &labels(&["acne", "chickenpox", "ringworm", "shingles"]),
            &[0.02, 0.9421, 0.03, 0.0079],
        )
        .unwrap();

        assert_eq!(ranked[0].label, "chickenpox");
        assert!(
            ranked
                .iter()
                .skip(1)
                .all(|r| ranked[0].confidence >= r.confidence)
        );
        assert!(ranked.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert_eq!(ranked.len(), 4);
    }

    #[test]
    fn test_rank_ties_keep_label_order() {
        let ranked = rank(&labels(&["b", "a", "c"]), &[0.4, 0.4, 0.2]).unwrap();
        assert_eq!(ranked[0].label, "b");
        assert_eq!(ranked[1].label, "a");
    }

    #[test]
    fn test_rank_rejects_mismatched_vocabulary() {
        assert!(rank(&labels(&["a", "b"]), &[1.0]).is_err());
        assert!(rank(&[], &[]).is_err());
    }

    #[test]
    fn test_load_missing_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = VitClassifier::load(dir.path(), None).err().unwrap();
        assert!(matches!(err, DomainError::ConfigurationLoadFailed(_)));
    }
}
