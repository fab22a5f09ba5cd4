//! Text severity classifier. Implements TextSeverityPort with a fine-tuned BERT.

use super::bert_model::BertSequenceClassifier;
use crate::adapters::checkpoint::{self, CONFIG_FILE, TOKENIZER_FILE};
use crate::domain::{DomainError, SeverityTier};
use crate::ports::TextSeverityPort;
use candle_core::{Device, Tensor};
use candle_transformers::models::bert;
use std::path::Path;
use std::sync::Arc;
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};
use tracing::{debug, info};

struct BertInner {
    model: BertSequenceClassifier,
    tokenizer: Tokenizer,
    label_map: Vec<SeverityTier>,
    device: Device,
}

/// BERT-backed severity classifier. Cheap to clone.
#[derive(Clone)]
pub struct BertSeverityClassifier {
    inner: Arc<BertInner>,
}

impl BertSeverityClassifier {
    /// Load the checkpoint in `model_dir`.
    ///
    /// `label_map[i]` is the tier for class index `i`; its length sets the head size.
    pub fn load(
        model_dir: &Path,
        label_map: Vec<SeverityTier>,
        max_length: usize,
    ) -> Result<Self, DomainError> {
        let device = Device::Cpu;

        let config_json = checkpoint::read_json(&checkpoint::require_file(model_dir, CONFIG_FILE)?)?;
        let config: bert::Config = serde_json::from_value(config_json).map_err(|e| {
            DomainError::ConfigurationLoadFailed(format!("parse BERT config: {}", e))
        })?;

        let tokenizer = load_tokenizer(model_dir, max_length)?;
        let vb = checkpoint::weights(model_dir, &device)?;
        let model = BertSequenceClassifier::load(vb, &config, label_map.len()).map_err(|e| {
            DomainError::ConfigurationLoadFailed(format!(
                "build BERT classifier with {} labels: {}",
                label_map.len(),
                e
            ))
        })?;

        info!(
            path = %model_dir.display(),
            labels = ?label_map,
            max_length,
            "BERT severity classifier loaded"
        );

        Ok(Self {
            inner: Arc::new(BertInner {
                model,
                tokenizer,
                label_map,
                device,
            }),
        })
    }
}

/// Tokenizer with truncation to `max_length` and batch-longest padding.
pub fn load_tokenizer(model_dir: &Path, max_length: usize) -> Result<Tokenizer, DomainError> {
    let path = checkpoint::require_file(model_dir, TOKENIZER_FILE)?;
    let mut tokenizer = Tokenizer::from_file(&path)
        .map_err(|e| DomainError::ConfigurationLoadFailed(format!("load tokenizer: {}", e)))?;
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| DomainError::ConfigurationLoadFailed(format!("tokenizer truncation: {}", e)))?;
    tokenizer.with_padding(Some(PaddingParams::default()));
    Ok(tokenizer)
}

impl BertInner {
    fn infer(&self, text: &str) -> Result<SeverityTier, DomainError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| DomainError::SeverityResolution(format!("tokenize: {}", e)))?;

        let logits = self
            .logits(
                encoding.get_ids(),
                encoding.get_type_ids(),
                encoding.get_attention_mask(),
            )
            .map_err(|e| DomainError::SeverityResolution(e.to_string()))?;
        let class = argmax(&logits).ok_or_else(|| {
            DomainError::SeverityResolution("model produced no scores".to_string())
        })?;
        tier_for_class(&self.label_map, class)
    }

    fn logits(&self, ids: &[u32], type_ids: &[u32], mask: &[u32]) -> candle_core::Result<Vec<f32>> {
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(type_ids, &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(mask, &self.device)?.unsqueeze(0)?;
        self.model
            .forward(&input_ids, &token_type_ids, &attention_mask)?
            .squeeze(0)?
            .to_vec1::<f32>()
    }
}

/// Index of the maximum score; ties resolve to the first occurrence. NaN is skipped.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Tier for a predicted class index.
pub fn tier_for_class(label_map: &[SeverityTier], class: usize) -> Result<SeverityTier, DomainError> {
    label_map.get(class).copied().ok_or_else(|| {
        DomainError::SeverityResolution(format!(
            "class index {} outside label map of {}",
            class,
            label_map.len()
        ))
    })
}

#[async_trait::async_trait]
impl TextSeverityPort for BertSeverityClassifier {
    async fn classify_severity(&self, text: &str) -> Result<Option<SeverityTier>, DomainError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        let tier = tokio::task::spawn_blocking(move || inner.infer(&text))
            .await
            .map_err(|e| DomainError::SeverityResolution(format!("inference task failed: {}", e)))??;
        debug!(tier = %tier, "text severity classified");
        Ok(Some(tier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_LABEL_MAP;

    #[test]
    fn test_argmax_first_of_ties() {
        assert_eq!(argmax(&[0.1, 2.5, -1.0]), Some(1));
        assert_eq!(argmax(&[3.0, 3.0, 1.0]), Some(0));
        assert_eq!(argmax(&[-5.0, -2.0, -2.0]), Some(1));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f32::NAN, 0.5]), Some(1));
    }

    #[test]
    fn test_default_label_map_argmax_one_is_low() {
        let logits = [-0.7, 2.1, 0.3];
        let class = argmax(&logits).unwrap();
        assert_eq!(
            tier_for_class(&DEFAULT_LABEL_MAP, class).unwrap(),
            SeverityTier::Low
        );
    }

    #[test]
    fn test_class_outside_label_map() {
        assert!(matches!(
            tier_for_class(&DEFAULT_LABEL_MAP, 3),
            Err(DomainError::SeverityResolution(_))
        ));
    }

    #[test]
    fn test_load_missing_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = BertSeverityClassifier::load(dir.path(), DEFAULT_LABEL_MAP.to_vec(), 512);
        assert!(matches!(
            result.err(),
            Some(DomainError::ConfigurationLoadFailed(_))
        ));
    }
}
