//! Model checkpoint directory access (HuggingFace layout).
//!
//! `config.json` + `model.safetensors`, plus model-specific processor files.

use crate::domain::DomainError;
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const PREPROCESSOR_FILE: &str = "preprocessor_config.json";

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<serde_json::Value, DomainError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        DomainError::ConfigurationLoadFailed(format!("read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        DomainError::ConfigurationLoadFailed(format!("parse {}: {}", path.display(), e))
    })
}

/// Path of a required file inside the checkpoint directory.
pub fn require_file(model_dir: &Path, name: &str) -> Result<PathBuf, DomainError> {
    let path = model_dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(DomainError::ConfigurationLoadFailed(format!(
            "missing {} in {}",
            name,
            model_dir.display()
        )))
    }
}

/// Memory-mapped F32 weights from `model.safetensors`.
pub fn weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>, DomainError> {
    let path = require_file(model_dir, WEIGHTS_FILE)?;
    // SAFETY: the checkpoint file is not modified while the service runs.
    unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device) }
        .map_err(|e| DomainError::ConfigurationLoadFailed(format!("load weights: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_file_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = require_file(dir.path(), WEIGHTS_FILE).unwrap_err();
        assert!(err.to_string().contains("model.safetensors"));

        std::fs::write(dir.path().join(CONFIG_FILE), "{\"hidden_size\": 8}").unwrap();
        let path = require_file(dir.path(), CONFIG_FILE).unwrap();
        assert_eq!(read_json(&path).unwrap()["hidden_size"], 8);
    }

    #[test]
    fn test_read_json_rejects_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            read_json(&path),
            Err(DomainError::ConfigurationLoadFailed(_))
        ));
    }
}
