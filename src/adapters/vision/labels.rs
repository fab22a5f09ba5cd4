//! Label vocabulary for the image classifier.
//!
//! Either the class folders of a labeled image dataset, or `id2label` from the
//! checkpoint's `config.json`.

use crate::domain::DomainError;
use std::path::Path;

/// Class names from an image-folder dataset: sub-directory names, sorted.
///
/// Hidden directories are ignored. The order matches the label indices the
/// training driver assigns.
pub fn labels_from_image_folder(dir: &Path) -> Result<Vec<String>, DomainError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        DomainError::ConfigurationLoadFailed(format!("read labels dir {}: {}", dir.display(), e))
    })?;

    let mut labels = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DomainError::ConfigurationLoadFailed(e.to_string()))?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_dir && !name.starts_with('.') {
            labels.push(name);
        }
    }
    labels.sort();

    if labels.is_empty() {
        return Err(DomainError::ConfigurationLoadFailed(format!(
            "no class folders in {}",
            dir.display()
        )));
    }
    Ok(labels)
}

/// Class names from a HuggingFace `config.json` `id2label` map.
///
/// Keys must cover `0..n` exactly.
pub fn labels_from_model_config(config: &serde_json::Value) -> Result<Vec<String>, DomainError> {
    let map = config
        .get("id2label")
        .and_then(|v| v.as_object())
        .ok_or_else(|| {
            DomainError::ConfigurationLoadFailed("config.json has no id2label".to_string())
        })?;

    let mut labels = vec![None; map.len()];
    for (key, value) in map {
        let idx: usize = key.parse().map_err(|_| {
            DomainError::ConfigurationLoadFailed(format!("non-numeric id2label key '{}'", key))
        })?;
        let name = value.as_str().ok_or_else(|| {
            DomainError::ConfigurationLoadFailed(format!("id2label[{}] is not a string", key))
        })?;
        let slot = labels.get_mut(idx).ok_or_else(|| {
            DomainError::ConfigurationLoadFailed(format!("id2label index {} out of range", idx))
        })?;
        *slot = Some(name.to_string());
    }

    labels
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| DomainError::ConfigurationLoadFailed("id2label is incomplete".to_string()))
}
