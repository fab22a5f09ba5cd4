//! Pretrained weight import and fine-tuned checkpoint export.

use crate::adapters::checkpoint::{CONFIG_FILE, WEIGHTS_FILE};
use anyhow::Context;
use candle_core::Device;
use candle_nn::VarMap;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

pub const SUMMARY_FILE: &str = "training_summary.json";

/// Outcome of copying pretrained tensors into freshly initialized variables.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub loaded: usize,
    /// Variables left at their fresh init: absent from the checkpoint or shape-mismatched.
    pub fresh: Vec<String>,
}

/// Alternative names older BERT checkpoints use for LayerNorm parameters.
fn legacy_name(name: &str) -> Option<String> {
    if let Some(prefix) = name.strip_suffix(".weight") {
        Some(format!("{}.gamma", prefix))
    } else {
        name.strip_suffix(".bias")
            .map(|prefix| format!("{}.beta", prefix))
    }
}

/// Copy every checkpoint tensor whose name and shape match a variable in `varmap`.
pub fn import_pretrained(varmap: &VarMap, weights: &Path) -> anyhow::Result<ImportReport> {
    let tensors = candle_core::safetensors::load(weights, &Device::Cpu)
        .with_context(|| format!("load {}", weights.display()))?;
    import_tensors(varmap, &tensors)
}

pub fn import_tensors(
    varmap: &VarMap,
    tensors: &HashMap<String, candle_core::Tensor>,
) -> anyhow::Result<ImportReport> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| anyhow::anyhow!("variable map lock poisoned"))?;

    let mut report = ImportReport::default();
    let mut names: Vec<&String> = data.keys().collect();
    names.sort();
    for name in names {
        let var = &data[name];
        let source = tensors
            .get(name)
            .or_else(|| legacy_name(name).and_then(|alt| tensors.get(&alt)));
        match source {
            Some(t) if t.dims() == var.dims() => {
                var.set(&t.to_dtype(var.dtype())?)?;
                report.loaded += 1;
            }
            Some(t) => {
                warn!(
                    name = %name,
                    checkpoint = ?t.dims(),
                    model = ?var.dims(),
                    "shape mismatch, keeping fresh init"
                );
                report.fresh.push(name.clone());
            }
            None => report.fresh.push(name.clone()),
        }
    }
    info!(
        loaded = report.loaded,
        fresh = report.fresh.len(),
        "pretrained weights imported"
    );
    if !report.fresh.is_empty() {
        info!(names = ?report.fresh, "newly initialized parameters");
    }
    Ok(report)
}

/// Base `config.json` with the fine-tuned label vocabulary written in.
pub fn labeled_config(mut base: Value, classes: &[String]) -> anyhow::Result<Value> {
    let obj = base
        .as_object_mut()
        .context("base config.json is not a JSON object")?;
    let id2label: Map<String, Value> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (i.to_string(), json!(c)))
        .collect();
    let label2id: Map<String, Value> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.clone(), json!(i)))
        .collect();
    obj.insert("id2label".to_string(), Value::Object(id2label));
    obj.insert("label2id".to_string(), Value::Object(label2id));
    obj.insert("num_labels".to_string(), json!(classes.len()));
    Ok(base)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    std::fs::write(path, raw).with_context(|| format!("write {}", path.display()))
}

/// Write weights and labeled config into `out_dir`.
pub fn save_model(
    varmap: &VarMap,
    base_config: Value,
    classes: &[String],
    out_dir: &Path,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    varmap
        .save(out_dir.join(WEIGHTS_FILE))
        .with_context(|| format!("save weights to {}", out_dir.display()))?;
    write_json(&out_dir.join(CONFIG_FILE), &labeled_config(base_config, classes)?)?;
    info!(path = %out_dir.display(), "model saved");
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct TrainingSummary<'a> {
    pub task: &'a str,
    pub base_model: String,
    pub classes: &'a [String],
    pub train_samples: usize,
    pub test_samples: usize,
    pub optimizer_steps: usize,
    pub epochs: &'a [super::trainer::EpochReport],
    pub finished_at: String,
}
