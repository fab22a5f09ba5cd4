//! BERT severity fine-tuning on the condition/severity CSV.

use super::checkpoint::{self, SUMMARY_FILE, TrainingSummary};
use super::config::{HyperParams, TrainingConfig};
use super::dataset::{Example, LabelEncoder, load_severity_rows, train_test_split};
use super::trainer::{self, Classifier};
use crate::adapters::checkpoint::{CONFIG_FILE, TOKENIZER_FILE, WEIGHTS_FILE, read_json};
use crate::adapters::text::{BertSequenceClassifier, load_tokenizer};
use anyhow::Context;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use candle_transformers::models::bert;
use tokenizers::{Encoding, Tokenizer};
use tracing::info;

const DEFAULT_SEVERITY_CSV: &str = "./data/severity_classification_dataset.csv";
const DEFAULT_BASE_MODEL_DIR: &str = "./models/bio-clinicalbert";
const DEFAULT_OUTPUT_DIR: &str = "./models/bert";

struct BertTask {
    model: BertSequenceClassifier,
    tokenizer: Tokenizer,
    device: Device,
}

impl BertTask {
    fn stack(&self, encodings: &[Encoding], field: fn(&Encoding) -> &[u32]) -> anyhow::Result<Tensor> {
        let rows = encodings
            .iter()
            .map(|e| Tensor::new(field(e), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        Ok(Tensor::stack(&rows, 0)?)
    }
}

impl Classifier for BertTask {
    type Input = String;

    fn forward_batch(&self, inputs: &[&String]) -> anyhow::Result<Tensor> {
        let texts: Vec<&str> = inputs.iter().map(|s| s.as_str()).collect();
        let encodings = self
            .tokenizer
            .encode_batch(texts, true)
            .map_err(anyhow::Error::msg)?;
        let input_ids = self.stack(&encodings, Encoding::get_ids)?;
        let type_ids = self.stack(&encodings, Encoding::get_type_ids)?;
        let mask = self.stack(&encodings, Encoding::get_attention_mask)?;
        Ok(self.model.forward(&input_ids, &type_ids, &mask)?)
    }
}

pub fn run(cfg: &TrainingConfig) -> anyhow::Result<()> {
    let hp = cfg.hyper_params(HyperParams::bert_defaults());
    let csv_path = cfg.severity_csv_or(DEFAULT_SEVERITY_CSV);
    let base_dir = cfg.base_model_dir_or(DEFAULT_BASE_MODEL_DIR);
    let out_dir = cfg.output_dir_or(DEFAULT_OUTPUT_DIR);
    let max_length = cfg.max_length_or_default();
    let device = Device::Cpu;
    info!(device = ?device, data = %csv_path.display(), base = %base_dir.display(), "train-bert");

    let rows = load_severity_rows(&csv_path)?;
    let encoder = LabelEncoder::fit(rows.iter().map(|(_, label)| label.as_str()));
    let mapping: Vec<(usize, &String)> = encoder.classes().iter().enumerate().collect();
    info!(mapping = ?mapping, rows = rows.len(), "label mapping");

    let examples = rows
        .into_iter()
        .map(|(text, label)| {
            let label = encoder
                .transform(&label)
                .with_context(|| format!("label '{}' missing from encoder", label))?;
            Ok(Example { input: text, label })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let (train, test) = train_test_split(examples, hp.test_ratio, hp.seed);

    let tokenizer = load_tokenizer(&base_dir, max_length)?;
    let base_config = read_json(&base_dir.join(CONFIG_FILE))?;
    let config: bert::Config =
        serde_json::from_value(base_config.clone()).context("parse base BERT config")?;

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = BertSequenceClassifier::load(vb, &config, encoder.classes().len())?;
    checkpoint::import_pretrained(&varmap, &base_dir.join(WEIGHTS_FILE))?;

    let task = BertTask {
        model,
        tokenizer,
        device: device.clone(),
    };
    let report = trainer::fit(&task, &varmap, &train, &test, &hp, &device)?;

    checkpoint::save_model(&varmap, base_config, encoder.classes(), &out_dir)?;
    task.tokenizer
        .save(out_dir.join(TOKENIZER_FILE), true)
        .map_err(anyhow::Error::msg)
        .context("save tokenizer")?;
    checkpoint::write_json(
        &out_dir.join(SUMMARY_FILE),
        &TrainingSummary {
            task: "bert-severity-classification",
            base_model: base_dir.display().to_string(),
            classes: encoder.classes(),
            train_samples: train.len(),
            test_samples: test.len(),
            optimizer_steps: report.optimizer_steps,
            epochs: &report.epochs,
            finished_at: chrono::Utc::now().to_rfc3339(),
        },
    )?;

    info!(path = %out_dir.display(), "training completed");
    Ok(())
}
