//! ViT fine-tuning on an image-folder dataset.

use super::checkpoint::{self, SUMMARY_FILE, TrainingSummary};
use super::config::{HyperParams, TrainingConfig};
use super::dataset::{Example, load_image_folder, train_test_split};
use super::trainer::{self, Classifier};
use crate::adapters::checkpoint::{CONFIG_FILE, PREPROCESSOR_FILE, WEIGHTS_FILE, read_json};
use crate::adapters::vision::PreprocessorConfig;
use anyhow::Context;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use candle_transformers::models::vit;
use tracing::{info, warn};

const DEFAULT_DATA_DIR: &str = "./data/images";
const DEFAULT_BASE_MODEL_DIR: &str = "./models/vit-base-patch16-224";
const DEFAULT_OUTPUT_DIR: &str = "./models/vit";

struct VitTask {
    model: vit::Model,
}

impl Classifier for VitTask {
    type Input = Tensor;

    fn forward_batch(&self, inputs: &[&Tensor]) -> anyhow::Result<Tensor> {
        let pixels = Tensor::stack(inputs, 0)?;
        Ok(self.model.forward(&pixels)?)
    }
}

pub fn run(cfg: &TrainingConfig) -> anyhow::Result<()> {
    let hp = cfg.hyper_params(HyperParams::vit_defaults());
    let data_dir = cfg.data_dir_or(DEFAULT_DATA_DIR);
    let base_dir = cfg.base_model_dir_or(DEFAULT_BASE_MODEL_DIR);
    let out_dir = cfg.output_dir_or(DEFAULT_OUTPUT_DIR);
    let device = Device::Cpu;
    info!(device = ?device, data = %data_dir.display(), base = %base_dir.display(), "train-vit");

    let folder = load_image_folder(&data_dir)?;
    info!(classes = ?folder.classes, images = folder.samples.len(), "dataset loaded");

    let preprocessor = PreprocessorConfig::load(&base_dir)?;
    let mut examples = Vec::with_capacity(folder.samples.len());
    for sample in &folder.samples {
        let pixels = std::fs::read(&sample.input)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| Ok(preprocessor.to_tensor(&bytes, &device)?));
        match pixels {
            Ok(input) => examples.push(Example {
                input,
                label: sample.label,
            }),
            Err(e) => warn!(path = %sample.input.display(), error = %e, "skipping unreadable image"),
        }
    }

    let (train, test) = train_test_split(examples, hp.test_ratio, hp.seed);

    let base_config = read_json(&base_dir.join(CONFIG_FILE))?;
    let config: vit::Config =
        serde_json::from_value(base_config.clone()).context("parse base ViT config")?;

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = vit::Model::new(&config, folder.classes.len(), vb)?;
    checkpoint::import_pretrained(&varmap, &base_dir.join(WEIGHTS_FILE))?;

    let task = VitTask { model };
    let report = trainer::fit(&task, &varmap, &train, &test, &hp, &device)?;

    checkpoint::save_model(&varmap, base_config, &folder.classes, &out_dir)?;
    checkpoint::write_json(&out_dir.join(PREPROCESSOR_FILE), &preprocessor)?;
    checkpoint::write_json(
        &out_dir.join(SUMMARY_FILE),
        &TrainingSummary {
            task: "vit-image-classification",
            base_model: base_dir.display().to_string(),
            classes: &folder.classes,
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
