//! Training configuration. Static defaults per task, overridable from the environment.
//!
//! Read from `TRIAGE_TRAIN_*` variables (and `.env`), optionally layered over a
//! file named by `TRIAGE_TRAIN_CONFIG`.

use serde::Deserialize;
use std::path::PathBuf;

/// Optimizer and loop settings for one fine-tuning run.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperParams {
    pub batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    /// Fraction of optimizer steps spent in linear warmup.
    pub warmup_ratio: f64,
    pub grad_accum_steps: usize,
    pub max_grad_norm: f64,
    /// Log train loss every N optimizer steps.
    pub logging_steps: usize,
    pub test_ratio: f64,
    pub seed: u64,
}

impl HyperParams {
    pub fn vit_defaults() -> Self {
        Self {
            batch_size: 4,
            epochs: 5,
            learning_rate: 5e-5,
            weight_decay: 0.01,
            warmup_ratio: 0.1,
            grad_accum_steps: 2,
            max_grad_norm: 1.0,
            logging_steps: 20,
            test_ratio: 0.2,
            seed: 42,
        }
    }

    pub fn bert_defaults() -> Self {
        Self {
            batch_size: 8,
            epochs: 4,
            learning_rate: 2e-5,
            ..Self::vit_defaults()
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct TrainingConfig {
    /// Image-folder dataset root (`<root>/<class>/<image>`). Read from TRIAGE_TRAIN_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Severity CSV for the text model. Read from TRIAGE_TRAIN_SEVERITY_CSV.
    #[serde(default)]
    pub severity_csv: Option<String>,

    /// Pretrained checkpoint directory. Read from TRIAGE_TRAIN_BASE_MODEL_DIR.
    #[serde(default)]
    pub base_model_dir: Option<String>,

    /// Where the fine-tuned checkpoint is written. Read from TRIAGE_TRAIN_OUTPUT_DIR.
    #[serde(default)]
    pub output_dir: Option<String>,

    /// Tokenizer truncation length. Read from TRIAGE_TRAIN_MAX_LENGTH.
    #[serde(default)]
    pub max_length: Option<usize>,

    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub epochs: Option<usize>,
    #[serde(default)]
    pub learning_rate: Option<f64>,
    #[serde(default)]
    pub weight_decay: Option<f64>,
    #[serde(default)]
    pub warmup_ratio: Option<f64>,
    #[serde(default)]
    pub grad_accum_steps: Option<usize>,
    #[serde(default)]
    pub max_grad_norm: Option<f64>,
    #[serde(default)]
    pub logging_steps: Option<usize>,
    #[serde(default)]
    pub test_ratio: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TrainingConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var("TRIAGE_TRAIN_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c = c.add_source(config::Environment::with_prefix("TRIAGE_TRAIN"));
        c.build()?.try_deserialize()
    }

    /// Apply overrides on top of a task's defaults.
    pub fn hyper_params(&self, defaults: HyperParams) -> HyperParams {
        HyperParams {
            batch_size: self.batch_size.unwrap_or(defaults.batch_size).max(1),
            epochs: self.epochs.unwrap_or(defaults.epochs),
            learning_rate: self.learning_rate.unwrap_or(defaults.learning_rate),
            weight_decay: self.weight_decay.unwrap_or(defaults.weight_decay),
            warmup_ratio: self.warmup_ratio.unwrap_or(defaults.warmup_ratio),
            grad_accum_steps: self.grad_accum_steps.unwrap_or(defaults.grad_accum_steps).max(1),
            max_grad_norm: self.max_grad_norm.unwrap_or(defaults.max_grad_norm),
            logging_steps: self.logging_steps.unwrap_or(defaults.logging_steps).max(1),
            test_ratio: self.test_ratio.unwrap_or(defaults.test_ratio),
            seed: self.seed.unwrap_or(defaults.seed),
        }
    }

    pub fn data_dir_or(&self, default: &str) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or(default))
    }

    pub fn severity_csv_or(&self, default: &str) -> PathBuf {
        PathBuf::from(self.severity_csv.as_deref().unwrap_or(default))
    }

    pub fn base_model_dir_or(&self, default: &str) -> PathBuf {
        PathBuf::from(self.base_model_dir.as_deref().unwrap_or(default))
    }

    pub fn output_dir_or(&self, default: &str) -> PathBuf {
        PathBuf::from(self.output_dir.as_deref().unwrap_or(default))
    }

    /// Returns the text truncation length. Defaults to 128.
    pub fn max_length_or_default(&self) -> usize {
        self.max_length.unwrap_or(128)
    }
}
