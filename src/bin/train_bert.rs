//! Fine-tune a BERT severity classifier on the condition/severity CSV.
//!
//! No flags; settings come from `TRIAGE_TRAIN_*` environment variables.

use anyhow::Context;
use derm_triage::shared::logging::init_tracing;
use derm_triage::training::{TrainingConfig, bert};
use tracing::error;

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cfg = TrainingConfig::load().context("load training configuration (TRIAGE_TRAIN_*)")?;
    bert::run(&cfg).inspect_err(|e| error!("training failed: {:#}", e))
}
