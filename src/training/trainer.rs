//! Supervised fine-tuning loop shared by both drivers.
//!
//! AdamW with warmup + cosine schedule, gradient accumulation over micro-batches,
//! global-norm gradient clipping, accuracy evaluation after every epoch.

use super::config::HyperParams;
use super::dataset::Example;
use super::schedule::CosineSchedule;
use candle_core::backprop::GradStore;
use candle_core::{D, Device, Tensor, Var};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::info;

/// A classifier that can be fine-tuned: batched inputs in, `(batch, classes)` logits out.
pub trait Classifier {
    type Input;

    fn forward_batch(&self, inputs: &[&Self::Input]) -> anyhow::Result<Tensor>;
}

#[derive(Debug, Clone, Serialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub train_loss: f32,
    /// None when the test split is empty.
    pub eval_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    pub optimizer_steps: usize,
    pub epochs: Vec<EpochReport>,
}

/// Optimizer steps per epoch: micro-batches grouped by the accumulation factor, rounded up.
pub fn steps_per_epoch(samples: usize, batch_size: usize, accum: usize) -> usize {
    samples.div_ceil(batch_size.max(1)).div_ceil(accum.max(1))
}

pub fn fit<M: Classifier>(
    model: &M,
    varmap: &VarMap,
    train: &[Example<M::Input>],
    test: &[Example<M::Input>],
    hp: &HyperParams,
    device: &Device,
) -> anyhow::Result<FitReport> {
    anyhow::ensure!(!train.is_empty(), "training split is empty");

    let vars = varmap.all_vars();
    let mut opt = AdamW::new(
        vars.clone(),
        ParamsAdamW {
            lr: hp.learning_rate,
            weight_decay: hp.weight_decay,
            ..Default::default()
        },
    )?;

    let per_epoch = steps_per_epoch(train.len(), hp.batch_size, hp.grad_accum_steps);
    let total_steps = per_epoch * hp.epochs;
    let schedule = CosineSchedule::new(hp.learning_rate, total_steps, hp.warmup_ratio);
    info!(
        train = train.len(),
        test = test.len(),
        steps_per_epoch = per_epoch,
        total_steps,
        warmup_steps = schedule.warmup_steps(),
        "starting fine-tuning"
    );

    let mut rng = StdRng::seed_from_u64(hp.seed);
    let mut order: Vec<usize> = (0..train.len()).collect();
    let mut step = 0usize;
    let mut epochs = Vec::with_capacity(hp.epochs);

    for epoch in 1..=hp.epochs {
        order.shuffle(&mut rng);
        let pb = ProgressBar::new(per_epoch as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "Epoch {prefix} [{bar:40.cyan/blue}] {pos}/{len} | ETA: {eta} | {msg}",
            )?
            .progress_chars("=>-"),
        );
        pb.set_prefix(format!("{}/{}", epoch, hp.epochs));

        let micro_batches: Vec<&[usize]> = order.chunks(hp.batch_size).collect();
        let mut loss_sum = 0f32;
        let mut loss_count = 0usize;

        for group in micro_batches.chunks(hp.grad_accum_steps) {
            let mut losses = Vec::with_capacity(group.len());
            for indices in group {
                let batch: Vec<&Example<M::Input>> = indices.iter().map(|&i| &train[i]).collect();
                losses.push(batch_loss(model, &batch, device)?);
            }
            let loss = Tensor::stack(&losses, 0)?.mean_all()?;

            let mut grads = loss.backward()?;
            clip_grad_norm(&mut grads, &vars, hp.max_grad_norm)?;
            opt.set_learning_rate(schedule.lr_at(step));
            opt.step(&grads)?;
            step += 1;

            let loss_value = loss.to_scalar::<f32>()?;
            loss_sum += loss_value;
            loss_count += 1;
            pb.set_message(format!("loss {:.4}", loss_value));
            pb.inc(1);

            if step % hp.logging_steps == 0 {
                info!(
                    step,
                    epoch,
                    loss = loss_value,
                    lr = opt.learning_rate(),
                    "train"
                );
            }
        }
        pb.finish_and_clear();

        let train_loss = loss_sum / loss_count.max(1) as f32;
        let eval_accuracy = evaluate(model, test, hp.batch_size)?;
        info!(epoch, train_loss, eval_accuracy = ?eval_accuracy, "epoch finished");
        epochs.push(EpochReport {
            epoch,
            train_loss,
            eval_accuracy,
        });
    }

    Ok(FitReport {
        optimizer_steps: step,
        epochs,
    })
}

fn batch_loss<M: Classifier>(
    model: &M,
    batch: &[&Example<M::Input>],
    device: &Device,
) -> anyhow::Result<Tensor> {
    let inputs: Vec<&M::Input> = batch.iter().map(|e| &e.input).collect();
    let labels: Vec<u32> = batch.iter().map(|e| e.label).collect();
    let logits = model.forward_batch(&inputs)?;
    let targets = Tensor::new(labels.as_slice(), device)?;
    Ok(candle_nn::loss::cross_entropy(&logits, &targets)?)
}

/// Fraction of test examples whose argmax logit matches the label.
pub fn evaluate<M: Classifier>(
    model: &M,
    test: &[Example<M::Input>],
    batch_size: usize,
) -> anyhow::Result<Option<f64>> {
    let mut predictions = Vec::with_capacity(test.len());
    for chunk in test.chunks(batch_size.max(1)) {
        let inputs: Vec<&M::Input> = chunk.iter().map(|e| &e.input).collect();
        let logits = model.forward_batch(&inputs)?;
        predictions.extend(logits.argmax(D::Minus1)?.to_vec1::<u32>()?);
    }
    let labels: Vec<u32> = test.iter().map(|e| e.label).collect();
    Ok(accuracy(&predictions, &labels))
}

pub fn accuracy(predictions: &[u32], labels: &[u32]) -> Option<f64> {
    if labels.is_empty() {
        return None;
    }
    let correct = predictions
        .iter()
        .zip(labels)
        .filter(|(p, l)| p == l)
        .count();
    Some(correct as f64 / labels.len() as f64)
}

/// Scale factor that brings `total_norm` down to `max_norm`, if clipping applies.
pub fn clip_coefficient(total_norm: f64, max_norm: f64) -> Option<f64> {
    if max_norm <= 0.0 || !total_norm.is_finite() || total_norm <= max_norm {
        return None;
    }
    Some(max_norm / (total_norm + 1e-6))
}

/// Clip gradients in place so their global L2 norm is at most `max_norm`.
fn clip_grad_norm(grads: &mut GradStore, vars: &[Var], max_norm: f64) -> candle_core::Result<()> {
    let mut sq_sum = 0f64;
    for var in vars {
        if let Some(g) = grads.get(var.as_tensor()) {
            sq_sum += f64::from(g.sqr()?.sum_all()?.to_scalar::<f32>()?);
        }
    }
    let Some(scale) = clip_coefficient(sq_sum.sqrt(), max_norm) else {
        return Ok(());
    };
    for var in vars {
        let scaled = match grads.get(var.as_tensor()) {
            Some(g) => (g * scale)?,
            None => continue,
        };
        grads.insert(var.as_tensor(), scaled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::{Linear, Module, VarBuilder};

    #[test]
    fn test_steps_per_epoch_rounds_up() {
        assert_eq!(steps_per_epoch(10, 4, 2), 2);
        assert_eq!(steps_per_epoch(8, 4, 2), 1);
        assert_eq!(steps_per_epoch(0, 4, 2), 0);
        assert_eq!(steps_per_epoch(17, 8, 1), 3);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0, 1, 2, 1], &[0, 1, 1, 1]), Some(0.75));
        assert_eq!(accuracy(&[], &[]), None);
    }

    #[test]
    fn test_clip_coefficient() {
        assert_eq!(clip_coefficient(0.5, 1.0), None);
        assert_eq!(clip_coefficient(3.0, 0.0), None);
        let c = clip_coefficient(4.0, 1.0).unwrap();
        assert!((c - 0.25).abs() < 1e-6);
    }

    struct Linear2 {
        head: Linear,
    }

    impl Classifier for Linear2 {
        type Input = [f32; 2];

        fn forward_batch(&self, inputs: &[&[f32; 2]]) -> anyhow::Result<Tensor> {
            let flat: Vec<f32> = inputs.iter().flat_map(|x| x.iter().copied()).collect();
            let xs = Tensor::from_vec(flat, (inputs.len(), 2), &Device::Cpu)?;
            Ok(self.head.forward(&xs)?)
        }
    }

    #[test]
    fn test_fit_learns_separable_classes() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = Linear2 {
            head: candle_nn::linear(2, 2, vb.pp("classifier")).unwrap(),
        };

        let data: Vec<Example<[f32; 2]>> = (0..32)
            .map(|i| {
                let label = (i % 2) as u32;
                let x = if label == 0 { [2.0, -2.0] } else { [-2.0, 2.0] };
                Example { input: x, label }
            })
            .collect();
        let hp = HyperParams {
            batch_size: 4,
            epochs: 20,
            learning_rate: 0.1,
            weight_decay: 0.0,
            warmup_ratio: 0.0,
            grad_accum_steps: 2,
            max_grad_norm: 1.0,
            logging_steps: 1000,
            test_ratio: 0.0,
            seed: 42,
        };

        let report = fit(&model, &varmap, &data, &data, &hp, &device).unwrap();
        assert_eq!(report.optimizer_steps, 20 * 4);
        assert_eq!(report.epochs.len(), 20);
        assert_eq!(report.epochs.last().unwrap().eval_accuracy, Some(1.0));
    }
}
