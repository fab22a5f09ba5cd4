//! Learning-rate schedule: linear warmup, then cosine decay to zero.

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy)]
pub struct CosineSchedule {
    base_lr: f64,
    warmup_steps: usize,
    total_steps: usize,
}

impl CosineSchedule {
    /// Warmup covers `ceil(total_steps * warmup_ratio)` optimizer steps.
    pub fn new(base_lr: f64, total_steps: usize, warmup_ratio: f64) -> Self {
        let warmup_steps = (total_steps as f64 * warmup_ratio.max(0.0)).ceil() as usize;
        Self {
            base_lr,
            warmup_steps,
            total_steps,
        }
    }

    pub fn warmup_steps(&self) -> usize {
        self.warmup_steps
    }

    /// Learning rate for the optimizer step at index `step` (0-based).
    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.base_lr * step as f64 / self.warmup_steps.max(1) as f64;
        }
        let decay_steps = self.total_steps.saturating_sub(self.warmup_steps).max(1);
        let progress = (step - self.warmup_steps) as f64 / decay_steps as f64;
        self.base_lr * (0.5 * (1.0 + (PI * progress).cos())).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_warmup_is_linear_from_zero() {
        let s = CosineSchedule::new(1e-3, 100, 0.1);
        assert_eq!(s.warmup_steps(), 10);
        assert!(close(s.lr_at(0), 0.0));
        assert!(close(s.lr_at(5), 5e-4));
        assert!(close(s.lr_at(10), 1e-3));
    }

    #[test]
    fn test_cosine_decays_to_zero() {
        let s = CosineSchedule::new(1e-3, 100, 0.1);
        assert!(close(s.lr_at(55), 5e-4));
        assert!(s.lr_at(99) < 1e-6);
        assert!(close(s.lr_at(100), 0.0));
        assert!(s.lr_at(30) > s.lr_at(60));
    }

    #[test]
    fn test_no_warmup() {
        let s = CosineSchedule::new(2e-5, 8, 0.0);
        assert_eq!(s.warmup_steps(), 0);
        assert!(close(s.lr_at(0), 2e-5));
    }
}
