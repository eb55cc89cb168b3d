//! Learning rate schedule.
use serde::{Deserialize, Serialize};

/// Multi-step decay of the learning rate.
///
/// After `n` updates the learning rate is `base_lr * gamma^k`, where `k` is
/// the number of milestones less than or equal to `n`. A milestone at `0`
/// applies from the start.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MultiStepLr {
    base_lr: f64,
    milestones: Vec<usize>,
    gamma: f64,
}

impl MultiStepLr {
    /// Creates a schedule. Milestones are counted in updates and need not be sorted.
    pub fn new(base_lr: f64, mut milestones: Vec<usize>, gamma: f64) -> Self {
        milestones.sort_unstable();
        Self {
            base_lr,
            milestones,
            gamma,
        }
    }

    /// Learning rate after `n_updates` updates.
    pub fn get_lr(&self, n_updates: usize) -> f64 {
        let k = self.milestones.iter().take_while(|m| **m <= n_updates).count();
        self.base_lr * self.gamma.powi(k as i32)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_multi_step_lr() {
        let sched = MultiStepLr::new(0.002, vec![4, 2], 0.1);

        assert!(close(sched.get_lr(0), 0.002));
        assert!(close(sched.get_lr(1), 0.002));
        assert!(close(sched.get_lr(2), 0.0002));
        assert!(close(sched.get_lr(3), 0.0002));
        assert!(close(sched.get_lr(4), 0.00002));
        assert!(close(sched.get_lr(100), 0.00002));
    }

    #[test]
    fn test_milestone_at_zero() {
        let sched = MultiStepLr::new(1.0, vec![0, 0], 0.5);
        assert!(close(sched.get_lr(0), 0.25));
    }

    #[test]
    fn test_no_milestone() {
        let sched = MultiStepLr::new(0.01, vec![], 0.1);
        assert!(close(sched.get_lr(1000), 0.01));
    }
}
