//! Buffer of batched timesteps consumed by a policy update.
use crate::{error::DagPpoError, TaskId};

/// Added to the standard deviation when returns are standardized.
pub const RETURN_NORM_EPS: f32 = 1e-5;

/// Record of one timestep over all batch slots.
///
/// Every field has one entry per slot.
#[derive(Clone, Debug)]
pub struct TrajectoryStep<S> {
    /// Graph states the actions were chosen on.
    pub states: Vec<S>,

    /// Eligible tasks of the states.
    pub candidates: Vec<Vec<TaskId>>,

    /// Chosen tasks.
    pub actions: Vec<TaskId>,

    /// Log-probabilities of the chosen tasks under the acting policy.
    pub logprobs: Vec<f32>,

    /// Rewards after the step.
    pub rewards: Vec<f32>,

    /// Terminal flags after the step.
    pub dones: Vec<bool>,
}

impl<S> TrajectoryStep<S> {
    /// Number of slots in the step.
    pub fn width(&self) -> usize {
        self.actions.len()
    }

    fn check_width(&self) -> Result<(), DagPpoError> {
        let expected = self.actions.len();
        for actual in [
            self.states.len(),
            self.candidates.len(),
            self.logprobs.len(),
            self.rewards.len(),
            self.dones.len(),
        ] {
            if actual != expected {
                return Err(DagPpoError::BatchSizeMismatch { expected, actual });
            }
        }
        Ok(())
    }
}

/// Flattened contents of a [`TrajectoryBuffer`], timestep-major.
#[derive(Clone, Debug)]
pub struct FlatTrajectory<S> {
    /// Graph states.
    pub states: Vec<S>,

    /// Eligible tasks.
    pub candidates: Vec<Vec<TaskId>>,

    /// Chosen tasks.
    pub actions: Vec<TaskId>,

    /// Log-probabilities under the acting policy.
    pub logprobs: Vec<f32>,
}

/// Ordered sequence of [`TrajectoryStep`]s.
///
/// Steps accumulate, possibly across episodes, until an update consumes
/// them; the buffer is then cleared, so that each step contributes to
/// exactly one update.
#[derive(Clone, Debug)]
pub struct TrajectoryBuffer<S> {
    steps: Vec<TrajectoryStep<S>>,
}

impl<S> Default for TrajectoryBuffer<S> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<S: Clone> TrajectoryBuffer<S> {
    /// Constructs an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a timestep.
    ///
    /// All steps in a buffer must have the same width.
    pub fn push(&mut self, step: TrajectoryStep<S>) -> Result<(), DagPpoError> {
        step.check_width()?;
        if let Some(first) = self.steps.first() {
            if first.width() != step.width() {
                return Err(DagPpoError::BatchSizeMismatch {
                    expected: first.width(),
                    actual: step.width(),
                });
            }
        }
        self.steps.push(step);
        Ok(())
    }

    /// Removes all steps.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Number of timesteps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if there is no step.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of slots per timestep, `0` for an empty buffer.
    pub fn width(&self) -> usize {
        self.steps.first().map_or(0, |s| s.width())
    }

    /// Iterates over the steps in recording order.
    pub fn iter(&self) -> std::slice::Iter<'_, TrajectoryStep<S>> {
        self.steps.iter()
    }

    /// The last recorded step.
    pub fn last(&self) -> Option<&TrajectoryStep<S>> {
        self.steps.last()
    }

    /// Discounted returns of every slot at every timestep.
    ///
    /// The recursion walks the steps backwards starting from `bootstrap`, the
    /// value estimate of the states recorded at the last step, i.e. before
    /// its action was applied. At each step the
    /// carried value of a slot is zeroed where the slot is done, then
    /// `ret = reward + gamma * ret`. The result is indexed `[timestep][slot]`.
    pub fn discounted_returns(
        &self,
        gamma: f32,
        bootstrap: &[f32],
    ) -> Result<Vec<Vec<f32>>, DagPpoError> {
        if self.steps.is_empty() {
            return Err(DagPpoError::EmptyTrajectory);
        }
        if bootstrap.len() != self.width() {
            return Err(DagPpoError::BatchSizeMismatch {
                expected: self.width(),
                actual: bootstrap.len(),
            });
        }

        let mut ret = bootstrap.to_vec();
        let mut returns = vec![vec![]; self.steps.len()];

        for (t, step) in self.steps.iter().enumerate().rev() {
            for (b, r) in ret.iter_mut().enumerate() {
                if step.dones[b] {
                    *r = 0.0;
                }
                *r = step.rewards[b] + gamma * *r;
            }
            returns[t] = ret.clone();
        }

        Ok(returns)
    }

    /// Concatenates all steps into flat batches of size `len() * width()`.
    pub fn flatten(&self) -> FlatTrajectory<S> {
        let n = self.len() * self.width();
        let mut flat = FlatTrajectory {
            states: Vec::with_capacity(n),
            candidates: Vec::with_capacity(n),
            actions: Vec::with_capacity(n),
            logprobs: Vec::with_capacity(n),
        };

        for step in self.steps.iter() {
            flat.states.extend(step.states.iter().cloned());
            flat.candidates.extend(step.candidates.iter().cloned());
            flat.actions.extend_from_slice(&step.actions);
            flat.logprobs.extend_from_slice(&step.logprobs);
        }

        flat
    }
}

/// Standardizes values to zero mean and unit variance.
///
/// The standard deviation is the unbiased estimate and [`RETURN_NORM_EPS`] is
/// added to it. With fewer than two values the deviation is taken as zero.
pub fn normalize_returns(xs: &[f32]) -> Vec<f32> {
    if xs.is_empty() {
        return vec![];
    }

    let n = xs.len() as f32;
    let mean = xs.iter().sum::<f32>() / n;
    let std = if xs.len() < 2 {
        0.0
    } else {
        (xs.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / (n - 1.0)).sqrt()
    };

    xs.iter().map(|x| (x - mean) / (std + RETURN_NORM_EPS)).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn step(rewards: Vec<f32>, dones: Vec<bool>) -> TrajectoryStep<u32> {
        let n = rewards.len();
        TrajectoryStep {
            states: (0..n as u32).collect(),
            candidates: vec![vec![0, 1]; n],
            actions: vec![0; n],
            logprobs: vec![-0.5; n],
            rewards,
            dones,
        }
    }

    fn scripted() -> TrajectoryBuffer<u32> {
        let mut buffer = TrajectoryBuffer::new();
        buffer.push(step(vec![1.0, 0.0], vec![false, false])).unwrap();
        buffer.push(step(vec![0.0, 0.0], vec![false, false])).unwrap();
        buffer.push(step(vec![5.0, 1.0], vec![true, true])).unwrap();
        buffer
    }

    #[test]
    fn test_discounted_returns() -> Result<(), DagPpoError> {
        let returns = scripted().discounted_returns(0.5, &[0.0, 0.0])?;

        assert_eq!(
            returns,
            vec![vec![2.25, 0.25], vec![2.5, 0.5], vec![5.0, 1.0]]
        );
        Ok(())
    }

    #[test]
    fn test_terminal_step_ignores_bootstrap() -> Result<(), DagPpoError> {
        let returns = scripted().discounted_returns(0.5, &[100.0, -100.0])?;

        // Done at the last step masks the bootstrap value entirely.
        assert_eq!(returns[2], vec![5.0, 1.0]);
        assert_eq!(returns[0], vec![2.25, 0.25]);
        Ok(())
    }

    #[test]
    fn test_bootstrap_mid_episode() -> Result<(), DagPpoError> {
        let mut buffer = TrajectoryBuffer::new();
        buffer.push(step(vec![1.0], vec![false]))?;
        buffer.push(step(vec![2.0], vec![false]))?;
        let returns = buffer.discounted_returns(0.5, &[4.0])?;

        assert_eq!(returns, vec![vec![3.0], vec![4.0]]);
        Ok(())
    }

    #[test]
    fn test_done_cuts_across_episodes() -> Result<(), DagPpoError> {
        let mut buffer = TrajectoryBuffer::new();
        buffer.push(step(vec![1.0], vec![false]))?;
        buffer.push(step(vec![1.0], vec![true]))?;
        buffer.push(step(vec![8.0], vec![false]))?;
        let returns = buffer.discounted_returns(0.5, &[0.0])?;

        // The first episode ends at t=1, so the reward at t=2 does not leak back.
        assert_eq!(returns, vec![vec![1.5], vec![1.0], vec![8.0]]);
        Ok(())
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = TrajectoryBuffer::<u32>::new();
        assert!(matches!(
            buffer.discounted_returns(0.9, &[]),
            Err(DagPpoError::EmptyTrajectory)
        ));
    }

    #[test]
    fn test_width_mismatch() {
        let mut buffer = scripted();
        let err = buffer.push(step(vec![0.0], vec![false])).unwrap_err();
        assert!(matches!(
            err,
            DagPpoError::BatchSizeMismatch {
                expected: 2,
                actual: 1
            }
        ));

        let mut bad = step(vec![0.0, 0.0], vec![false, false]);
        bad.logprobs.pop();
        assert!(buffer.push(bad).is_err());
        assert!(buffer.discounted_returns(0.9, &[0.0]).is_err());
    }

    #[test]
    fn test_clear() {
        let mut buffer = scripted();
        assert_eq!(buffer.len(), 3);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.width(), 0);
        assert!(buffer.flatten().actions.is_empty());
    }

    #[test]
    fn test_flatten_order() {
        let mut buffer = TrajectoryBuffer::new();
        for t in 0..2u32 {
            buffer
                .push(TrajectoryStep {
                    states: vec![10 * t, 10 * t + 1],
                    candidates: vec![vec![t as usize], vec![t as usize + 1]],
                    actions: vec![t as usize, t as usize + 1],
                    logprobs: vec![-(t as f32), -(t as f32) - 0.5],
                    rewards: vec![0.0, 0.0],
                    dones: vec![false, false],
                })
                .unwrap();
        }
        let flat = buffer.flatten();

        assert_eq!(flat.states, vec![0, 1, 10, 11]);
        assert_eq!(flat.candidates, vec![vec![0], vec![1], vec![1], vec![2]]);
        assert_eq!(flat.actions, vec![0, 1, 1, 2]);
        assert_eq!(flat.logprobs, vec![0.0, -0.5, -1.0, -1.5]);
    }

    #[test]
    fn test_normalize_returns() {
        let xs = normalize_returns(&[1.0, 2.0, 3.0]);
        let expected = [-1.0, 0.0, 1.0];
        for (x, e) in xs.iter().zip(expected.iter()) {
            assert!((x - e).abs() < 1e-4);
        }
    }

    #[test]
    fn test_normalize_constant_returns() {
        let xs = normalize_returns(&[2.0, 2.0, 2.0]);
        assert!(xs.iter().all(|x| *x == 0.0));

        let xs = normalize_returns(&[7.0]);
        assert_eq!(xs, vec![0.0]);
        assert!(normalize_returns(&[]).is_empty());
    }
}
