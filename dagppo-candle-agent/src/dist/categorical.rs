//! Categorical distribution over a variable number of choices.
use anyhow::Result;
use candle_core::Tensor;
use rand::{distributions::WeightedIndex, Rng};

/// Categorical distribution given by a 1-dimensional tensor of log-probabilities.
///
/// Each batch item of a scheduling policy has its own number of eligible
/// tasks, so the distribution is kept per item rather than as a padded batch.
pub struct Categorical {
    log_probs: Tensor,
}

impl Categorical {
    /// Constructs the distribution from normalized log-probabilities.
    pub fn from_log_probs(log_probs: Tensor) -> Self {
        Self { log_probs }
    }

    /// Samples the index of a choice.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<usize> {
        let probs: Vec<f32> = self.log_probs.exp()?.to_vec1()?;
        Ok(rng.sample(WeightedIndex::new(&probs)?))
    }

    /// Log-probability of the choice `ix`, as a scalar tensor tracking gradients.
    pub fn log_prob(&self, ix: usize) -> Result<Tensor> {
        Ok(self.log_probs.get(ix)?)
    }

    /// Entropy as a scalar tensor.
    pub fn entropy(&self) -> Result<Tensor> {
        let p_logp = (self.log_probs.exp()? * &self.log_probs)?;
        Ok(p_logp.sum_all()?.neg()?)
    }
}
