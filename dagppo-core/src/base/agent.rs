//! Agent.
use super::Policy;
use crate::{record::Record, TrajectoryBuffer};
use anyhow::Result;
use std::path::Path;

/// Represents a trainable policy.
pub trait Agent<S>: Policy<S> {
    /// Performs an optimization step consuming all steps in `buffer`.
    ///
    /// The returned record includes the scalar `critic_mse`, the mean critic
    /// loss over the optimization epochs. The caller clears the buffer after
    /// this method returns successfully.
    fn update(&mut self, buffer: &TrajectoryBuffer<S>) -> Result<Record>;

    /// Current learning rates of the parameter groups, for logging.
    ///
    /// Entry `i` is written as `lr/{i}`. Groups sharing an optimizer report
    /// one entry, e.g. a PPO agent merges its actor and critic heads.
    fn learning_rates(&self) -> Vec<f64> {
        vec![]
    }

    /// Save the parameters of the agent to the given path.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Load the parameters of the agent from the given path.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
