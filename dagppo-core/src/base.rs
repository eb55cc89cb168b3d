//! Core functionalities.
mod agent;
mod env;
mod policy;
pub use agent::Agent;
pub use env::{DagEnv, EnvStep};
pub use policy::{Policy, Sampled};

/// Index of a task node in a task graph.
///
/// Eligible actions of a scheduling state are sets of task indices.
pub type TaskId = usize;
