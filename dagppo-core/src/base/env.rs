//! Environment.
use super::TaskId;
use anyhow::Result;
use std::fmt::Debug;

/// Outcome of scheduling one task in a task graph.
#[derive(Clone, Debug)]
pub struct EnvStep<S> {
    /// Reward of the step.
    pub reward: f32,

    /// Graph state after the step.
    pub state: S,

    /// Running completion time of the scheduled tasks.
    pub makespan: f32,

    /// Tasks legal to be scheduled next.
    pub candidates: Vec<TaskId>,

    /// If all tasks have been scheduled.
    pub is_done: bool,
}

/// Scheduling environment over task graphs.
///
/// An environment is a stateless transition function: every call receives the
/// graph state it acts on and returns a new one. [`DagEnv::step`] is invoked
/// from the workers of a [`WorkerPool`](crate::WorkerPool) concurrently for
/// different batch slots, hence `&self` and `Sync`.
pub trait DagEnv: Sync {
    /// An item of the training or evaluation data from which an episode starts.
    type Sample;

    /// Graph state.
    type State: Clone + Debug + Send + Sync;

    /// Returns the initial state and the initially eligible tasks of a sample.
    fn reset(&self, sample: &Self::Sample) -> Result<(Self::State, Vec<TaskId>)>;

    /// Schedules task `act` on `state` whose running makespan is `makespan`.
    fn step(&self, state: &Self::State, act: TaskId, makespan: f32) -> Result<EnvStep<Self::State>>;
}
