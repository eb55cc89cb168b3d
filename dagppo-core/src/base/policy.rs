//! Policy.
use super::TaskId;
use anyhow::Result;

/// Actions sampled for a batch together with their log-probabilities.
#[derive(Clone, Debug, PartialEq)]
pub struct Sampled {
    /// Chosen task of each batch slot.
    pub actions: Vec<TaskId>,

    /// Log-probability of each chosen task under the acting policy.
    pub logprobs: Vec<f32>,
}

/// A policy choosing the next task to schedule for a batch of graph states.
pub trait Policy<S> {
    /// Samples one eligible task per state.
    ///
    /// `candidates[i]` is the set of eligible tasks of `states[i]`, and the
    /// returned action of slot `i` must be one of them.
    fn act(&mut self, states: &[S], candidates: &[Vec<TaskId>]) -> Result<Sampled>;
}
