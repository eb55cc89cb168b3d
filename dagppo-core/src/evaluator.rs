//! Evaluate [`Agent`](crate::Agent) on held-out samples.
use crate::record::Record;
use anyhow::Result;

/// Evaluates an agent on held-out task graphs.
///
/// The returned record must contain [`RATIO_KEY`] as
/// [`RecordValue::Scalars`](crate::record::RecordValue::Scalars) with at least
/// the entry `mean`: the achieved makespan divided by the best known baseline
/// makespan, averaged over the evaluation samples. Other entries of the
/// record are written to the metrics sink as they are.
pub trait Evaluator<A> {
    /// Evaluate the agent.
    fn evaluate(&mut self, agent: &mut A) -> Result<Record>;
}

/// Key of the makespan ratio in evaluation records.
pub const RATIO_KEY: &str = "ratio";
