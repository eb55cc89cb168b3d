#![warn(missing_docs)]
//! Rollout collection and trajectory bookkeeping for training task-graph
//! schedulers with proximal policy optimization.
//!
//! This crate does not depend on any tensor backend. It provides
//!
//! * the interface of the scheduling environment ([`DagEnv`]),
//! * the interface of a policy acting on a batch of environments ([`Policy`], [`Agent`]),
//! * the per-episode container of batch slots ([`BatchState`]),
//! * the buffer of recorded timesteps consumed by an update ([`TrajectoryBuffer`]),
//! * a barrier-synchronized pool stepping environments in parallel ([`WorkerPool`]),
//! * and the training loop tying them together ([`Trainer`]).
//!
//! Agents implemented with a tensor backend live in separate crates.
pub mod error;
pub mod record;

mod base;
pub use base::{Agent, DagEnv, EnvStep, Policy, Sampled, TaskId};

mod batch_state;
pub use batch_state::{BatchState, Slot, SlotUpdate};

mod trajectory;
pub use trajectory::{
    normalize_returns, FlatTrajectory, TrajectoryBuffer, TrajectoryStep, RETURN_NORM_EPS,
};

mod worker_pool;
pub use worker_pool::WorkerPool;

mod evaluator;
pub use evaluator::{Evaluator, RATIO_KEY};

mod trainer;
pub use trainer::{TrainStats, Trainer, TrainerConfig};
