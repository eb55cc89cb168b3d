//! Types and traits for recording training metrics.
//!
//! # Core Components
//!
//! * [`Record`] - A container of key-value pairs of various data types
//! * [`RecordValue`] - An enum representing the types of values that can be stored
//! * [`Recorder`] - The sink records are written to
//! * [`NullRecorder`] - A recorder that discards all records
//! * [`BufferedRecorder`] - A recorder that keeps records in memory
//!
//! # Basic Usage
//!
//! ```rust
//! use dagppo_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("critic_mse/train", 0.42);
//! record.insert("timesteps", RecordValue::Step(2000));
//! assert_eq!(record.get_scalar("critic_mse/train").unwrap(), 0.42);
//! ```
//!
//! # Integration with Training
//!
//! The [`Trainer`](crate::Trainer) writes records keyed by the total number of
//! environment timesteps, stored under [`STEP_KEY`] as a
//! [`RecordValue::Step`]. A training run without a
//! metrics backend is given no recorder and falls back to [`NullRecorder`].
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;

/// Key of the step counter in records written by the trainer.
pub const STEP_KEY: &str = "timesteps";
