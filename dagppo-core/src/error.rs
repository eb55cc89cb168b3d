//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum DagPpoError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An update was requested on a trajectory buffer without any step.
    #[error("Trajectory buffer is empty")]
    EmptyTrajectory,

    /// A batched value did not have the width of the batch.
    #[error("Batch size mismatch: expected {expected}, got {actual}")]
    BatchSizeMismatch {
        /// Number of slots in the batch.
        expected: usize,
        /// Number of values actually given.
        actual: usize,
    },

    /// Slot index beyond the number of slots in a batch.
    #[error("Slot index {index} out of range for a batch of {len}")]
    SlotOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of slots.
        len: usize,
    },
}
