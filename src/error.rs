//! Error types.

use thiserror::Error;

use crate::comm::DataType;

/// Errors raised by the abstraction and by the worker transport.
///
/// Index errors are caller mistakes and are never clamped. Transport errors are fatal:
/// the distributed run has to be aborted by whoever coordinates the workers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("coordinate {value} out of range in dimension {dimension} (expected < {bound})")]
    CoordinateOutOfRange {
        dimension: usize,
        value: usize,
        bound: usize,
    },

    #[error("state {state} out of range (state count is {count})")]
    StateOutOfRange { state: usize, count: usize },

    #[error("expected {expected} coordinates, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("unknown worker {worker} (group size is {size})")]
    UnknownWorker { worker: usize, size: usize },

    #[error("message from worker {from} with tag {tag} carries {found:?}, expected {expected:?}")]
    TypeMismatch {
        from: usize,
        tag: i32,
        expected: DataType,
        found: DataType,
    },

    #[error("message from worker {from} with tag {tag} has {found} elements, expected {expected}")]
    CountMismatch {
        from: usize,
        tag: i32,
        expected: usize,
        found: usize,
    },

    #[error("partition spans {partition} workers but the group has {group}")]
    GroupSizeMismatch { partition: usize, group: usize },

    #[error("malformed boundary batch from worker {from}: {reason}")]
    MalformedBatch { from: usize, reason: String },

    #[error("worker {0} disconnected")]
    Disconnected(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
