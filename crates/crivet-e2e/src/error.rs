//! Verification failures.
//!
//! Every variant carries enough context (operation, identifier, raw cause)
//! to diagnose a failed case without re-running it.

use std::path::PathBuf;
use std::time::Duration;

use crivet_common::error::CrivetError;
use crivet_common::types::{ContainerId, ContainerState};
use thiserror::Error;

use crate::transition::Transition;

/// A failed lifecycle step or log check.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// A runtime service call returned an error.
    #[error("{op} failed for {id}: {source}")]
    Service {
        /// Runtime service operation name.
        op: &'static str,
        /// Sandbox or container the call targeted.
        id: String,
        /// Error reported by the runtime.
        source: CrivetError,
    },

    /// A status query succeeded but reported an unexpected state.
    #[error("container {id} should be {expected}, but is {actual}")]
    StateMismatch {
        /// Container that was queried.
        id: ContainerId,
        /// State the previous step should have produced.
        expected: ContainerState,
        /// State the runtime reported.
        actual: ContainerState,
    },

    /// A lifecycle call was attempted from a state that does not allow it.
    /// The runtime was not contacted.
    #[error("cannot {transition} container {id} while it is {from}")]
    IllegalTransition {
        /// Container the call targeted.
        id: ContainerId,
        /// Last observed state of the container.
        from: ContainerState,
        /// Rejected transition.
        transition: Transition,
    },

    /// Listing by container ID returned an unexpected number of entries.
    #[error("listing containers for {id} returned {found} entries, expected {expected}")]
    ListingMismatch {
        /// Container ID used as filter.
        id: ContainerId,
        /// Expected number of entries.
        expected: usize,
        /// Number of entries returned.
        found: usize,
    },

    /// The sandbox was created without a log directory.
    #[error("sandbox {name} has no log directory")]
    NoLogDirectory {
        /// Sandbox name.
        name: String,
    },

    /// The container was created without a log path.
    #[error("container {id} has no log path")]
    NoLogPath {
        /// Container ID.
        id: ContainerId,
    },

    /// The log file could not be opened or read.
    #[error("failed to read log file {path}: {source}")]
    Io {
        /// Log file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A log line is not a well-formed record.
    #[error("failed to decode line {line} of {path}: {source}")]
    Decode {
        /// Log file path.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Decoder error.
        source: CrivetError,
    },

    /// A decoded record differs from the expected one.
    #[error("log {field} in {path} should be {expected:?}, got {actual:?}")]
    ContentMismatch {
        /// Log file the record was read from.
        path: PathBuf,
        /// Compared field, `payload` or `stream`.
        field: &'static str,
        /// Expected value.
        expected: String,
        /// Decoded value.
        actual: String,
    },

    /// The log file holds no records.
    #[error("log file {path} contains no records")]
    NoRecords {
        /// Log file path.
        path: PathBuf,
    },

    /// No record in the log file matches the expected one.
    #[error("no record in {path} matches {expected}")]
    NoMatch {
        /// Log file path.
        path: PathBuf,
        /// Description of the expected record.
        expected: String,
    },

    /// A container did not reach a state within the poll bound.
    #[error("container {id} did not become {expected} within {waited:?} (last seen {last})")]
    Timeout {
        /// Container that was polled.
        id: ContainerId,
        /// State waited for.
        expected: ContainerState,
        /// Last state reported.
        last: ContainerState,
        /// Time spent waiting.
        waited: Duration,
    },
}

/// Result alias for verification steps.
pub type Result<T> = std::result::Result<T, VerifyError>;

impl VerifyError {
    /// Wraps a runtime error with the operation and target that produced it.
    pub fn service(op: &'static str, id: impl ToString) -> impl FnOnce(CrivetError) -> Self {
        let id = id.to_string();
        move |source| Self::Service { op, id, source }
    }
}
