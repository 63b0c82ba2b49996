//! Error types for one scan cycle.
//!
//! Every failure is local to a single run: nothing is retried, and a run
//! either produces a full snapshot or aborts before persisting anything.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::report::ChangeReport;

/// Failures while validating or executing the external scan command.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScanError {
    /// Empty command or target after trimming.
    #[error("{0} cannot be empty")]
    Validation(&'static str),

    /// The scanner process could not be started at all.
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The scanner ran but exited unsuccessfully.
    #[error("scan failed: {status}\nOutput: {output}")]
    Execution { status: String, output: String },

    /// The scanner exceeded the configured time bound and was killed.
    #[error("scan timed out after {0:?}")]
    Timeout(Duration),
}

/// Failures reading or writing snapshot generations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// No snapshot has been persisted yet (first run).
    #[error("no snapshot found at {}", .0.display())]
    NotFound(PathBuf),

    /// A snapshot file exists but does not decode.
    #[error("snapshot at {} is unreadable: {source}", .path.display())]
    CorruptData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures comparing two snapshots.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CompareError {
    /// One of the snapshot timestamps is not a valid RFC 3339 instant.
    #[error("error parsing {which} scan time {value:?}: {source}")]
    TimeParse {
        which: &'static str,
        value: String,
        #[source]
        source: time::error::Parse,
    },
}

/// Failures of the load → compare → save cycle.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Compare(#[from] CompareError),

    /// Ports changed but the new snapshot could not be saved. The report is
    /// kept so the changes can still be shown.
    #[error("failed to save snapshot: {source}")]
    Persist {
        report: Box<ChangeReport>,
        #[source]
        source: StoreError,
    },
}
