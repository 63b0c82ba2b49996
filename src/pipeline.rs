use std::time::Duration;
use tracing::info;

use crate::error::{CycleError, ScanError, StoreError};
use crate::parser::parse_scan_output;
use crate::progress::with_spinner;
use crate::report::{compare_and_save, ChangeReport};
use crate::runner::ScanCommand;
use crate::store::SnapshotStore;
use crate::types::Snapshot;

/// Settings for one scan cycle.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Kill the scanner after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Animate a spinner on stderr while the scanner runs.
    pub spinner: bool,
}

/// What a cycle did with the fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No prior snapshot existed; the new one was saved as the baseline.
    Baseline,
    /// Nothing changed; the stored snapshot was left alone.
    Unchanged(ChangeReport),
    /// Ports changed; the new snapshot replaced the stored one.
    Changed(ChangeReport),
}

impl CycleOutcome {
    pub fn report(&self) -> Option<&ChangeReport> {
        match self {
            CycleOutcome::Baseline => None,
            CycleOutcome::Unchanged(r) | CycleOutcome::Changed(r) => Some(r),
        }
    }
}

/// Execute the scanner and turn its output into a timestamped snapshot.
pub async fn run_scan(cmd: &ScanCommand, opts: &ScanOptions) -> Result<Snapshot, ScanError> {
    let text = with_spinner(opts.spinner, "Scanning...", cmd.run(opts.timeout)).await?;
    Ok(Snapshot::now(parse_scan_output(&text)))
}

/// Compare `snapshot` against the stored one and persist as needed.
///
/// A missing prior snapshot makes this cycle the baseline. An unreadable
/// one is an error and nothing is saved.
pub fn process_snapshot(
    store: &SnapshotStore,
    snapshot: &Snapshot,
) -> Result<CycleOutcome, CycleError> {
    let previous = match store.load() {
        Ok(prev) => prev,
        Err(StoreError::NotFound(path)) => {
            info!(path = %path.display(), "no previous scan data; saving baseline");
            store.save(snapshot)?;
            return Ok(CycleOutcome::Baseline);
        }
        Err(e) => return Err(e.into()),
    };

    let report = compare_and_save(store, &previous, snapshot)?;
    if report.has_changes() {
        Ok(CycleOutcome::Changed(report))
    } else {
        Ok(CycleOutcome::Unchanged(report))
    }
}
