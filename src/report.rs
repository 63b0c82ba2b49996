//! Comparison of two snapshots and rendering of the result.
//!
//! [`compare`] is pure. [`compare_and_save`] adds the one side effect the
//! reporter owns: persisting the new snapshot when something changed.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write as _;
use time::Duration;
use tracing::{debug, info};

use crate::diff::diff_ports;
use crate::error::{CompareError, CycleError};
use crate::store::SnapshotStore;
use crate::types::{PortEntry, Snapshot};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Host is in both snapshots (or only in the new one) and its ports differ.
    Changed,
    /// Host was in the old snapshot and is missing from the new one.
    Vanished,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HostChange {
    pub host: String,
    pub kind: ChangeKind,
    pub added: Vec<PortEntry>,
    pub removed: Vec<PortEntry>,
}

/// Per-host changes between two snapshots plus totals.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChangeReport {
    pub previous_at: String,
    pub current_at: String,
    /// Whole seconds between the two capture instants.
    pub elapsed_seconds: i64,
    pub hosts: Vec<HostChange>,
    pub total_added: usize,
    pub total_removed: usize,
}

impl ChangeReport {
    pub fn has_changes(&self) -> bool {
        !self.hosts.is_empty()
    }

    pub fn elapsed(&self) -> Duration {
        Duration::seconds(self.elapsed_seconds)
    }

    /// `N new ports added, M removed`
    pub fn summary_line(&self) -> String {
        format!(
            "{} new ports added, {} removed",
            self.total_added, self.total_removed
        )
    }

    /// Console form of the report. `color` wraps additions in green and
    /// removals in red.
    pub fn render(&self, color: bool) -> String {
        let added = |e: &PortEntry| {
            if color {
                e.to_string().green().to_string()
            } else {
                e.to_string()
            }
        };
        let removed = |e: &PortEntry| {
            if color {
                e.to_string().red().to_string()
            } else {
                e.to_string()
            }
        };
        let mut out = String::new();
        let _ = writeln!(
            out,
            "\n--- Checking Previous Scan Data (Last scan was {} ago) ---\n",
            format_elapsed(self.elapsed())
        );

        for change in &self.hosts {
            match change.kind {
                ChangeKind::Changed => {
                    let _ = writeln!(out, "Changes for {}:", change.host);
                    if !change.added.is_empty() {
                        let _ = writeln!(out, "  [+] Added Ports:");
                        for entry in &change.added {
                            let _ = writeln!(out, "    - {}", added(entry));
                        }
                    }
                    if !change.removed.is_empty() {
                        let _ = writeln!(out, "  [-] Removed Ports:");
                        for entry in &change.removed {
                            let _ = writeln!(out, "    - {}", removed(entry));
                        }
                    }
                }
                ChangeKind::Vanished => {
                    let _ = writeln!(out, "All ports for {} removed:", change.host);
                    for entry in &change.removed {
                        let _ = writeln!(out, "  [-] {}", removed(entry));
                    }
                }
            }
            out.push('\n');
        }

        if self.has_changes() {
            let _ = writeln!(out, "Summary: {}.", self.summary_line());
        } else {
            let _ = writeln!(out, "No changes detected.");
        }
        out
    }
}

/// Compare `old` against `new` host by host.
///
/// Hosts only in `new` show all their entries as added. Hosts only in `old`
/// are reported as vanished with all their entries removed, even if the old
/// list was empty.
pub fn compare(old: &Snapshot, new: &Snapshot) -> Result<ChangeReport, CompareError> {
    let old_at = old.captured_at_for("old")?;
    let new_at = new.captured_at_for("new")?;
    let elapsed = new_at - old_at;

    let mut hosts = Vec::new();
    for (host, new_entries) in &new.host_ports {
        let old_entries = old.host_ports.get(host).map(Vec::as_slice).unwrap_or(&[]);
        let diff = diff_ports(old_entries, new_entries);
        if !diff.is_empty() {
            hosts.push(HostChange {
                host: host.clone(),
                kind: ChangeKind::Changed,
                added: diff.added,
                removed: diff.removed,
            });
        }
    }
    for (host, old_entries) in &old.host_ports {
        if !new.host_ports.contains_key(host) {
            hosts.push(HostChange {
                host: host.clone(),
                kind: ChangeKind::Vanished,
                added: Vec::new(),
                removed: diff_ports(old_entries, &[]).removed,
            });
        }
    }

    let total_added = hosts.iter().map(|h| h.added.len()).sum();
    let total_removed = hosts.iter().map(|h| h.removed.len()).sum();
    debug!(hosts = hosts.len(), total_added, total_removed, "compared snapshots");

    Ok(ChangeReport {
        previous_at: old.captured_at.clone(),
        current_at: new.captured_at.clone(),
        elapsed_seconds: elapsed.whole_seconds(),
        hosts,
        total_added,
        total_removed,
    })
}

/// [`compare`], then save `new` as the current generation iff it differs.
///
/// A failed save hands the report back inside [`CycleError::Persist`] so the
/// changes can still be shown.
pub fn compare_and_save(
    store: &SnapshotStore,
    old: &Snapshot,
    new: &Snapshot,
) -> Result<ChangeReport, CycleError> {
    let report = compare(old, new)?;
    if report.has_changes() {
        if let Err(source) = store.save(new) {
            return Err(CycleError::Persist {
                report: Box::new(report),
                source,
            });
        }
    } else {
        info!("no port changes; snapshot not saved");
    }
    Ok(report)
}

/// Lossy elapsed-time text: `D days, H hours`, `H hours, M minutes` or
/// `M minutes`. Seconds are dropped.
pub fn format_elapsed(d: Duration) -> String {
    let hours = d.whole_hours();
    let minutes = d.whole_minutes() % 60;
    let days = hours / 24;

    if days > 0 {
        format!("{} days, {} hours", days, hours % 24)
    } else if hours > 0 {
        format!("{} hours, {} minutes", hours, minutes)
    } else {
        format!("{} minutes", minutes)
    }
}
