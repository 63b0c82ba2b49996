use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::types::Snapshot;

pub const DEFAULT_DIR: &str = "scan_data";
pub const DEFAULT_CURRENT_FILE: &str = "previous_scan.json";
pub const DEFAULT_BACKUP_FILE: &str = "previous_previous_scan.json";

/// Where the two snapshot generations live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub dir: PathBuf,
    pub current_file: String,
    pub backup_file: String,
}

impl StoreConfig {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current_file: DEFAULT_CURRENT_FILE.to_string(),
            backup_file: DEFAULT_BACKUP_FILE.to_string(),
        }
    }

    pub fn current_path(&self) -> PathBuf {
        self.dir.join(&self.current_file)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(&self.backup_file)
    }

    fn staging_path(&self) -> PathBuf {
        self.dir.join(format!("{}.tmp", self.current_file))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_dir(DEFAULT_DIR)
    }
}

/// Two-generation snapshot store: a *current* file and one *backup*.
///
/// Each save moves current → backup (dropping the older backup) and writes
/// the new snapshot as current. No deeper history is kept.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    config: StoreConfig,
}

impl SnapshotStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Read the current generation.
    pub fn load(&self) -> Result<Snapshot, StoreError> {
        read_snapshot(&self.config.current_path())
    }

    /// Read the backup generation.
    pub fn load_backup(&self) -> Result<Snapshot, StoreError> {
        read_snapshot(&self.config.backup_path())
    }

    /// Persist `snapshot` as the new current generation.
    ///
    /// The rename of current → backup completes before the new file is
    /// written. The new file is staged next to its final path and renamed
    /// into place, so a crash leaves either the old current, or the backup
    /// with no current (which loads as `NotFound`).
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let dir = &self.config.dir;
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let current = self.config.current_path();
        let backup = self.config.backup_path();
        match fs::rename(&current, &backup) {
            Ok(()) => debug!(
                from = %current.display(),
                to = %backup.display(),
                "rotated snapshot"
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&backup, e)),
        }

        let data = serde_json::to_string_pretty(snapshot).map_err(StoreError::Encode)?;
        let staging = self.config.staging_path();
        fs::write(&staging, data).map_err(|e| StoreError::io(&staging, e))?;
        fs::rename(&staging, &current).map_err(|e| StoreError::io(&current, e))?;

        info!(
            path = %current.display(),
            hosts = snapshot.host_count(),
            entries = snapshot.entry_count(),
            "saved snapshot"
        );
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
    let data = match fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_str(&data).map_err(|source| StoreError::CorruptData {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HostPorts, PortEntry};

    fn snapshot(ts: &str, port: &str) -> Snapshot {
        let mut ports = HostPorts::new();
        ports.insert("10.0.0.1".into(), vec![PortEntry::new(port, "open", "svc")]);
        Snapshot::new(ts, ports)
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = SnapshotStore::new(StoreConfig::in_dir(dir.path()));
        assert!(matches!(store.load(), Err(StoreError::NotFound(_))));
        assert!(matches!(store.load_backup(), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn save_creates_directory_and_pretty_json() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = SnapshotStore::new(StoreConfig::in_dir(dir.path().join("nested/data")));
        let snap = snapshot("2025-01-01T00:00:00Z", "80/tcp");
        store.save(&snap).unwrap();

        let text = fs::read_to_string(store.config().current_path()).unwrap();
        assert!(text.contains("\n  \"datetime\": \"2025-01-01T00:00:00Z\""));
        assert!(text.contains("80/tcp [open] (svc)"));
        assert_eq!(store.load().unwrap(), snap);
        assert!(!store.config().staging_path().exists());
    }

    #[test]
    fn garbage_is_corrupt_not_missing() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = SnapshotStore::new(StoreConfig::in_dir(dir.path()));
        fs::write(store.config().current_path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::CorruptData { .. })));

        fs::write(
            store.config().current_path(),
            r#"{"datetime":"2025-01-01T00:00:00Z","ports":{"h":["80/tcp open http"]}}"#,
        )
        .unwrap();
        assert!(matches!(store.load(), Err(StoreError::CorruptData { .. })));
    }

    #[test]
    fn interrupted_save_leaves_backup_readable() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = SnapshotStore::new(StoreConfig::in_dir(dir.path()));
        let a = snapshot("2025-01-01T00:00:00Z", "80/tcp");
        store.save(&a).unwrap();

        // rotation finished, new current never written
        fs::rename(store.config().current_path(), store.config().backup_path()).unwrap();
        assert!(matches!(store.load(), Err(StoreError::NotFound(_))));
        assert_eq!(store.load_backup().unwrap(), a);

        let c = snapshot("2025-01-03T00:00:00Z", "8080/tcp");
        store.save(&c).unwrap();
        assert_eq!(store.load().unwrap(), c);
        assert_eq!(store.load_backup().unwrap(), a);
    }

    #[test]
    fn blocked_backup_slot_names_the_backup_path() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = SnapshotStore::new(StoreConfig::in_dir(dir.path()));
        let a = snapshot("2025-01-01T00:00:00Z", "80/tcp");
        store.save(&a).unwrap();
        fs::create_dir_all(store.config().backup_path().join("x")).unwrap();

        let err = store
            .save(&snapshot("2025-01-02T00:00:00Z", "443/tcp"))
            .unwrap_err();
        match err {
            StoreError::Io { path, .. } => assert_eq!(path, store.config().backup_path()),
            other => panic!("expected io error, got {other:?}"),
        }
        assert_eq!(store.load().unwrap(), a);
    }

    #[test]
    fn custom_file_names() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = StoreConfig {
            dir: dir.path().to_path_buf(),
            current_file: "now.json".into(),
            backup_file: "before.json".into(),
        };
        let store = SnapshotStore::new(config);
        store.save(&snapshot("2025-01-01T00:00:00Z", "22/tcp")).unwrap();
        store.save(&snapshot("2025-01-02T00:00:00Z", "23/tcp")).unwrap();
        assert!(dir.path().join("now.json").exists());
        assert!(dir.path().join("before.json").exists());
    }
}
