//! Persisted container metadata records.
//!
//! One JSON file per container under the layout's state directory;
//! plain key-value persistence with no format guarantees beyond what
//! this runtime itself reads back.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use carton_common::config::Layout;
use carton_common::error::{CartonError, Result};
use carton_common::types::{ContainerId, ContainerState};

/// Metadata persisted for one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Container identifier.
    pub id: ContainerId,
    /// Human-readable name.
    pub name: String,
    /// PID of the container's process, while it runs.
    pub pid: Option<u32>,
    /// Command executed inside the container.
    pub command: Vec<String>,
    /// Lifecycle state at last save.
    pub status: ContainerState,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// Raw `host:container` volume specification, if one was given.
    pub volume: Option<String>,
}

impl ContainerRecord {
    /// Creates a record in the `Created` state, timestamped now.
    #[must_use]
    pub fn new(id: ContainerId, name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            id,
            name: name.into(),
            pid: None,
            command,
            status: ContainerState::Created,
            created_at: Utc::now().to_rfc3339(),
            volume: None,
        }
    }
}

/// Reads and writes container records under a [`Layout`].
#[derive(Debug, Clone)]
pub struct RecordStore {
    layout: Layout,
}

impl RecordStore {
    /// Creates a store over the given layout.
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Persists a record, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory or file cannot be written.
    pub fn save(&self, record: &ContainerRecord) -> Result<()> {
        let dir = self.layout.record_dir(&record.id);
        std::fs::create_dir_all(&dir).map_err(|e| CartonError::Io {
            path: dir,
            source: e,
        })?;
        let file = self.layout.record_file(&record.id);
        let json = serde_json::to_vec_pretty(record)?;
        std::fs::write(&file, json).map_err(|e| CartonError::Io {
            path: file,
            source: e,
        })?;
        tracing::debug!(id = %record.id, "container record saved");
        Ok(())
    }

    /// Loads the record for `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no record exists, or a deserialization
    /// error for a corrupt one.
    pub fn load(&self, id: &ContainerId) -> Result<ContainerRecord> {
        let file = self.layout.record_file(id);
        let data = std::fs::read(&file).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CartonError::NotFound {
                    kind: "container record",
                    id: id.to_string(),
                }
            } else {
                CartonError::Io { path: file.clone(), source: e }
            }
        })?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Deletes the record directory for `id`; absent records are a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when an existing record directory cannot be
    /// removed.
    pub fn delete(&self, id: &ContainerId) -> Result<()> {
        let dir = self.layout.record_dir(id);
        if !dir.exists() {
            return Ok(());
        }
        std::fs::remove_dir_all(&dir).map_err(|e| CartonError::Io {
            path: dir,
            source: e,
        })
    }

    /// Lists all persisted records, skipping unreadable entries.
    ///
    /// # Errors
    ///
    /// Returns an error when the state directory exists but cannot be
    /// read.
    pub fn list(&self) -> Result<Vec<ContainerRecord>> {
        let state_dir = &self.layout.state_dir;
        if !state_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(state_dir).map_err(|e| CartonError::Io {
            path: state_dir.clone(),
            source: e,
        })?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let id = ContainerId::new(entry.file_name().to_string_lossy().into_owned());
            match self.load(&id) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "skipping unreadable record");
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &std::path::Path) -> RecordStore {
        RecordStore::new(Layout::rooted_at(dir))
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let mut record = ContainerRecord::new(
            ContainerId::new("c1"),
            "web",
            vec!["/bin/sh".into(), "-c".into(), "true".into()],
        );
        record.pid = Some(1234);
        record.volume = Some("/data:/mnt".into());

        store.save(&record).expect("save");
        let loaded = store.load(&record.id).expect("load");
        assert_eq!(loaded, record);
    }

    #[test]
    fn load_missing_record_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = store(dir.path()).load(&ContainerId::new("ghost"));
        assert!(matches!(result, Err(CartonError::NotFound { .. })));
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let record = ContainerRecord::new(ContainerId::new("c1"), "web", vec![]);
        store.save(&record).expect("save");

        store.delete(&record.id).expect("delete existing");
        store.delete(&record.id).expect("delete absent");
        assert!(matches!(
            store.load(&record.id),
            Err(CartonError::NotFound { .. })
        ));
    }

    #[test]
    fn list_returns_all_saved_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        for name in ["a", "b", "c"] {
            let record = ContainerRecord::new(ContainerId::new(name), name, vec![]);
            store.save(&record).expect("save");
        }
        let mut names: Vec<String> = store
            .list()
            .expect("list")
            .into_iter()
            .map(|r| r.name)
            .collect();
        names.sort();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
