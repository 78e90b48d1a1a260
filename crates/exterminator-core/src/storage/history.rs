use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Error;
use crate::identity::ApplicationIdentity;
use crate::model::{DeletionOutcome, DeletionRecord};

/// Deletion history kept as a JSON array, most recent first.
pub struct HistoryStore {
    path: PathBuf,
    records: Mutex<Vec<DeletionRecord>>,
}

impl HistoryStore {
    /// A missing file is an empty history.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let records = if path.exists() {
            let data = fs::read_to_string(&path)?;
            if data.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&data)?
            }
        } else {
            Vec::new()
        };
        debug!("Loaded {} history records from {}", records.len(), path.display());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: DeletionRecord) -> Result<(), Error> {
        let mut records = self.lock();
        records.insert(0, record);
        self.persist(&records)
    }

    /// Build a record from a finished deletion and store it.
    ///
    /// Nothing is stored when no file was deleted.
    pub fn create_record(
        &self,
        identity: &ApplicationIdentity,
        outcome: &DeletionOutcome,
    ) -> Result<Option<DeletionRecord>, Error> {
        if outcome.succeeded.is_empty() {
            return Ok(None);
        }
        let record = DeletionRecord::from_outcome(identity, outcome);
        self.append(record.clone())?;
        info!(
            "Recorded deletion {} of {} ({} files)",
            record.id,
            record.app_display_name,
            record.file_count()
        );
        Ok(Some(record))
    }

    pub fn all(&self) -> Vec<DeletionRecord> {
        self.lock().clone()
    }

    pub fn get(&self, id: Uuid) -> Option<DeletionRecord> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    pub fn most_recent(&self) -> Option<DeletionRecord> {
        self.lock().first().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns whether a record with `id` existed.
    pub fn remove(&self, id: Uuid) -> Result<bool, Error> {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.persist(&records)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), Error> {
        let mut records = self.lock();
        records.clear();
        self.persist(&records)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DeletionRecord>> {
        // Mutations persist before the guard drops.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, records: &[DeletionRecord]) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Wrote {} history records to {}", records.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeletedFileDescriptor, DiscoveredFile, FileCategory};
    use chrono::Utc;

    fn record(name: &str) -> DeletionRecord {
        DeletionRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            app_display_name: name.to_string(),
            bundle_identifier: format!("com.acme.{}", name.to_lowercase()),
            deleted_files: vec![DeletedFileDescriptor::new(
                "/Users/me/Library/Caches/x",
                FileCategory::Caches,
                42,
            )],
        }
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(dir.path().join("nested/history.json")).unwrap();
        assert!(store.is_empty());
        assert!(store.most_recent().is_none());
    }

    #[test]
    fn test_append_is_most_recent_first_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/history.json");
        let store = HistoryStore::load(&path).unwrap();

        let first = record("Widget");
        let second = record("Gadget");
        store.append(first.clone()).unwrap();
        store.append(second.clone()).unwrap();
        assert_eq!(store.most_recent().unwrap().id, second.id);

        let reloaded = HistoryStore::load(&path).unwrap();
        assert_eq!(reloaded.all(), vec![second, first]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(dir.path().join("history.json")).unwrap();
        let a = record("A");
        let b = record("B");
        store.append(a.clone()).unwrap();
        store.append(b.clone()).unwrap();

        assert!(store.remove(a.id).unwrap());
        assert!(!store.remove(a.id).unwrap());
        assert!(store.get(a.id).is_none());
        assert_eq!(store.get(b.id).unwrap().app_display_name, "B");

        store.clear().unwrap();
        assert!(HistoryStore::load(store.path()).unwrap().is_empty());
    }

    #[test]
    fn test_create_record_skips_empty_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(dir.path().join("history.json")).unwrap();
        let identity = ApplicationIdentity::new("/Applications/Widget.app", "Widget", "com.acme.widget");

        assert!(store
            .create_record(&identity, &DeletionOutcome::default())
            .unwrap()
            .is_none());

        let outcome = DeletionOutcome {
            succeeded: vec![DiscoveredFile::new("/c/widget", FileCategory::Caches, 7, false)],
            ..Default::default()
        };
        let created = store.create_record(&identity, &outcome).unwrap().unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(created.total_size_reclaimed(), 7);
    }
}
