//! Local filesystem storage implementation.
//!
//! Each store is a JSON file rewritten in full on every append. Writes go to
//! a temporary sibling that is synced and then renamed over the original, and
//! the directory is synced after the rename, so a crash leaves either the old
//! or the new file, never a partial one.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── matched.json
//! ├── unmatched.json
//! └── all.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::{Record, StoreId, StoredRecord};
use crate::storage::{AppendOutcome, RecordStorage, StoreFile};

/// Local filesystem storage backend.
#[derive(Debug)]
pub struct LocalStorage {
    root_dir: PathBuf,
    matched: Mutex<()>,
    unmatched: Mutex<()>,
    all: Mutex<()>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    ///
    /// The directory is created on the first append.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            matched: Mutex::new(()),
            unmatched: Mutex::new(()),
            all: Mutex::new(()),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path of a store file.
    pub fn path(&self, store: StoreId) -> PathBuf {
        self.root_dir.join(store.file_name())
    }

    /// Serializes read-modify-write sequences per store.
    fn lock(&self, store: StoreId) -> &Mutex<()> {
        match store {
            StoreId::Matched => &self.matched,
            StoreId::Unmatched => &self.unmatched,
            StoreId::All => &self.all,
        }
    }

    /// Read a store file. A missing file is an empty store.
    async fn read_store(&self, store: StoreId) -> Result<StoreFile, StoreError> {
        let path = self.path(store);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreFile::default()),
            Err(e) => {
                return Err(StoreError::Unreadable {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Write a store file atomically (write to temp, sync, then rename).
    async fn write_store(&self, store: StoreId, data: &StoreFile) -> Result<(), StoreError> {
        let path = self.path(store);
        let unwritable = |source: std::io::Error| StoreError::Unwritable {
            path: path.display().to_string(),
            source,
        };

        let bytes = serde_json::to_vec_pretty(data).map_err(|e| {
            unwritable(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        tokio::fs::create_dir_all(&self.root_dir)
            .await
            .map_err(unwritable)?;

        let tmp = path.with_extension("json.tmp");
        let result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(unwritable(e));
        }

        sync_dir(&self.root_dir).await.map_err(unwritable)
    }
}

/// Persist the directory entry created by the rename.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl RecordStorage for LocalStorage {
    async fn contains(&self, store: StoreId, link: &str) -> Result<bool, StoreError> {
        let _guard = self.lock(store).lock().await;
        Ok(self.read_store(store).await?.contains(link))
    }

    async fn append(&self, store: StoreId, record: &Record) -> Result<AppendOutcome, StoreError> {
        let _guard = self.lock(store).lock().await;

        let mut data = self.read_store(store).await?;
        if data.contains(&record.link) {
            log::debug!("{} already holds {}", store, record.link);
            return Ok(AppendOutcome::AlreadyPresent);
        }

        let now = Utc::now();
        data.records.push(StoredRecord {
            index: data.next_index(),
            title: record.title.clone(),
            link: record.link.clone(),
            first_seen: now,
        });
        data.count = data.records.len();
        data.updated_at = now;

        self.write_store(store, &data).await?;
        log::debug!("Saved to {}: {}", store, record.title);
        Ok(AppendOutcome::Inserted)
    }

    async fn load(&self, store: StoreId) -> Result<Vec<StoredRecord>, StoreError> {
        let _guard = self.lock(store).lock().await;
        Ok(self.read_store(store).await?.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(title: &str, link: &str) -> Record {
        Record {
            title: title.to_string(),
            link: link.to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_store_is_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.load(StoreId::All).await.unwrap().is_empty());
        assert!(!storage.contains(StoreId::All, "https://x").await.unwrap());
    }

    #[tokio::test]
    async fn test_append_is_idempotent_by_link() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let r = record("Budowa drogi", "https://example.com/1");

        assert_eq!(
            storage.append(StoreId::Matched, &r).await.unwrap(),
            AppendOutcome::Inserted
        );
        let after_first = tokio::fs::read(storage.path(StoreId::Matched)).await.unwrap();

        assert_eq!(
            storage.append(StoreId::Matched, &r).await.unwrap(),
            AppendOutcome::AlreadyPresent
        );
        let after_second = tokio::fs::read(storage.path(StoreId::Matched)).await.unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(storage.load(StoreId::Matched).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_first_seen_title_wins() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage
            .append(StoreId::All, &record("Original title", "https://example.com/1"))
            .await
            .unwrap();
        storage
            .append(StoreId::All, &record("Edited title", "https://example.com/1"))
            .await
            .unwrap();

        let records = storage.load(StoreId::All).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Original title");
    }

    #[tokio::test]
    async fn test_indexes_increment_and_persist() {
        let tmp = TempDir::new().unwrap();
        {
            let storage = LocalStorage::new(tmp.path());
            for i in 0..3 {
                storage
                    .append(StoreId::All, &record("t", &format!("https://example.com/{i}")))
                    .await
                    .unwrap();
            }
        }

        let reopened = LocalStorage::new(tmp.path());
        let records = reopened.load(StoreId::All).await.unwrap();
        let indexes: Vec<u64> = records.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert!(reopened.contains(StoreId::All, "https://example.com/2").await.unwrap());
    }

    #[tokio::test]
    async fn test_stores_are_independent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let r = record("Remont", "https://example.com/r");

        storage.append(StoreId::Unmatched, &r).await.unwrap();

        assert!(storage.contains(StoreId::Unmatched, &r.link).await.unwrap());
        assert!(!storage.contains(StoreId::Matched, &r.link).await.unwrap());
        assert!(!storage.path(StoreId::Matched).exists());
    }

    #[tokio::test]
    async fn test_malformed_store_is_reported_and_left_alone() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let path = storage.path(StoreId::Matched);
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let err = storage
            .append(StoreId::Matched, &record("t", "https://example.com/1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));

        let content = tokio::fs::read(&path).await.unwrap();
        assert_eq!(content, b"{ not json");
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage
            .append(StoreId::All, &record("t", "https://example.com/1"))
            .await
            .unwrap();

        let mut entries = tokio::fs::read_dir(tmp.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["all.json".to_string()]);
    }

    #[tokio::test]
    async fn test_append_creates_nested_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("data/stores");
        let storage = LocalStorage::new(&root);

        storage
            .append(StoreId::Matched, &record("Budowa drogi", "https://example.com/1"))
            .await
            .unwrap();

        assert!(root.join("matched.json").is_file());
        assert!(!root.join("matched.json.tmp").exists());
        let reopened = LocalStorage::new(&root);
        assert_eq!(reopened.load(StoreId::Matched).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_root_is_reported() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        tokio::fs::write(&blocker, b"file, not a directory").await.unwrap();
        let storage = LocalStorage::new(blocker.join("data"));

        let err = storage
            .append(StoreId::All, &record("t", "https://example.com/1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Unwritable { .. } | StoreError::Unreadable { .. }
        ));
    }
}
