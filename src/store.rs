//! Durable keyed storage for workflow records.
//!
//! Records are stored as pretty-printed JSON files in a single directory,
//! one file per workflow id. Writes go through a temp file and an atomic
//! rename so readers never observe a partial record. There is no
//! cross-instance locking: concurrent writers to the same id are
//! last-write-wins, an accepted limitation under the single-operator
//! assumption.

use std::path::PathBuf;

use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;
use crate::workflow::record::{WorkflowRecord, WorkflowSummary};

/// File-backed store for [`WorkflowRecord`]s.
pub struct StateStore {
    /// Directory holding one `<id>.json` file per workflow.
    base_path: PathBuf,
}

impl StateStore {
    /// Creates a store rooted at `base_path`. The directory is created
    /// lazily on first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Returns the base storage path.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    /// Ensures the storage directory exists.
    async fn ensure_directory(&self) -> Result<(), StoreError> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path).await.map_err(|e| {
                StoreError::DirectoryCreationFailed(format!(
                    "Failed to create directory {:?}: {}",
                    self.base_path, e
                ))
            })?;
        }
        Ok(())
    }

    /// Writes or overwrites the full record by id, bumping `updated_at`.
    ///
    /// The record becomes visible to readers atomically: the JSON is
    /// written to a temp file which is then renamed over the target.
    ///
    /// Returns the path where the record was written.
    pub async fn put(&self, record: &mut WorkflowRecord) -> Result<PathBuf, StoreError> {
        self.ensure_directory().await?;

        record.updated_at = Utc::now();

        let path = self.record_path(&record.id);
        let tmp_path = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(record)?;

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &path).await?;

        Ok(path)
    }

    /// Loads the record for `id`, or [`StoreError::NotFound`].
    pub async fn get(&self, id: &str) -> Result<WorkflowRecord, StoreError> {
        let path = self.record_path(id);

        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let record: WorkflowRecord = serde_json::from_str(&contents)?;
        Ok(record)
    }

    /// Lists summaries of all stored workflows, newest `updated_at` first.
    ///
    /// Files that fail to parse are skipped with a warning rather than
    /// failing the whole listing.
    pub async fn list(&self) -> Result<Vec<WorkflowSummary>, StoreError> {
        self.ensure_directory().await?;

        let mut summaries = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match fs::read_to_string(&path).await {
                Ok(contents) => match serde_json::from_str::<WorkflowRecord>(&contents) {
                    Ok(record) => summaries.push(record.summary()),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable workflow record");
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable workflow file");
                }
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(summaries)
    }

    /// Deletes the record for `id` if present; missing records are a no-op.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.record_path(id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Returns true if a record exists for `id`.
    pub fn exists(&self, id: &str) -> bool {
        self.record_path(id).exists()
    }

    /// Returns the file path for a workflow id.
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::record::{Stage, Status};
    use tempfile::TempDir;

    fn create_test_record(niche: &str) -> WorkflowRecord {
        WorkflowRecord::new(niche, "keyword")
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = StateStore::new(temp_dir.path());

        let mut record = create_test_record("cooking");
        record.status = Status::WaitingForSelection;
        record.current_stage = Stage::WaitingForSelection;
        let before = record.updated_at;

        let path = store.put(&mut record).await.expect("put should succeed");
        assert!(path.exists());

        let loaded = store.get(&record.id).await.expect("get should succeed");
        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.niche, "cooking");
        assert_eq!(loaded.status, Status::WaitingForSelection);
        assert_eq!(loaded.created_at, record.created_at);
        // put bumps updated_at; everything else round-trips untouched.
        assert!(loaded.updated_at >= before);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = StateStore::new(temp_dir.path());

        let result = store.get("no-such-id").await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_put_overwrites_existing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = StateStore::new(temp_dir.path());

        let mut record = create_test_record("fitness");
        store.put(&mut record).await.expect("put should succeed");

        record.status = Status::Failed;
        record.error_message = Some("boom".to_string());
        store.put(&mut record).await.expect("put should succeed");

        let loaded = store.get(&record.id).await.expect("get should succeed");
        assert_eq!(loaded.status, Status::Failed);
        assert_eq!(loaded.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_list_ordered_by_updated_at_desc() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = StateStore::new(temp_dir.path());

        let mut first = create_test_record("a");
        let mut second = create_test_record("b");
        let mut third = create_test_record("c");

        store.put(&mut first).await.expect("put should succeed");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.put(&mut second).await.expect("put should succeed");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.put(&mut third).await.expect("put should succeed");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        // Touching the first record again moves it to the front.
        store.put(&mut first).await.expect("put should succeed");

        let summaries = store.list().await.expect("list should succeed");
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].id, first.id);
        assert_eq!(summaries[1].id, third.id);
        assert_eq!(summaries[2].id, second.id);
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = StateStore::new(temp_dir.path());

        let mut record = create_test_record("a");
        store.put(&mut record).await.expect("put should succeed");

        tokio::fs::write(temp_dir.path().join("garbage.json"), b"not json")
            .await
            .expect("write should succeed");

        let summaries = store.list().await.expect("list should succeed");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, record.id);
    }

    #[tokio::test]
    async fn test_delete_removes_and_missing_is_noop() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = StateStore::new(temp_dir.path());

        let mut record = create_test_record("a");
        store.put(&mut record).await.expect("put should succeed");
        assert!(store.exists(&record.id));

        store.delete(&record.id).await.expect("delete should succeed");
        assert!(!store.exists(&record.id));

        // Deleting again is not an error.
        store.delete(&record.id).await.expect("delete should be a no-op");
    }

    #[tokio::test]
    async fn test_creates_directory_on_first_write() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let nested = temp_dir.path().join("nested").join("state");
        assert!(!nested.exists());

        let store = StateStore::new(&nested);
        let mut record = create_test_record("a");
        store.put(&mut record).await.expect("put should succeed");

        assert!(nested.exists());
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = StateStore::new(temp_dir.path());

        let mut record = create_test_record("a");
        store.put(&mut record).await.expect("put should succeed");

        let mut entries = tokio::fs::read_dir(temp_dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
    }
}
