use super::backend::{BackendLock, StorageBackend};
use super::{APPLICABILITY_TABLE, DEFINITIONS_TABLE, SEQUENCES_TABLE};
use crate::error::{EavError, Result};
use crate::model::{Applicability, AttributeDefinition, Sequence, ValueRecord};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const DEFINITIONS_FILE: &str = "attributes.json";
const APPLICABILITY_FILE: &str = "attribute_entity.json";
const SEQUENCES_FILE: &str = "attribute_sequences.json";
const LOCK_FILE: &str = ".lock";

/// Filesystem backend: one JSON file per table under `root`.
///
/// ```text
/// <root>/
/// ├── attributes.json
/// ├── attribute_entity.json
/// ├── attribute_sequences.json
/// ├── attribute_<kind>_values.json
/// └── .lock                  # advisory lock held by the current writer
/// ```
///
/// Every handle on the same directory, in this process or another, takes the
/// `.lock` file exclusively for the length of a write unit.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(EavError::Io)?;
        }
        Ok(())
    }

    fn table_file(table: &str) -> Result<String> {
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
        let reserved = [DEFINITIONS_TABLE, APPLICABILITY_TABLE, SEQUENCES_TABLE].contains(&table);
        if !valid || reserved {
            return Err(EavError::Store(format!("Invalid table name '{}'", table)));
        }
        Ok(format!("{}.json", table))
    }

    fn load_file<T: DeserializeOwned>(&self, file_name: &str) -> Result<Vec<T>> {
        let path = self.root.join(file_name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path).map_err(EavError::Io)?;
        let rows: Vec<T> = serde_json::from_str(&content).map_err(EavError::Serialization)?;
        Ok(rows)
    }

    fn save_file<T: Serialize>(&self, file_name: &str, rows: &[T]) -> Result<()> {
        self.ensure_dir()?;

        let target = self.root.join(file_name);
        let content = serde_json::to_string_pretty(rows).map_err(EavError::Serialization)?;

        // Atomic write: readers only ever see a complete file
        let tmp_file = self.root.join(format!(".table-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_file, content).map_err(EavError::Io)?;
        fs::rename(&tmp_file, &target).map_err(EavError::Io)?;

        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn lock(&self) -> Result<BackendLock> {
        self.ensure_dir()?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.root.join(LOCK_FILE))
            .map_err(EavError::Io)?;
        file.lock_exclusive().map_err(EavError::Io)?;
        Ok(BackendLock::file(file))
    }

    fn load_definitions(&self) -> Result<Vec<AttributeDefinition>> {
        self.load_file(DEFINITIONS_FILE)
    }

    fn save_definitions(&self, definitions: &[AttributeDefinition]) -> Result<()> {
        self.save_file(DEFINITIONS_FILE, definitions)
    }

    fn load_applicability(&self) -> Result<Vec<Applicability>> {
        self.load_file(APPLICABILITY_FILE)
    }

    fn save_applicability(&self, rows: &[Applicability]) -> Result<()> {
        self.save_file(APPLICABILITY_FILE, rows)
    }

    fn load_sequences(&self) -> Result<Vec<Sequence>> {
        self.load_file(SEQUENCES_FILE)
    }

    fn save_sequences(&self, sequences: &[Sequence]) -> Result<()> {
        self.save_file(SEQUENCES_FILE, sequences)
    }

    fn load_values(&self, table: &str) -> Result<Vec<ValueRecord>> {
        self.load_file(&Self::table_file(table)?)
    }

    fn save_values(&self, table: &str, rows: &[ValueRecord]) -> Result<()> {
        self.save_file(&Self::table_file(table)?, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;
    use chrono::Utc;
    use tempfile::TempDir;

    fn row(id: u64, content: Content) -> ValueRecord {
        ValueRecord {
            id,
            content,
            attribute_id: 1,
            owner_id: 10,
            owner_type: "Post".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_files_load_empty() {
        let temp = TempDir::new().unwrap();
        let backend = FsBackend::new(temp.path().join("eav"));
        assert!(backend.load_definitions().unwrap().is_empty());
        assert!(backend.load_applicability().unwrap().is_empty());
        assert!(backend.load_values("attribute_text_values").unwrap().is_empty());
    }

    #[test]
    fn test_values_persist_across_instances() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("eav");

        let backend = FsBackend::new(root.clone());
        backend
            .save_values(
                "attribute_integer_values",
                &[row(1, Content::Integer(42)), row(2, Content::Integer(7))],
            )
            .unwrap();

        let reopened = FsBackend::new(root.clone());
        let rows = reopened.load_values("attribute_integer_values").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].content, Content::Integer(42));
        assert!(root.join("attribute_integer_values.json").exists());
    }

    #[test]
    fn test_no_tmp_files_left_behind() {
        let temp = TempDir::new().unwrap();
        let backend = FsBackend::new(temp.path().to_path_buf());
        backend.save_applicability(&[]).unwrap();
        backend.save_definitions(&[]).unwrap();

        let leftovers = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_rejects_path_like_table_names() {
        let temp = TempDir::new().unwrap();
        let backend = FsBackend::new(temp.path().to_path_buf());
        assert!(matches!(
            backend.load_values("../escape"),
            Err(EavError::Store(_))
        ));
        assert!(backend.save_values("", &[]).is_err());
    }

    #[test]
    fn test_rejects_reserved_table_names() {
        let temp = TempDir::new().unwrap();
        let backend = FsBackend::new(temp.path().to_path_buf());
        for table in [DEFINITIONS_TABLE, APPLICABILITY_TABLE, SEQUENCES_TABLE] {
            assert!(backend.save_values(table, &[]).is_err(), "{} accepted", table);
        }
    }

    #[test]
    fn test_lock_excludes_other_handles() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::Duration;

        let temp = TempDir::new().unwrap();
        let first = FsBackend::new(temp.path().to_path_buf());
        let second = FsBackend::new(temp.path().to_path_buf());
        let released = AtomicBool::new(false);

        let guard = first.lock().unwrap();
        std::thread::scope(|s| {
            let waiter = s.spawn(|| {
                let _guard = second.lock().unwrap();
                released.load(Ordering::SeqCst)
            });
            std::thread::sleep(Duration::from_millis(100));
            released.store(true, Ordering::SeqCst);
            drop(guard);
            // the second handle only got the lock after the first let go
            assert!(waiter.join().unwrap());
        });
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(DEFINITIONS_FILE), "not json").unwrap();
        let backend = FsBackend::new(temp.path().to_path_buf());
        assert!(matches!(
            backend.load_definitions(),
            Err(EavError::Serialization(_))
        ));
    }
}
