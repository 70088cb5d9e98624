use crate::error::Result;
use crate::model::{Applicability, AttributeDefinition, Sequence, ValueRecord};
use fs2::FileExt;
use std::fs::File;

/// Abstract interface for raw table I/O.
///
/// This trait handles the "how" of storage (filesystem vs memory), while the
/// registry and value stores handle the "what" (ids, constraints, cascades).
///
/// Every `save_*` replaces the whole table in one step: a concurrent reader
/// sees either the previous table or the new one, never a mix.
pub trait StorageBackend: Send + Sync {
    /// Exclusive lock over the underlying data, held for one write unit.
    ///
    /// Backends whose data can be reached by other handles (another process
    /// on the same directory) must block here until they are the only writer.
    fn lock(&self) -> Result<BackendLock> {
        Ok(BackendLock::none())
    }

    // --- Attribute Definitions ---

    fn load_definitions(&self) -> Result<Vec<AttributeDefinition>>;

    fn save_definitions(&self, definitions: &[AttributeDefinition]) -> Result<()>;

    // --- Applicability Index ---

    fn load_applicability(&self) -> Result<Vec<Applicability>>;

    fn save_applicability(&self, rows: &[Applicability]) -> Result<()>;

    // --- Id Sequences ---

    fn load_sequences(&self) -> Result<Vec<Sequence>>;

    fn save_sequences(&self, sequences: &[Sequence]) -> Result<()>;

    // --- Value Tables ---

    /// Load a value table. A table that was never written is empty.
    fn load_values(&self, table: &str) -> Result<Vec<ValueRecord>>;

    fn save_values(&self, table: &str, rows: &[ValueRecord]) -> Result<()>;
}

/// Guard returned by [`StorageBackend::lock`]. Releases on drop.
pub struct BackendLock {
    file: Option<File>,
}

impl BackendLock {
    /// No cross-handle lock; the in-process write mutex is enough.
    pub fn none() -> Self {
        Self { file: None }
    }

    /// Guard over a file already locked with `lock_exclusive`.
    pub fn file(file: File) -> Self {
        Self { file: Some(file) }
    }
}

impl Drop for BackendLock {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            let _ = FileExt::unlock(file);
        }
    }
}
