//! # Storage Layer
//!
//! The storage layer persists three kinds of tables: attribute definitions,
//! the applicability index, and one value table per content kind. It is split
//! in two:
//!
//! - [`backend::StorageBackend`]: raw whole-table load/save. Knows nothing
//!   about ids, constraints, or cascades.
//! - [`Storage`]: owns a backend plus the write lock. Every mutation in the
//!   crate runs inside [`Storage::write`], which makes load-check-save
//!   sequences (uniqueness checks, applicability replacement, id assignment)
//!   a single unit with respect to other writers.
//!
//! [`Storage::write`] also takes [`backend::StorageBackend::lock`], so two
//! handles on the same data directory (two processes, or two APIs in one
//! process) serialize their write units as well.
//!
//! Readers never take the write lock. Because each save swaps a full table,
//! a reader observes either the table before a write or after it.
//!
//! ## Implementations
//!
//! - [`mem_backend::MemBackend`]: `RwLock`-guarded tables, used by tests and
//!   by embedders that own persistence elsewhere.
//! - [`fs_backend::FsBackend`]: JSON files written atomically (tmp + rename).
//!
//! ## Storage Layout (filesystem)
//!
//! ```text
//! <data_dir>/
//! ├── attributes.json                 # AttributeDefinition rows
//! ├── attribute_entity.json           # (attribute_id, owner_type) rows
//! ├── attribute_sequences.json        # highest id issued per table
//! ├── attribute_boolean_values.json
//! ├── attribute_datetime_values.json
//! ├── attribute_integer_values.json
//! ├── attribute_text_values.json
//! └── attribute_varchar_values.json
//! ```

use crate::error::{EavError, Result};
use crate::model::Sequence;
use std::sync::Mutex;

pub mod backend;
pub mod fs;
pub mod fs_backend;
pub mod mem_backend;
pub mod memory;

use backend::StorageBackend;

/// Table names for the fixed tables, as used by sequences and fault injection.
pub const DEFINITIONS_TABLE: &str = "attributes";
pub const APPLICABILITY_TABLE: &str = "attribute_entity";
pub const SEQUENCES_TABLE: &str = "attribute_sequences";

pub struct Storage<B: StorageBackend> {
    backend: B,
    write_lock: Mutex<()>,
}

impl<B: StorageBackend> Storage<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Read-only access to the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run `f` as one unit of work, serialized against every other writer.
    pub fn write<T>(&self, f: impl FnOnce(&B) -> Result<T>) -> Result<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| EavError::Store("write lock poisoned".to_string()))?;
        let _lock = self.backend.lock()?;
        f(&self.backend)
    }
}

/// Issue the next surrogate id for `table` and record it as the high-water
/// mark. Ids are never reused, even after the rows holding them are deleted.
///
/// Must run inside [`Storage::write`].
pub(crate) fn allocate_id<B: StorageBackend + ?Sized>(
    backend: &B,
    table: &str,
    ids: impl Iterator<Item = u64>,
) -> Result<u64> {
    let mut sequences = backend.load_sequences()?;
    let in_use = ids.max().unwrap_or(0);
    let id = match sequences.iter_mut().find(|s| s.table == table) {
        Some(seq) => {
            seq.last_id = seq.last_id.max(in_use) + 1;
            seq.last_id
        }
        None => {
            sequences.push(Sequence {
                table: table.to_string(),
                last_id: in_use + 1,
            });
            in_use + 1
        }
    };
    backend.save_sequences(&sequences)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mem_backend::MemBackend;

    #[test]
    fn test_allocate_id() {
        let backend = MemBackend::new();
        assert_eq!(allocate_id(&backend, "t", std::iter::empty()).unwrap(), 1);
        assert_eq!(allocate_id(&backend, "t", [1].into_iter()).unwrap(), 2);
        // rows from before sequences existed still raise the mark
        assert_eq!(allocate_id(&backend, "t", [3, 9, 2].into_iter()).unwrap(), 10);
        assert_eq!(allocate_id(&backend, "other", std::iter::empty()).unwrap(), 1);
    }

    #[test]
    fn test_allocate_id_never_reuses_deleted_ids() {
        let backend = MemBackend::new();
        assert_eq!(allocate_id(&backend, "t", std::iter::empty()).unwrap(), 1);
        assert_eq!(allocate_id(&backend, "t", [1].into_iter()).unwrap(), 2);
        // both rows deleted
        assert_eq!(allocate_id(&backend, "t", std::iter::empty()).unwrap(), 3);
    }

    #[test]
    fn test_allocate_id_failure_keeps_mark() {
        let backend = MemBackend::new();
        allocate_id(&backend, "t", std::iter::empty()).unwrap();
        backend.set_failing_table(Some(SEQUENCES_TABLE));
        assert!(allocate_id(&backend, "t", std::iter::empty()).is_err());
        backend.set_failing_table(None);
        assert_eq!(allocate_id(&backend, "t", std::iter::empty()).unwrap(), 2);
    }

    #[test]
    fn test_write_returns_closure_result() {
        let storage = Storage::with_backend(MemBackend::new());
        let value = storage.write(|_| Ok(7)).unwrap();
        assert_eq!(value, 7);

        let err = storage
            .write(|_| -> Result<()> { Err(EavError::Store("boom".into())) })
            .unwrap_err();
        assert!(matches!(err, EavError::Store(_)));
    }

    #[test]
    fn test_writers_are_serialized() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let storage = Storage::with_backend(MemBackend::new());
        let inside = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    storage
                        .write(|_| {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            std::thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
