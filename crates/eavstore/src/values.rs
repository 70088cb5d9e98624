//! # Value Stores
//!
//! A value store is the physical home of one content kind's values. All
//! stores share the same logical row shape ([`ValueRecord`]) and the same
//! capability set ([`ValueStore`]), so a single parameterized implementation,
//! [`TypedValueStore`], serves every built-in kind: only the [`ContentKind`]
//! and the table name differ.
//!
//! ## Constraints enforced on write
//!
//! - **Kind**: content must match the store's kind (`TypeMismatch`).
//! - **Well-formedness**: e.g. varchar length (`ValidationFailed`).
//! - **Referential integrity**: the attribute must exist (`ConstraintViolation`).
//! - **Cardinality**: a non-collection attribute holds at most one row per
//!   `(attribute_id, owner_id, owner_type)`. The check and the insert happen
//!   in the same write unit, so of two racing creates exactly one fails with
//!   `ConstraintViolation`.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::content::{Content, ContentKind};
use crate::error::{EavError, Result};
use crate::model::{OwnerRef, ValueFilter, ValueRecord};
use crate::store::backend::StorageBackend;
use crate::store::{allocate_id, Storage};

/// Uniform capability set of a value store.
pub trait ValueStore: Send + Sync {
    /// The content kind this store accepts.
    fn kind(&self) -> ContentKind;

    /// Name of the physical table backing this store.
    fn table(&self) -> &str;

    fn create(&self, attribute_id: u64, owner: &OwnerRef, content: Content) -> Result<ValueRecord>;

    /// Rows matching `filter`, in id (insertion) order.
    fn query(&self, filter: &ValueFilter) -> Result<Vec<ValueRecord>>;

    fn get(&self, id: u64) -> Result<Option<ValueRecord>>;

    fn update(&self, id: u64, content: Content) -> Result<ValueRecord>;

    fn delete(&self, id: u64) -> Result<()>;

    /// Remove every row of an attribute. Returns the number of rows removed.
    fn delete_by_attribute(&self, attribute_id: u64) -> Result<usize>;
}

pub struct TypedValueStore<B: StorageBackend> {
    storage: Arc<Storage<B>>,
    kind: ContentKind,
    table: String,
}

impl<B: StorageBackend> TypedValueStore<B> {
    /// Store for `kind` in its default table (`attribute_<kind>_values`).
    pub fn new(storage: Arc<Storage<B>>, kind: ContentKind) -> Self {
        Self {
            storage,
            kind,
            table: kind.table_name(),
        }
    }

    /// Store for `kind` in a custom table.
    pub fn with_table(storage: Arc<Storage<B>>, kind: ContentKind, table: impl Into<String>) -> Self {
        Self {
            storage,
            kind,
            table: table.into(),
        }
    }

    fn check_content(&self, content: &Content) -> Result<()> {
        if content.kind() != self.kind {
            return Err(EavError::TypeMismatch {
                expected: self.kind.alias().to_string(),
                found: content.kind().alias().to_string(),
            });
        }
        content.check_well_formed()
    }

    fn not_found(&self, id: u64) -> EavError {
        EavError::RecordNotFound {
            table: self.table.clone(),
            id,
        }
    }
}

impl<B: StorageBackend> ValueStore for TypedValueStore<B> {
    fn kind(&self) -> ContentKind {
        self.kind
    }

    fn table(&self) -> &str {
        &self.table
    }

    #[tracing::instrument(skip(self, content), fields(table = %self.table))]
    fn create(&self, attribute_id: u64, owner: &OwnerRef, content: Content) -> Result<ValueRecord> {
        self.check_content(&content)?;
        if owner.owner_type.trim().is_empty() {
            return Err(EavError::ValidationFailed(
                "owner type cannot be empty".to_string(),
            ));
        }

        self.storage.write(|backend| {
            let definition = backend
                .load_definitions()?
                .into_iter()
                .find(|d| d.id == attribute_id)
                .ok_or_else(|| {
                    warn!(attribute_id, "value references a missing attribute");
                    EavError::ConstraintViolation(format!(
                        "attribute {} does not exist",
                        attribute_id
                    ))
                })?;

            let mut rows = backend.load_values(&self.table)?;

            if !definition.is_collection {
                let filter = ValueFilter::for_owner(attribute_id, owner);
                if rows.iter().any(|r| filter.matches(r)) {
                    warn!(
                        attribute = %definition.slug,
                        owner_type = %owner.owner_type,
                        owner_id = owner.owner_id,
                        "duplicate value for single-valued attribute"
                    );
                    return Err(EavError::ConstraintViolation(format!(
                        "attribute '{}' already has a value for {} {}",
                        definition.slug, owner.owner_type, owner.owner_id
                    )));
                }
            }

            let id = allocate_id(backend, &self.table, rows.iter().map(|r| r.id))?;
            let now = Utc::now();
            let record = ValueRecord {
                id,
                content,
                attribute_id,
                owner_id: owner.owner_id,
                owner_type: owner.owner_type.clone(),
                created_at: now,
                updated_at: now,
            };
            rows.push(record.clone());
            backend.save_values(&self.table, &rows)?;

            debug!(id = record.id, attribute_id, "value created");
            Ok(record)
        })
    }

    fn query(&self, filter: &ValueFilter) -> Result<Vec<ValueRecord>> {
        let mut rows: Vec<ValueRecord> = self
            .storage
            .backend()
            .load_values(&self.table)?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    fn get(&self, id: u64) -> Result<Option<ValueRecord>> {
        Ok(self
            .storage
            .backend()
            .load_values(&self.table)?
            .into_iter()
            .find(|r| r.id == id))
    }

    #[tracing::instrument(skip(self, content), fields(table = %self.table))]
    fn update(&self, id: u64, content: Content) -> Result<ValueRecord> {
        self.check_content(&content)?;

        self.storage.write(|backend| {
            let mut rows = backend.load_values(&self.table)?;
            let row = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| self.not_found(id))?;
            row.content = content;
            row.updated_at = Utc::now();
            let updated = row.clone();
            backend.save_values(&self.table, &rows)?;

            debug!(id, "value updated");
            Ok(updated)
        })
    }

    #[tracing::instrument(skip(self), fields(table = %self.table))]
    fn delete(&self, id: u64) -> Result<()> {
        self.storage.write(|backend| {
            let mut rows = backend.load_values(&self.table)?;
            let before = rows.len();
            rows.retain(|r| r.id != id);
            if rows.len() == before {
                return Err(self.not_found(id));
            }
            backend.save_values(&self.table, &rows)?;

            debug!(id, "value deleted");
            Ok(())
        })
    }

    #[tracing::instrument(skip(self), fields(table = %self.table))]
    fn delete_by_attribute(&self, attribute_id: u64) -> Result<usize> {
        self.storage.write(|backend| {
            let mut rows = backend.load_values(&self.table)?;
            let before = rows.len();
            rows.retain(|r| r.attribute_id != attribute_id);
            let removed = before - rows.len();
            if removed > 0 {
                backend.save_values(&self.table, &rows)?;
            }

            debug!(attribute_id, removed, "values removed for attribute");
            Ok(removed)
        })
    }
}
