//! # Attribute Registry
//!
//! Persisted attribute definitions and the applicability index that says
//! which host kinds each definition attaches to.
//!
//! ## Defining
//!
//! [`AttributeRegistry::define`] inserts (`input.id == None`) or updates a
//! definition. Before touching storage it validates the input fields and
//! checks that `content_type` names a registered value store. Inside one write
//! unit it then:
//!
//! 1. derives or normalizes the slug and checks it is unique,
//! 2. assigns `sort_order = max + 1` when none was given on insert,
//! 3. saves the definition,
//! 4. replaces the applicability set when `input.entities` is present.
//!
//! If step 4 fails the definitions table is put back as it was, so a failed
//! define leaves nothing behind.
//!
//! Slugs are stable: an update keeps the stored slug and rejects attempts to
//! change it. The content type is likewise fixed once defined, because values
//! already live in the table of the original type. A collection can only be
//! turned single-valued while no owner holds more than one value for it.
//!
//! ## Applicability
//!
//! [`AttributeRegistry::set_applicability`] replaces a definition's set of
//! owner types with one table save, so readers of
//! [`AttributeRegistry::applicable_to`] see the old set or the new one and
//! never an empty or partial set in between.
//!
//! ## Deleting
//!
//! [`AttributeRegistry::delete`] runs as one write unit: it clears the
//! attribute's rows from every value table any store was registered with,
//! then its applicability rows, and removes the definition last. When any
//! save fails the tables already saved are restored, so the definition and
//! its values are either all present or all gone.
//!
//! Definition ids come from a persisted sequence and are never reused, so a
//! later definition cannot adopt rows left behind by an earlier one.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{EavError, Result};
use crate::model::{Applicability, AttributeDefinition, DefinitionInput, ValueRecord, DEFAULT_LOCALE};
use crate::slug::Slugger;
use crate::store::backend::StorageBackend;
use crate::store::{allocate_id, Storage, DEFINITIONS_TABLE};
use crate::types::TypeMap;
use crate::validation::{validate_definition, validate_slug};

pub struct AttributeRegistry<B: StorageBackend> {
    storage: Arc<Storage<B>>,
    types: Arc<TypeMap>,
    slugger: Arc<dyn Slugger>,
}

impl<B: StorageBackend> AttributeRegistry<B> {
    pub fn new(storage: Arc<Storage<B>>, types: Arc<TypeMap>, slugger: Arc<dyn Slugger>) -> Self {
        Self {
            storage,
            types,
            slugger,
        }
    }

    #[tracing::instrument(skip(self, input), fields(id = ?input.id, content_type = %input.content_type))]
    pub fn define(&self, input: DefinitionInput) -> Result<AttributeDefinition> {
        validate_definition(&input).map_err(|e| EavError::ValidationFailed(e.to_string()))?;

        if !self.types.contains(&input.content_type) {
            return Err(EavError::UnknownAttributeType(input.content_type));
        }

        let owner_types = input
            .entities
            .as_deref()
            .map(normalize_owner_types)
            .transpose()?;

        self.storage.write(|backend| {
            let mut definitions = backend.load_definitions()?;
            let original = definitions.clone();
            let now = Utc::now();

            let definition = match input.id {
                None => {
                    let slug = self.resolve_slug(&input)?;
                    if definitions.iter().any(|d| d.slug == slug) {
                        return Err(EavError::ConstraintViolation(format!(
                            "slug '{}' is already taken",
                            slug
                        )));
                    }
                    let sort_order = input.sort_order.unwrap_or_else(|| {
                        definitions.iter().map(|d| d.sort_order).max().unwrap_or(0) + 1
                    });
                    let id = allocate_id(backend, DEFINITIONS_TABLE, definitions.iter().map(|d| d.id))?;
                    let definition = AttributeDefinition {
                        id,
                        slug,
                        name: input.name,
                        description: input.description,
                        sort_order,
                        group: input.group,
                        content_type: input.content_type,
                        is_required: input.is_required,
                        is_collection: input.is_collection,
                        default: input.default,
                        created_at: now,
                        updated_at: now,
                    };
                    definitions.push(definition.clone());
                    definition
                }
                Some(id) => {
                    let existing = definitions
                        .iter_mut()
                        .find(|d| d.id == id)
                        .ok_or(EavError::AttributeNotFound(id))?;

                    if let Some(requested) = &input.slug {
                        if self.slugger.slugify(requested) != existing.slug {
                            return Err(EavError::ValidationFailed(format!(
                                "slug of attribute '{}' cannot be changed",
                                existing.slug
                            )));
                        }
                    }
                    if input.content_type != existing.content_type {
                        return Err(EavError::ValidationFailed(format!(
                            "content type of attribute '{}' cannot be changed",
                            existing.slug
                        )));
                    }
                    if existing.is_collection && !input.is_collection {
                        self.ensure_single_valued(backend, existing)?;
                    }

                    existing.name = input.name;
                    existing.description = input.description;
                    if let Some(sort_order) = input.sort_order {
                        existing.sort_order = sort_order;
                    }
                    existing.group = input.group;
                    existing.is_required = input.is_required;
                    existing.is_collection = input.is_collection;
                    existing.default = input.default;
                    existing.updated_at = now;
                    existing.clone()
                }
            };

            backend.save_definitions(&definitions)?;

            if let Some(owner_types) = &owner_types {
                if let Err(err) = replace_applicability(backend, definition.id, owner_types) {
                    rollback(backend, vec![Snapshot::Definitions(original)]);
                    return Err(err);
                }
            }

            debug!(id = definition.id, slug = %definition.slug, "attribute defined");
            Ok(definition)
        })
    }

    /// Fail when any owner holds more than one value for `definition`.
    fn ensure_single_valued(&self, backend: &B, definition: &AttributeDefinition) -> Result<()> {
        for table in self.types.tables() {
            let rows = backend.load_values(&table)?;
            let mut owners = HashSet::new();
            let duplicate = rows
                .iter()
                .filter(|r| r.attribute_id == definition.id)
                .find(|r| !owners.insert((r.owner_id, r.owner_type.as_str())));
            if let Some(row) = duplicate {
                return Err(EavError::ConstraintViolation(format!(
                    "attribute '{}' has several values for {} {} and cannot become single-valued",
                    definition.slug, row.owner_type, row.owner_id
                )));
            }
        }
        Ok(())
    }

    fn resolve_slug(&self, input: &DefinitionInput) -> Result<String> {
        let source = match &input.slug {
            Some(slug) => slug.as_str(),
            None => input
                .name
                .get(DEFAULT_LOCALE)
                .filter(|n| !n.trim().is_empty())
                .or_else(|| input.name.values().find(|n| !n.trim().is_empty()))
                .map(String::as_str)
                .unwrap_or_default(),
        };
        let slug = self.slugger.slugify(source);
        validate_slug(&slug).map_err(|e| EavError::ValidationFailed(e.to_string()))?;
        Ok(slug)
    }

    /// Definitions attached to `owner_type`, ordered by `(sort_order, id)`.
    pub fn applicable_to(&self, owner_type: &str) -> Result<Vec<AttributeDefinition>> {
        let backend = self.storage.backend();
        let ids: HashSet<u64> = backend
            .load_applicability()?
            .into_iter()
            .filter(|row| row.owner_type == owner_type)
            .map(|row| row.attribute_id)
            .collect();

        let mut definitions: Vec<AttributeDefinition> = backend
            .load_definitions()?
            .into_iter()
            .filter(|d| ids.contains(&d.id))
            .collect();
        sort_definitions(&mut definitions);
        Ok(definitions)
    }

    /// Replace the owner types a definition applies to.
    #[tracing::instrument(skip(self, owner_types))]
    pub fn set_applicability<I, S>(&self, attribute_id: u64, owner_types: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let owner_types: Vec<String> = owner_types.into_iter().map(Into::into).collect();
        let owner_types = normalize_owner_types(&owner_types)?;

        self.storage.write(|backend| {
            if !backend.load_definitions()?.iter().any(|d| d.id == attribute_id) {
                return Err(EavError::AttributeNotFound(attribute_id));
            }
            replace_applicability(backend, attribute_id, &owner_types)
        })
    }

    /// Owner types a definition applies to, in registration order.
    pub fn applicability(&self, attribute_id: u64) -> Result<Vec<String>> {
        Ok(self
            .storage
            .backend()
            .load_applicability()?
            .into_iter()
            .filter(|row| row.attribute_id == attribute_id)
            .map(|row| row.owner_type)
            .collect())
    }

    pub fn get(&self, id: u64) -> Result<Option<AttributeDefinition>> {
        Ok(self
            .storage
            .backend()
            .load_definitions()?
            .into_iter()
            .find(|d| d.id == id))
    }

    pub fn find_by_slug(&self, slug: &str) -> Result<Option<AttributeDefinition>> {
        Ok(self
            .storage
            .backend()
            .load_definitions()?
            .into_iter()
            .find(|d| d.slug == slug))
    }

    /// All definitions, ordered by `(sort_order, id)`.
    pub fn list(&self) -> Result<Vec<AttributeDefinition>> {
        let mut definitions = self.storage.backend().load_definitions()?;
        sort_definitions(&mut definitions);
        Ok(definitions)
    }

    /// Delete a definition together with its applicability rows and values.
    /// Returns the number of value rows removed.
    #[tracing::instrument(skip(self))]
    pub fn delete(&self, id: u64) -> Result<usize> {
        let tables = self.types.tables();
        self.storage.write(|backend| {
            let definitions = backend.load_definitions()?;
            if !definitions.iter().any(|d| d.id == id) {
                return Err(EavError::AttributeNotFound(id));
            }

            let mut saved = Vec::new();
            match cascade_delete(backend, id, &tables, definitions, &mut saved) {
                Ok(removed) => {
                    debug!(id, values_removed = removed, "attribute deleted");
                    Ok(removed)
                }
                Err(err) => {
                    warn!(id, error = %err, "attribute delete failed, restoring tables");
                    rollback(backend, saved);
                    Err(err)
                }
            }
        })
    }
}

/// A table as it was before a multi-table write replaced it.
enum Snapshot {
    Values(String, Vec<ValueRecord>),
    Applicability(Vec<Applicability>),
    Definitions(Vec<AttributeDefinition>),
}

impl Snapshot {
    fn restore<B: StorageBackend>(&self, backend: &B) -> Result<()> {
        match self {
            Snapshot::Values(table, rows) => backend.save_values(table, rows),
            Snapshot::Applicability(rows) => backend.save_applicability(rows),
            Snapshot::Definitions(rows) => backend.save_definitions(rows),
        }
    }
}

/// Put back every saved table, newest first.
fn rollback<B: StorageBackend>(backend: &B, saved: Vec<Snapshot>) {
    for snapshot in saved.into_iter().rev() {
        if let Err(err) = snapshot.restore(backend) {
            warn!(error = %err, "could not restore table after failed write");
        }
    }
}

/// Remove one definition with its values and applicability rows, definition
/// last. Each table saved is pushed onto `saved` as it was before.
fn cascade_delete<B: StorageBackend>(
    backend: &B,
    id: u64,
    tables: &[String],
    mut definitions: Vec<AttributeDefinition>,
    saved: &mut Vec<Snapshot>,
) -> Result<usize> {
    let mut removed = 0;
    for table in tables {
        let rows = backend.load_values(table)?;
        let kept: Vec<ValueRecord> = rows.iter().filter(|r| r.attribute_id != id).cloned().collect();
        if kept.len() == rows.len() {
            continue;
        }
        backend.save_values(table, &kept)?;
        removed += rows.len() - kept.len();
        saved.push(Snapshot::Values(table.clone(), rows));
    }

    let rows = backend.load_applicability()?;
    let kept: Vec<Applicability> = rows.iter().filter(|r| r.attribute_id != id).cloned().collect();
    if kept.len() != rows.len() {
        backend.save_applicability(&kept)?;
        saved.push(Snapshot::Applicability(rows));
    }

    definitions.retain(|d| d.id != id);
    backend.save_definitions(&definitions)?;
    Ok(removed)
}

fn sort_definitions(definitions: &mut [AttributeDefinition]) {
    definitions.sort_by_key(|d| (d.sort_order, d.id));
}

/// Trim, reject blanks, and drop duplicates while keeping first-seen order.
fn normalize_owner_types(owner_types: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for owner_type in owner_types {
        let owner_type = owner_type.trim();
        if owner_type.is_empty() {
            return Err(EavError::ValidationFailed(
                "owner type cannot be empty".to_string(),
            ));
        }
        if seen.insert(owner_type.to_string()) {
            normalized.push(owner_type.to_string());
        }
    }
    Ok(normalized)
}

/// Swap one definition's applicability rows for `owner_types` in a single save.
/// Pairs that survive the swap keep their original `created_at`.
fn replace_applicability<B: StorageBackend>(
    backend: &B,
    attribute_id: u64,
    owner_types: &[String],
) -> Result<()> {
    let rows = backend.load_applicability()?;
    let (previous, mut kept): (Vec<Applicability>, Vec<Applicability>) = rows
        .into_iter()
        .partition(|row| row.attribute_id == attribute_id);

    let now = Utc::now();
    for owner_type in owner_types {
        let created_at = previous
            .iter()
            .find(|row| &row.owner_type == owner_type)
            .map(|row| row.created_at)
            .unwrap_or(now);
        kept.push(Applicability {
            attribute_id,
            owner_type: owner_type.clone(),
            created_at,
            updated_at: now,
        });
    }

    backend.save_applicability(&kept)?;
    debug!(attribute_id, owner_types = ?owner_types, "applicability replaced");
    Ok(())
}
