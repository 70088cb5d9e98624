//! # Relation Resolver
//!
//! Turns a host entity instance into a named set of attribute accessors.
//!
//! The attributes a host kind carries are data, not code, so each bound
//! instance holds a runtime-built [`AttributeRelations`] table mapping
//! attribute slug to an [`AttributeAccessor`]. Defining a new attribute makes
//! it appear on the next bind without touching the host type.
//!
//! ## Build
//!
//! [`RelationResolver::build`]:
//!
//! 1. checks the owner type is a registered host kind (`UnknownOwnerType`),
//! 2. lists the definitions applicable to the owner type, in `(sort_order, id)` order,
//! 3. resolves each definition's `content_type` to a value store, failing the
//!    whole build with `UnresolvedValueStore` when one is missing,
//! 4. refuses slugs that shadow a native field of the host (`SlugCollision`).
//!
//! ## Laziness and caching
//!
//! Binding runs no value queries. An accessor queries its store the first
//! time its records are read and keeps the result for the life of the
//! accessor. Writes through the accessor reset its own cache only; another
//! instance bound to the same owner keeps whatever snapshot it already
//! loaded until it is refreshed.

use once_cell::sync::OnceCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::content::Content;
use crate::error::{EavError, Result};
use crate::host::{HostCatalog, HostEntity};
use crate::model::{AttributeDefinition, OwnerRef, ValueFilter, ValueRecord};
use crate::registry::AttributeRegistry;
use crate::store::backend::StorageBackend;
use crate::types::TypeMap;
use crate::validation::ValueValidator;
use crate::values::ValueStore;

pub struct RelationResolver<B: StorageBackend> {
    registry: Arc<AttributeRegistry<B>>,
    types: Arc<TypeMap>,
    hosts: Arc<HostCatalog>,
    validator: Arc<dyn ValueValidator>,
}

impl<B: StorageBackend> RelationResolver<B> {
    pub fn new(
        registry: Arc<AttributeRegistry<B>>,
        types: Arc<TypeMap>,
        hosts: Arc<HostCatalog>,
        validator: Arc<dyn ValueValidator>,
    ) -> Self {
        Self {
            registry,
            types,
            hosts,
            validator,
        }
    }

    #[tracing::instrument(
        skip(self, entity),
        fields(owner_type = %entity.owner_type(), owner_id = entity.owner_id())
    )]
    pub fn build<E: HostEntity + ?Sized>(&self, entity: &E) -> Result<AttributeRelations> {
        let owner = entity.owner_ref();

        let mut native: BTreeSet<String> = self
            .hosts
            .native_fields(&owner.owner_type)
            .ok_or_else(|| EavError::UnknownOwnerType(owner.owner_type.clone()))?;
        native.extend(entity.native_fields());

        let definitions = self.registry.applicable_to(&owner.owner_type)?;

        let mut accessors = Vec::with_capacity(definitions.len());
        let mut index = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            let store = self.types.resolve(&definition.content_type)?;

            if native.contains(&definition.slug) {
                return Err(EavError::SlugCollision {
                    slug: definition.slug,
                    owner_type: owner.owner_type,
                });
            }

            index.insert(definition.slug.clone(), accessors.len());
            accessors.push(AttributeAccessor::new(
                definition,
                owner.clone(),
                store,
                self.validator.clone(),
            ));
        }

        debug!(attributes = accessors.len(), "relations bound");
        Ok(AttributeRelations {
            owner,
            accessors,
            index,
        })
    }
}

/// The attribute accessors bound to one host entity instance, in
/// `(sort_order, id)` order of their definitions.
pub struct AttributeRelations {
    owner: OwnerRef,
    accessors: Vec<AttributeAccessor>,
    index: HashMap<String, usize>,
}

impl AttributeRelations {
    pub fn owner(&self) -> &OwnerRef {
        &self.owner
    }

    pub fn get(&self, slug: &str) -> Option<&AttributeAccessor> {
        self.index.get(slug).map(|&i| &self.accessors[i])
    }

    pub fn get_mut(&mut self, slug: &str) -> Option<&mut AttributeAccessor> {
        match self.index.get(slug) {
            Some(&i) => self.accessors.get_mut(i),
            None => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeAccessor> {
        self.accessors.iter()
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.accessors.iter().map(|a| a.definition.slug.as_str())
    }

    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }
}

/// What an accessor resolves to, shaped by the definition's cardinality.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Single(Option<ValueRecord>),
    Many(Vec<ValueRecord>),
}

impl Resolved {
    pub fn into_records(self) -> Vec<ValueRecord> {
        match self {
            Resolved::Single(record) => record.into_iter().collect(),
            Resolved::Many(records) => records,
        }
    }
}

/// One attribute of one host instance: a bound, lazily run query against the
/// attribute's value store.
pub struct AttributeAccessor {
    definition: AttributeDefinition,
    owner: OwnerRef,
    store: Arc<dyn ValueStore>,
    validator: Arc<dyn ValueValidator>,
    cache: OnceCell<Vec<ValueRecord>>,
}

impl AttributeAccessor {
    fn new(
        definition: AttributeDefinition,
        owner: OwnerRef,
        store: Arc<dyn ValueStore>,
        validator: Arc<dyn ValueValidator>,
    ) -> Self {
        Self {
            definition,
            owner,
            store,
            validator,
            cache: OnceCell::new(),
        }
    }

    pub fn definition(&self) -> &AttributeDefinition {
        &self.definition
    }

    pub fn owner(&self) -> &OwnerRef {
        &self.owner
    }

    pub fn is_collection(&self) -> bool {
        self.definition.is_collection
    }

    /// Whether the bound query has run since binding or the last write.
    pub fn is_loaded(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Every stored row for this owner and attribute, in id order.
    pub fn records(&self) -> Result<&[ValueRecord]> {
        self.cache
            .get_or_try_init(|| {
                self.store
                    .query(&ValueFilter::for_owner(self.definition.id, &self.owner))
            })
            .map(Vec::as_slice)
    }

    pub fn first(&self) -> Result<Option<&ValueRecord>> {
        Ok(self.records()?.first())
    }

    pub fn resolve(&self) -> Result<Resolved> {
        if self.definition.is_collection {
            Ok(Resolved::Many(self.records()?.to_vec()))
        } else {
            Ok(Resolved::Single(self.first()?.cloned()))
        }
    }

    pub fn content(&self) -> Result<Option<Content>> {
        Ok(self.first()?.map(|r| r.content.clone()))
    }

    /// Stored content, or the definition's default parsed as the store's kind.
    pub fn content_or_default(&self) -> Result<Option<Content>> {
        if let Some(content) = self.content()? {
            return Ok(Some(content));
        }
        self.definition
            .default
            .as_deref()
            .map(|raw| Content::parse(self.store.kind(), raw))
            .transpose()
    }

    pub fn contents(&self) -> Result<Vec<Content>> {
        Ok(self.records()?.iter().map(|r| r.content.clone()).collect())
    }

    pub fn create(&mut self, content: impl Into<Content>) -> Result<ValueRecord> {
        let content = content.into();
        self.check(&content)?;
        let record = self
            .store
            .create(self.definition.id, &self.owner, content)?;
        self.refresh();
        Ok(record)
    }

    pub fn update(&mut self, record_id: u64, content: impl Into<Content>) -> Result<ValueRecord> {
        let content = content.into();
        self.check(&content)?;
        self.owned_record(record_id)?;
        let record = self.store.update(record_id, content)?;
        self.refresh();
        Ok(record)
    }

    pub fn delete(&mut self, record_id: u64) -> Result<()> {
        self.owned_record(record_id)?;
        self.store.delete(record_id)?;
        self.refresh();
        Ok(())
    }

    /// Drop the cached records so the next read queries the store again.
    pub fn refresh(&mut self) {
        self.cache.take();
    }

    fn check(&self, content: &Content) -> Result<()> {
        self.validator
            .validate(&self.definition, content)
            .map_err(EavError::ValidationFailed)
    }

    // Record ids are per table, so an id alone could address another owner's row.
    fn owned_record(&self, record_id: u64) -> Result<ValueRecord> {
        let filter = ValueFilter::for_owner(self.definition.id, &self.owner);
        self.store
            .get(record_id)?
            .filter(|r| filter.matches(r))
            .ok_or_else(|| EavError::RecordNotFound {
                table: self.store.table().to_string(),
                id: record_id,
            })
    }
}
