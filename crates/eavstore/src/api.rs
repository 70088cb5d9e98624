//! # API Facade
//!
//! [`EavApi`] is the single entry point an embedding application holds. It
//! wires the pieces together over one shared [`Storage`]:
//!
//! - the [`AttributeRegistry`] (definitions and applicability),
//! - the [`TypeMap`] (content-type alias → value store),
//! - the [`HostCatalog`] (known host kinds and their native fields),
//! - the [`RelationResolver`] (binding accessors to host instances).
//!
//! The facade holds no logic of its own beyond construction. It dispatches
//! to the component that owns each operation and returns its structured
//! result.
//!
//! ## Generic Over StorageBackend
//!
//! `EavApi<B: StorageBackend>` is generic over the storage backend:
//! - Production: `EavApi<FsBackend>` (see [`crate::init`])
//! - Testing: `EavApi<MemBackend>`
//!
//! ## Startup
//!
//! [`EavApi::new`] registers the five built-in value stores when
//! `register_builtin_types` is set, registers `host_types` with no native
//! fields, and builds the slugger from `slug_separator`. Further stores and
//! host kinds can be added at any time; a new registration is visible to the
//! next bind.

use std::sync::Arc;

use crate::config::EavConfig;
use crate::content::ContentKind;
use crate::error::Result;
use crate::host::{HostCatalog, HostEntity};
use crate::model::{AttributeDefinition, DefinitionInput};
use crate::registry::AttributeRegistry;
use crate::resolver::{AttributeRelations, RelationResolver};
use crate::slug::SeparatorSlugger;
use crate::store::backend::StorageBackend;
use crate::store::Storage;
use crate::types::TypeMap;
use crate::validation::{AcceptAll, ValueValidator};
use crate::values::{TypedValueStore, ValueStore};

pub struct EavApi<B: StorageBackend + 'static> {
    storage: Arc<Storage<B>>,
    types: Arc<TypeMap>,
    hosts: Arc<HostCatalog>,
    registry: Arc<AttributeRegistry<B>>,
    resolver: RelationResolver<B>,
}

impl<B: StorageBackend + 'static> EavApi<B> {
    pub fn new(backend: B, config: &EavConfig) -> Self {
        let storage = Arc::new(Storage::with_backend(backend));
        let types = Arc::new(TypeMap::new());
        if config.register_builtin_types {
            types.merge(
                ContentKind::ALL.into_iter().map(|kind| {
                    let store: Arc<dyn ValueStore> =
                        Arc::new(TypedValueStore::new(storage.clone(), kind));
                    (kind.alias(), store)
                }),
                true,
            );
        }

        let hosts = Arc::new(HostCatalog::new());
        for owner_type in config.host_types() {
            hosts.register(owner_type, Vec::<String>::new());
        }

        let registry = Arc::new(AttributeRegistry::new(
            storage.clone(),
            types.clone(),
            Arc::new(SeparatorSlugger::new(config.slug_separator())),
        ));
        let resolver = RelationResolver::new(
            registry.clone(),
            types.clone(),
            hosts.clone(),
            Arc::new(AcceptAll),
        );

        Self {
            storage,
            types,
            hosts,
            registry,
            resolver,
        }
    }

    /// Replace the validation collaborator run before accessor writes.
    pub fn with_validator(mut self, validator: impl ValueValidator + 'static) -> Self {
        self.resolver = RelationResolver::new(
            self.registry.clone(),
            self.types.clone(),
            self.hosts.clone(),
            Arc::new(validator),
        );
        self
    }

    /// Serve `alias` with a store of `kind` over the shared storage, in the
    /// table `attribute_<alias>_values`.
    pub fn register_type(&self, alias: &str, kind: ContentKind, overwrite: bool) -> bool {
        let store = TypedValueStore::with_table(
            self.storage.clone(),
            kind,
            format!("attribute_{}_values", alias),
        );
        self.types.register(alias, Arc::new(store), overwrite)
    }

    /// Serve `alias` with an externally built store.
    ///
    /// The store must be built over [`EavApi::shared_storage`]. Attribute
    /// deletes and the collection checks run against this API's storage, so
    /// rows a store keeps anywhere else are out of their reach.
    pub fn register_store(&self, alias: &str, store: Arc<dyn ValueStore>, overwrite: bool) -> bool {
        self.types.register(alias, store, overwrite)
    }

    pub fn register_host<I, S>(&self, owner_type: &str, native_fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts.register(owner_type, native_fields)
    }

    pub fn define(&self, input: DefinitionInput) -> Result<AttributeDefinition> {
        self.registry.define(input)
    }

    pub fn delete_attribute(&self, id: u64) -> Result<usize> {
        self.registry.delete(id)
    }

    pub fn set_applicability<I, S>(&self, attribute_id: u64, owner_types: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry.set_applicability(attribute_id, owner_types)
    }

    pub fn applicable_to(&self, owner_type: &str) -> Result<Vec<AttributeDefinition>> {
        self.registry.applicable_to(owner_type)
    }

    pub fn applicability(&self, attribute_id: u64) -> Result<Vec<String>> {
        self.registry.applicability(attribute_id)
    }

    pub fn attribute(&self, id: u64) -> Result<Option<AttributeDefinition>> {
        self.registry.get(id)
    }

    pub fn attribute_by_slug(&self, slug: &str) -> Result<Option<AttributeDefinition>> {
        self.registry.find_by_slug(slug)
    }

    pub fn attributes(&self) -> Result<Vec<AttributeDefinition>> {
        self.registry.list()
    }

    /// Bind the applicable attributes of `entity` as lazy accessors.
    pub fn bind<E: HostEntity + ?Sized>(&self, entity: &E) -> Result<AttributeRelations> {
        self.resolver.build(entity)
    }

    pub fn type_aliases(&self) -> Vec<String> {
        self.types.aliases()
    }

    pub fn host_types(&self) -> Vec<String> {
        self.hosts.kinds()
    }

    pub fn storage(&self) -> &Storage<B> {
        &self.storage
    }

    /// Handle on the storage, for building stores passed to
    /// [`EavApi::register_store`].
    pub fn shared_storage(&self) -> Arc<Storage<B>> {
        self.storage.clone()
    }
}
