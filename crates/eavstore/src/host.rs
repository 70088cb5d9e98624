//! Host entities: the pre-existing business objects that gain attributes.
//!
//! The core never owns host entities. It only needs their polymorphic
//! identity (`owner_type`, `owner_id`) and the names of their native fields,
//! so attribute accessors can be bound without shadowing a real field.
//!
//! Owner types must be registered in the [`HostCatalog`] before an instance
//! of that type can be bound.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use crate::model::OwnerRef;

pub trait HostEntity {
    /// Discriminator separating the id spaces of different host kinds.
    fn owner_type(&self) -> &str;

    fn owner_id(&self) -> u64;

    /// Field names owned by the entity itself. Attribute slugs may not use them.
    fn native_fields(&self) -> Vec<String> {
        Vec::new()
    }

    fn owner_ref(&self) -> OwnerRef {
        OwnerRef::new(self.owner_type(), self.owner_id())
    }
}

impl HostEntity for OwnerRef {
    fn owner_type(&self) -> &str {
        &self.owner_type
    }

    fn owner_id(&self) -> u64 {
        self.owner_id
    }
}

/// Registered host kinds and their native field names.
#[derive(Default)]
pub struct HostCatalog {
    kinds: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl HostCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host kind. Registering an existing kind adds to its fields.
    pub fn register<I, S>(&self, owner_type: impl Into<String>, native_fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let owner_type = owner_type.into();
        let mut kinds = self.kinds.write().unwrap_or_else(PoisonError::into_inner);
        let fields = kinds.entry(owner_type.clone()).or_default();
        fields.extend(native_fields.into_iter().map(Into::into));
        debug!(%owner_type, fields = fields.len(), "host kind registered");
    }

    pub fn contains(&self, owner_type: &str) -> bool {
        self.kinds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(owner_type)
    }

    /// Native fields of a registered kind, `None` if the kind is unknown.
    pub fn native_fields(&self, owner_type: &str) -> Option<BTreeSet<String>> {
        self.kinds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(owner_type)
            .cloned()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.kinds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
