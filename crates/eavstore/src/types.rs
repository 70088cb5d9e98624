//! # Type Dispatch Table
//!
//! Maps a content-type alias (the `content_type` of a definition, e.g.
//! `"integer"`) to the value store serving it. The table is populated at
//! startup and only changes through [`TypeMap::register`] or
//! [`TypeMap::merge`]; a merge is applied under a single write lock so a
//! concurrent resolve sees the table entirely before or entirely after it.
//!
//! With `overwrite = true` new entries replace existing aliases. With
//! `overwrite = false` aliases that are already registered keep their store
//! and only new aliases are added.
//!
//! Every table a store was ever registered with stays listed in
//! [`TypeMap::tables`], even after its alias is overwritten, so deleting an
//! attribute still reaches rows written through a replaced store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::error::{EavError, Result};
use crate::values::ValueStore;

#[derive(Default)]
pub struct TypeMap {
    inner: RwLock<Entries>,
}

#[derive(Default)]
struct Entries {
    stores: BTreeMap<String, Arc<dyn ValueStore>>,
    tables: BTreeSet<String>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-inserted entry
    // behind, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a store under `alias`. Returns whether the table changed.
    pub fn register(&self, alias: impl Into<String>, store: Arc<dyn ValueStore>, overwrite: bool) -> bool {
        let alias = alias.into();
        let mut entries = self.write();
        insert_entry(&mut entries, alias, store, overwrite)
    }

    /// Register several stores at once. Returns how many aliases changed.
    pub fn merge<I, S>(&self, stores: I, overwrite: bool) -> usize
    where
        I: IntoIterator<Item = (S, Arc<dyn ValueStore>)>,
        S: Into<String>,
    {
        let mut entries = self.write();
        stores
            .into_iter()
            .map(|(alias, store)| insert_entry(&mut entries, alias.into(), store, overwrite))
            .filter(|changed| *changed)
            .count()
    }

    /// Look up the store for `alias`.
    pub(crate) fn resolve(&self, alias: &str) -> Result<Arc<dyn ValueStore>> {
        self.read()
            .stores
            .get(alias)
            .cloned()
            .ok_or_else(|| EavError::UnresolvedValueStore(alias.to_string()))
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.read().stores.contains_key(alias)
    }

    pub fn aliases(&self) -> Vec<String> {
        self.read().stores.keys().cloned().collect()
    }

    /// Every value table any registered store has used, current or replaced.
    pub(crate) fn tables(&self) -> Vec<String> {
        self.read().tables.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().stores.is_empty()
    }
}

fn insert_entry(entries: &mut Entries, alias: String, store: Arc<dyn ValueStore>, overwrite: bool) -> bool {
    if !overwrite && entries.stores.contains_key(&alias) {
        debug!(%alias, "type alias already registered, keeping existing store");
        return false;
    }
    debug!(%alias, table = store.table(), "type alias registered");
    entries.tables.insert(store.table().to_string());
    entries.stores.insert(alias, store);
    true
}
