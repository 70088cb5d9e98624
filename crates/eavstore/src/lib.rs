//! # eavstore
//!
//! Entity-Attribute-Value storage for existing host entities. An application
//! keeps its own types (posts, pages, invoices) and lets administrators add
//! typed custom attributes to them at runtime, without schema changes or
//! recompilation.
//!
//! ## Architecture
//!
//! ```text
//! EavApi (api.rs)
//!   ├── AttributeRegistry (registry.rs)   definitions + applicability index
//!   ├── TypeMap (types.rs)                content-type alias → ValueStore
//!   ├── HostCatalog (host.rs)             known host kinds + native fields
//!   └── RelationResolver (resolver.rs)    host instance → lazy accessors
//!             │
//!             ▼
//!   ValueStore (values.rs)                one parameterized store per content kind
//!             │
//!             ▼
//!   Storage<B> (store/)                   write unit over a StorageBackend
//! ```
//!
//! Data flows from the registry through the resolver: binding a host entity
//! lists the definitions applicable to its owner type, resolves each
//! definition's content type to a store, and hands back one accessor per
//! attribute slug. Each accessor runs a query filtered by attribute id,
//! owner type and owner id the first time it is read.
//!
//! ## Usage
//!
//! ```ignore
//! use eavstore::prelude::*;
//!
//! let api = EavApi::new(MemBackend::new(), &EavConfig::default());
//! api.register_host("Post", ["title", "body"]);
//! api.define(DefinitionInput::new("Rating", "integer").entities(["Post"]))?;
//!
//! let mut post = api.bind(&OwnerRef::new("Post", 10))?;
//! let rating = post.get_mut("rating").expect("bound");
//! rating.create(42i64)?;
//! assert_eq!(rating.content()?, Some(Content::Integer(42)));
//! ```
//!
//! ## Concurrency
//!
//! All mutations run inside [`store::Storage::write`], one at a time per
//! storage. The filesystem backend also holds an advisory lock on the data
//! directory for each write, so separate processes sharing it take turns.
//! Each table save replaces the whole table, so readers never take
//! a lock and see a table either before or after a write. Single-valued
//! attributes are checked for an existing row inside the same write unit
//! that inserts, so a racing duplicate fails with
//! [`EavError::ConstraintViolation`].

pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod host;
pub mod init;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod slug;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod types;
pub mod validation;
pub mod values;

pub use error::{EavError, Result};

pub mod prelude {
    pub use crate::api::EavApi;
    pub use crate::config::EavConfig;
    pub use crate::content::{Content, ContentKind};
    pub use crate::error::{EavError, Result};
    pub use crate::host::HostEntity;
    pub use crate::model::{AttributeDefinition, DefinitionInput, OwnerRef, ValueFilter, ValueRecord};
    pub use crate::resolver::{AttributeAccessor, AttributeRelations, Resolved};
    pub use crate::store::fs_backend::FsBackend;
    pub use crate::store::mem_backend::MemBackend;
    pub use crate::validation::ValueValidator;
    pub use crate::values::ValueStore;
}
