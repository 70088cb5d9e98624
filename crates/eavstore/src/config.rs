//! # Configuration
//!
//! Configuration is managed by [`clapfig`], which handles layered loading
//! from TOML files and environment variables (see [`crate::init`]).
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `EAVSTORE__SLUG_SEPARATOR`, `EAVSTORE__HOST_TYPES`, etc.
//! 2. **Data-dir Config**: `<data_dir>/eavstore.toml`.
//! 3. **Global Config**: OS-appropriate data directory (via `directories` crate).
//! 4. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `data_dir` | OS data dir | Where the filesystem backend keeps its tables |
//! | `register_builtin_types` | `true` | Register the boolean/datetime/integer/text/varchar stores |
//! | `slug_separator` | `_` | Separator used when deriving slugs from names |
//! | `host_types` | none | Host kinds known at startup, with no native fields |

use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for eavstore, stored in `eavstore.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EavConfig {
    /// Directory holding the table files. Defaults to the OS data directory.
    pub data_dir: Option<PathBuf>,

    #[config(default = true)]
    pub register_builtin_types: bool,

    /// Only the first character is used.
    #[config(default = "_")]
    pub slug_separator: String,

    /// Host kinds registered at startup. When absent, none are.
    pub host_types: Option<Vec<String>>,
}

impl Default for EavConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            register_builtin_types: true,
            slug_separator: "_".to_string(),
            host_types: None,
        }
    }
}

impl EavConfig {
    /// The slug separator as a char, falling back to `_` when unset.
    pub fn slug_separator(&self) -> char {
        self.slug_separator.chars().next().unwrap_or('_')
    }

    pub fn host_types(&self) -> Vec<String> {
        self.host_types.clone().unwrap_or_default()
    }
}
