//! # Filesystem-backed Context
//!
//! [`initialize`] is the one-call setup for applications that want the
//! tables on disk: it finds the data directory, loads `eavstore.toml` and
//! builds an [`EavApi`] over an [`FsBackend`].
//!
//! ## Data Directory Resolution
//!
//! 1. `data_override` argument, when given.
//! 2. `EAVSTORE_DATA` environment variable.
//! 3. `data_dir` from the global config file.
//! 4. OS-appropriate data directory (via the `directories` crate).
//!
//! ## Config Search
//!
//! Config files are merged from the global data directory first and then the
//! resolved data directory, so a per-store `eavstore.toml` overrides global
//! settings key by key.

use crate::api::EavApi;
use crate::config::EavConfig;
use crate::error::{EavError, Result};
use crate::store::fs_backend::FsBackend;
use clapfig::{Clapfig, SearchMode, SearchPath};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "eavstore.toml";
pub const DATA_ENV: &str = "EAVSTORE_DATA";

pub struct EavContext {
    pub api: EavApi<FsBackend>,
    pub config: EavConfig,
    pub data_dir: PathBuf,
}

/// OS data directory for eavstore, `None` when no home directory is known.
pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "eavstore", "eavstore").map(|dirs| dirs.data_dir().to_path_buf())
}

fn load_config(search_dirs: Vec<PathBuf>) -> EavConfig {
    Clapfig::builder()
        .app_name("eavstore")
        .file_name(CONFIG_FILE)
        .search_paths(search_dirs.into_iter().map(SearchPath::Path).collect())
        .search_mode(SearchMode::Merge)
        .load()
        .unwrap_or_default()
}

/// Build a filesystem-backed API.
///
/// # Examples
///
/// ```ignore
/// // OS data directory, or EAVSTORE_DATA when set
/// let ctx = initialize(None)?;
///
/// // explicit directory
/// let ctx = initialize(Some(PathBuf::from("/srv/app/attributes")))?;
/// ```
pub fn initialize(data_override: Option<PathBuf>) -> Result<EavContext> {
    let global_dir = default_data_dir();

    let data_dir = match data_override.or_else(|| std::env::var_os(DATA_ENV).map(PathBuf::from)) {
        Some(dir) => dir,
        None => {
            let global = load_config(global_dir.iter().cloned().collect());
            global.data_dir.or_else(|| global_dir.clone()).ok_or_else(|| {
                EavError::Store("could not determine a data directory".to_string())
            })?
        }
    };

    let mut search_dirs: Vec<PathBuf> = global_dir.into_iter().collect();
    if !search_dirs.iter().any(|d| d == &data_dir) {
        search_dirs.push(data_dir.clone());
    }
    let config = load_config(search_dirs);

    Ok(open(&data_dir, config))
}

/// Build a filesystem-backed API over `data_dir` with an explicit config.
pub fn open(data_dir: &Path, config: EavConfig) -> EavContext {
    debug!(data_dir = %data_dir.display(), "opening attribute store");
    let api = EavApi::new(FsBackend::new(data_dir.to_path_buf()), &config);
    EavContext {
        api,
        config,
        data_dir: data_dir.to_path_buf(),
    }
}
