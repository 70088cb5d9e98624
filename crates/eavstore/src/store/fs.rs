use super::fs_backend::FsBackend;
use super::Storage;
use std::path::PathBuf;

pub type FileStorage = Storage<FsBackend>;

impl FileStorage {
    pub fn open(root: PathBuf) -> Self {
        Storage::with_backend(FsBackend::new(root))
    }
}
