use crate::api::EavApi;
use crate::config::EavConfig;
use crate::store::fs_backend::FsBackend;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
    // Held so the directory outlives the test
    pub _temp_dir: TempDir,
    pub api: EavApi<FsBackend>,
    pub root: PathBuf,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let config = EavConfig {
            host_types: Some(vec!["Post".to_string(), "Page".to_string()]),
            ..Default::default()
        };
        let api = EavApi::new(FsBackend::new(root.clone()), &config);
        Self {
            _temp_dir: temp_dir,
            api,
            root,
        }
    }

    /// A second API over the same directory, as another process would see it.
    pub fn reopen(&self) -> EavApi<FsBackend> {
        let config = EavConfig {
            host_types: Some(vec!["Post".to_string(), "Page".to_string()]),
            ..Default::default()
        };
        EavApi::new(FsBackend::new(self.root.clone()), &config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;
    use crate::model::{DefinitionInput, OwnerRef};

    #[test]
    fn test_env_persists_across_reopen() {
        let env = TestEnv::new();
        env.api
            .define(DefinitionInput::new("Rating", "integer").entities(["Post"]))
            .unwrap();
        let mut post = env.api.bind(&OwnerRef::new("Post", 10)).unwrap();
        post.get_mut("rating").unwrap().create(42i64).unwrap();

        let reopened = env.reopen();
        let post = reopened.bind(&OwnerRef::new("Post", 10)).unwrap();
        assert_eq!(
            post.get("rating").unwrap().content().unwrap(),
            Some(Content::Integer(42))
        );
        assert!(env.root.join("attribute_integer_values.json").exists());
    }
}
