use super::mem_backend::MemBackend;
use super::Storage;

pub type InMemoryStorage = Storage<MemBackend>;

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Storage::with_backend(MemBackend::new())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::api::EavApi;
    use crate::config::EavConfig;
    use crate::model::{AttributeDefinition, DefinitionInput};

    /// In-memory API with the built-in value stores and `Post`/`Page` hosts.
    pub struct ApiFixture {
        pub api: EavApi<MemBackend>,
    }

    impl Default for ApiFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ApiFixture {
        pub fn new() -> Self {
            let config = EavConfig {
                host_types: Some(vec!["Post".to_string(), "Page".to_string()]),
                ..Default::default()
            };
            Self {
                api: EavApi::new(MemBackend::new(), &config),
            }
        }

        pub fn with_host(self, owner_type: &str, native_fields: &[&str]) -> Self {
            self.api
                .register_host(owner_type, native_fields.iter().copied());
            self
        }

        /// Single-valued attribute applicable to `owner_types`.
        pub fn with_attribute(self, name: &str, content_type: &str, owner_types: &[&str]) -> Self {
            self.define(DefinitionInput::new(name, content_type).entities(owner_types.iter().copied()))
        }

        /// Collection attribute applicable to `owner_types`.
        pub fn with_collection(self, name: &str, content_type: &str, owner_types: &[&str]) -> Self {
            self.define(
                DefinitionInput::new(name, content_type)
                    .collection()
                    .entities(owner_types.iter().copied()),
            )
        }

        fn define(self, input: DefinitionInput) -> Self {
            self.api.define(input).unwrap();
            self
        }

        pub fn attribute(&self, slug: &str) -> AttributeDefinition {
            self.api.attribute_by_slug(slug).unwrap().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::ApiFixture;
    use super::*;
    use crate::content::Content;
    use crate::error::EavError;
    use crate::model::OwnerRef;
    use crate::store::backend::StorageBackend;

    #[test]
    fn test_new_storage_is_empty() {
        let storage = InMemoryStorage::default();
        assert!(storage.backend().load_definitions().unwrap().is_empty());
        assert!(storage.backend().load_applicability().unwrap().is_empty());
    }

    #[test]
    fn test_fixtures_coverage() {
        let fixture = ApiFixture::default()
            .with_host("Invoice", &["number"])
            .with_attribute("Rating", "integer", &["Post"])
            .with_collection("Tags", "varchar", &["Post", "Page"]);

        assert_eq!(fixture.api.attributes().unwrap().len(), 2);
        assert!(fixture.attribute("tags").is_collection);
        assert_eq!(fixture.api.applicability(fixture.attribute("tags").id).unwrap(), vec!["Post", "Page"]);
        assert_eq!(fixture.api.host_types(), vec!["Invoice", "Page", "Post"]);

        let mut post = fixture.api.bind(&OwnerRef::new("Post", 1)).unwrap();
        post.get_mut("rating").unwrap().create(3i64).unwrap();
        assert_eq!(
            post.get("rating").unwrap().content().unwrap(),
            Some(Content::Integer(3))
        );
    }

    #[test]
    fn test_write_error_surfaces_from_fixture_api() {
        let fixture = ApiFixture::new().with_attribute("Rating", "integer", &["Post"]);
        fixture.api.storage().backend().set_simulate_write_error(true);

        let mut post = fixture.api.bind(&OwnerRef::new("Post", 1)).unwrap();
        assert!(matches!(
            post.get_mut("rating").unwrap().create(3i64),
            Err(EavError::Store(_))
        ));
    }
}
