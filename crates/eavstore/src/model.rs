//! # Data Model
//!
//! Three persisted record types make up the EAV schema:
//!
//! ```text
//! attributes               AttributeDefinition   one row per custom attribute
//! attribute_entity         Applicability         (attribute_id, owner_type) pairs
//! attribute_<kind>_values  ValueRecord           one table per content kind
//! ```
//!
//! Value rows reference their owner polymorphically through [`OwnerRef`]:
//! `owner_type` disambiguates the id space of different host entity kinds, so
//! `("Post", 10)` and `("Comment", 10)` never share values.
//!
//! Name and description are multi-locale text. The core stores them as an
//! opaque locale → text map and never interprets them beyond picking a
//! display string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::content::Content;

/// Locale used when a name is given without one.
pub const DEFAULT_LOCALE: &str = "en";

/// Locale code → text.
pub type LocalizedText = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub id: u64,
    pub slug: String,
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    pub sort_order: i64,
    #[serde(default)]
    pub group: Option<String>,
    /// Alias of the value store serving this attribute (e.g. "integer").
    pub content_type: String,
    pub is_required: bool,
    pub is_collection: bool,
    /// Raw default, parsed by the value store's kind when read.
    #[serde(default)]
    pub default: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttributeDefinition {
    /// Name in the requested locale, falling back to the default locale and
    /// then to any available translation.
    pub fn display_name(&self, locale: &str) -> Option<&str> {
        self.name
            .get(locale)
            .or_else(|| self.name.get(DEFAULT_LOCALE))
            .or_else(|| self.name.values().next())
            .map(String::as_str)
    }
}

/// Caller-supplied fields for `AttributeRegistry::define`.
///
/// `id: None` inserts a new definition; `id: Some(_)` updates an existing one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionInput {
    pub id: Option<u64>,
    pub slug: Option<String>,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub sort_order: Option<i64>,
    pub group: Option<String>,
    pub content_type: String,
    pub is_required: bool,
    pub is_collection: bool,
    pub default: Option<String>,
    /// When present, replaces the applicability set together with the definition.
    pub entities: Option<Vec<String>>,
}

impl DefinitionInput {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>) -> Self {
        let mut names = LocalizedText::new();
        names.insert(DEFAULT_LOCALE.to_string(), name.into());
        Self {
            name: names,
            content_type: content_type.into(),
            ..Default::default()
        }
    }

    /// Start an update of an existing definition.
    pub fn update(definition: &AttributeDefinition) -> Self {
        Self {
            id: Some(definition.id),
            slug: None,
            name: definition.name.clone(),
            description: definition.description.clone(),
            sort_order: Some(definition.sort_order),
            group: definition.group.clone(),
            content_type: definition.content_type.clone(),
            is_required: definition.is_required,
            is_collection: definition.is_collection,
            default: definition.default.clone(),
            entities: None,
        }
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn name_in(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.name.insert(locale.into(), text.into());
        self
    }

    pub fn description_in(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.description.insert(locale.into(), text.into());
        self
    }

    pub fn sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn collection(mut self) -> Self {
        self.is_collection = true;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities = Some(entities.into_iter().map(Into::into).collect());
        self
    }
}

/// One (attribute, owner type) pair of the applicability index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicability {
    pub attribute_id: u64,
    pub owner_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Highest surrogate id ever issued for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub table: String,
    pub last_id: u64,
}

/// Polymorphic reference to a host entity instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub owner_type: String,
    pub owner_id: u64,
}

impl OwnerRef {
    pub fn new(owner_type: impl Into<String>, owner_id: u64) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRecord {
    pub id: u64,
    pub content: Content,
    pub attribute_id: u64,
    pub owner_id: u64,
    pub owner_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ValueRecord {
    pub fn owner(&self) -> OwnerRef {
        OwnerRef::new(self.owner_type.clone(), self.owner_id)
    }
}

/// Conjunctive filter over value rows. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueFilter {
    pub attribute_id: Option<u64>,
    pub owner_id: Option<u64>,
    pub owner_type: Option<String>,
}

impl ValueFilter {
    /// Filter selecting the values one owner holds for one attribute.
    pub fn for_owner(attribute_id: u64, owner: &OwnerRef) -> Self {
        Self {
            attribute_id: Some(attribute_id),
            owner_id: Some(owner.owner_id),
            owner_type: Some(owner.owner_type.clone()),
        }
    }

    pub fn attribute(mut self, attribute_id: u64) -> Self {
        self.attribute_id = Some(attribute_id);
        self
    }

    pub fn owner_id(mut self, owner_id: u64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn owner_type(mut self, owner_type: impl Into<String>) -> Self {
        self.owner_type = Some(owner_type.into());
        self
    }

    pub fn matches(&self, record: &ValueRecord) -> bool {
        self.attribute_id.is_none_or(|id| record.attribute_id == id)
            && self.owner_id.is_none_or(|id| record.owner_id == id)
            && self
                .owner_type
                .as_deref()
                .is_none_or(|t| record.owner_type == t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(attribute_id: u64, owner_type: &str, owner_id: u64) -> ValueRecord {
        ValueRecord {
            id: 1,
            content: Content::Integer(1),
            attribute_id,
            owner_id,
            owner_type: owner_type.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn filter_for_owner_matches_exact_triple() {
        let filter = ValueFilter::for_owner(5, &OwnerRef::new("Post", 10));
        assert!(filter.matches(&record(5, "Post", 10)));
        assert!(!filter.matches(&record(6, "Post", 10)));
        assert!(!filter.matches(&record(5, "Comment", 10)));
        assert!(!filter.matches(&record(5, "Post", 11)));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = ValueFilter::default();
        assert!(filter.matches(&record(1, "Post", 1)));
        assert!(filter.matches(&record(9, "User", 3)));
    }

    #[test]
    fn partial_filter() {
        let filter = ValueFilter::default().owner_type("Post");
        assert!(filter.matches(&record(1, "Post", 1)));
        assert!(!filter.matches(&record(1, "User", 1)));
    }

    #[test]
    fn display_name_fallbacks() {
        let def = AttributeDefinition {
            id: 1,
            slug: "rating".into(),
            name: [("de".to_string(), "Bewertung".to_string())].into(),
            description: LocalizedText::new(),
            sort_order: 1,
            group: None,
            content_type: "integer".into(),
            is_required: false,
            is_collection: false,
            default: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(def.display_name("de"), Some("Bewertung"));
        // no "fr", no "en": falls back to whatever exists
        assert_eq!(def.display_name("fr"), Some("Bewertung"));
    }

    #[test]
    fn input_builder() {
        let input = DefinitionInput::new("Tags", "varchar")
            .collection()
            .group("meta")
            .entities(["Post", "Page"]);
        assert_eq!(input.name.get(DEFAULT_LOCALE).map(String::as_str), Some("Tags"));
        assert!(input.is_collection);
        assert!(!input.is_required);
        assert_eq!(input.group.as_deref(), Some("meta"));
        assert_eq!(
            input.entities,
            Some(vec!["Post".to_string(), "Page".to_string()])
        );
    }
}
