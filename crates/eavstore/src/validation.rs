//! Validation rules for attribute definitions, and the contract for
//! validating candidate values.
//!
//! Definition fields:
//! - `name`: at least one non-blank translation, each at most 150 characters, no markup
//! - `content_type`: required, at most 150 characters
//! - `slug`: non-empty, alphanumeric plus `-`/`_`, at most 150 characters
//! - `sort_order`: at most 10000
//! - `group`: at most 150 characters, no markup
//! - `default`: at most 10000 characters, no markup
//!
//! Candidate values are checked by a [`ValueValidator`] supplied by the
//! embedding application; the core only surfaces its verdict.

use crate::content::Content;
use crate::model::{AttributeDefinition, DefinitionInput};

pub const MAX_NAME_LEN: usize = 150;
pub const MAX_SLUG_LEN: usize = 150;
pub const MAX_GROUP_LEN: usize = 150;
pub const MAX_TYPE_LEN: usize = 150;
pub const MAX_DEFAULT_LEN: usize = 10_000;
pub const MAX_SORT_ORDER: i64 = 10_000;

/// Validates the caller-supplied fields of a definition.
///
/// The slug is checked separately by [`validate_slug`] once it has been
/// normalized or derived from the name.
pub fn validate_definition(input: &DefinitionInput) -> Result<(), DefinitionValidationError> {
    if input.name.values().all(|n| n.trim().is_empty()) {
        return Err(DefinitionValidationError::MissingName);
    }
    for name in input.name.values() {
        check_len("name", name, MAX_NAME_LEN)?;
        check_markup("name", name)?;
    }

    if input.content_type.trim().is_empty() {
        return Err(DefinitionValidationError::MissingContentType);
    }
    check_len("content_type", &input.content_type, MAX_TYPE_LEN)?;

    if let Some(order) = input.sort_order {
        if order > MAX_SORT_ORDER {
            return Err(DefinitionValidationError::SortOrderOutOfRange(order));
        }
    }

    if let Some(group) = &input.group {
        check_len("group", group, MAX_GROUP_LEN)?;
        check_markup("group", group)?;
    }

    if let Some(default) = &input.default {
        check_len("default", default, MAX_DEFAULT_LEN)?;
        check_markup("default", default)?;
    }

    Ok(())
}

/// Validates a normalized slug.
pub fn validate_slug(slug: &str) -> Result<(), DefinitionValidationError> {
    if slug.is_empty() {
        return Err(DefinitionValidationError::EmptySlug);
    }
    check_len("slug", slug, MAX_SLUG_LEN)?;
    if let Some(ch) = slug
        .chars()
        .find(|ch| !(ch.is_alphanumeric() || *ch == '-' || *ch == '_'))
    {
        return Err(DefinitionValidationError::InvalidSlugCharacter(ch));
    }
    Ok(())
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), DefinitionValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(DefinitionValidationError::TooLong { field, max, len });
    }
    Ok(())
}

fn check_markup(field: &'static str, value: &str) -> Result<(), DefinitionValidationError> {
    if contains_markup(value) {
        return Err(DefinitionValidationError::ContainsMarkup(field));
    }
    Ok(())
}

/// A `<` followed somewhere later by a `>` is treated as a tag.
fn contains_markup(value: &str) -> bool {
    value
        .find('<')
        .is_some_and(|open| value[open..].contains('>'))
}

/// Error type for definition validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionValidationError {
    /// No non-blank translation of the name
    MissingName,
    /// Empty content type
    MissingContentType,
    /// Slug normalized to nothing
    EmptySlug,
    /// Slug contains a character outside alphanumerics, `-` and `_`
    InvalidSlugCharacter(char),
    /// A field exceeds its length limit
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },
    /// A field contains HTML-like markup
    ContainsMarkup(&'static str),
    /// sort_order above the permitted maximum
    SortOrderOutOfRange(i64),
}

impl std::fmt::Display for DefinitionValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefinitionValidationError::MissingName => write!(f, "attribute name is required"),
            DefinitionValidationError::MissingContentType => {
                write!(f, "attribute content type is required")
            }
            DefinitionValidationError::EmptySlug => write!(f, "attribute slug cannot be empty"),
            DefinitionValidationError::InvalidSlugCharacter(ch) => {
                write!(
                    f,
                    "slug contains invalid character '{}' (only alphanumeric, underscore, and hyphen allowed)",
                    ch
                )
            }
            DefinitionValidationError::TooLong { field, max, len } => {
                write!(f, "{} is {} characters, limit is {}", field, len, max)
            }
            DefinitionValidationError::ContainsMarkup(field) => {
                write!(f, "{} cannot contain markup", field)
            }
            DefinitionValidationError::SortOrderOutOfRange(order) => {
                write!(f, "sort order {} exceeds {}", order, MAX_SORT_ORDER)
            }
        }
    }
}

impl std::error::Error for DefinitionValidationError {}

/// Validates a candidate value against a definition's declared rules before
/// it is written. A rejection carries a human-readable reason.
pub trait ValueValidator: Send + Sync {
    fn validate(&self, definition: &AttributeDefinition, content: &Content) -> Result<(), String>;
}

/// Validator that accepts every value.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ValueValidator for AcceptAll {
    fn validate(&self, _definition: &AttributeDefinition, _content: &Content) -> Result<(), String> {
        Ok(())
    }
}

impl<F> ValueValidator for F
where
    F: Fn(&AttributeDefinition, &Content) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, definition: &AttributeDefinition, content: &Content) -> Result<(), String> {
        self(definition, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_definition() {
        let input = DefinitionInput::new("Rating", "integer")
            .group("reviews")
            .default_value("3");
        assert!(validate_definition(&input).is_ok());
    }

    #[test]
    fn test_missing_name() {
        let input = DefinitionInput::new("   ", "integer");
        assert_eq!(
            validate_definition(&input),
            Err(DefinitionValidationError::MissingName)
        );

        let mut no_names = DefinitionInput::new("x", "integer");
        no_names.name.clear();
        assert_eq!(
            validate_definition(&no_names),
            Err(DefinitionValidationError::MissingName)
        );
    }

    #[test]
    fn test_missing_content_type() {
        let input = DefinitionInput::new("Rating", "");
        assert_eq!(
            validate_definition(&input),
            Err(DefinitionValidationError::MissingContentType)
        );
    }

    #[test]
    fn test_name_too_long() {
        let input = DefinitionInput::new("a".repeat(MAX_NAME_LEN + 1), "integer");
        assert!(matches!(
            validate_definition(&input),
            Err(DefinitionValidationError::TooLong { field: "name", .. })
        ));
    }

    #[test]
    fn test_markup_rejected() {
        let input = DefinitionInput::new("<b>Rating</b>", "integer");
        assert_eq!(
            validate_definition(&input),
            Err(DefinitionValidationError::ContainsMarkup("name"))
        );

        let input = DefinitionInput::new("Rating", "integer").group("<i>x</i>");
        assert_eq!(
            validate_definition(&input),
            Err(DefinitionValidationError::ContainsMarkup("group"))
        );
    }

    #[test]
    fn test_angle_brackets_without_tag_allowed() {
        let input = DefinitionInput::new("Score > 5", "integer");
        assert!(validate_definition(&input).is_ok());
    }

    #[test]
    fn test_sort_order_limit() {
        let input = DefinitionInput::new("Rating", "integer").sort_order(MAX_SORT_ORDER + 1);
        assert_eq!(
            validate_definition(&input),
            Err(DefinitionValidationError::SortOrderOutOfRange(MAX_SORT_ORDER + 1))
        );
    }

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("release_date").is_ok());
        assert!(validate_slug("release-date-2").is_ok());
        assert_eq!(validate_slug(""), Err(DefinitionValidationError::EmptySlug));
        assert_eq!(
            validate_slug("release date"),
            Err(DefinitionValidationError::InvalidSlugCharacter(' '))
        );
        assert!(validate_slug(&"a".repeat(MAX_SLUG_LEN + 1)).is_err());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            DefinitionValidationError::MissingName.to_string(),
            "attribute name is required"
        );
        assert_eq!(
            DefinitionValidationError::TooLong {
                field: "group",
                max: 150,
                len: 151
            }
            .to_string(),
            "group is 151 characters, limit is 150"
        );
    }

    #[test]
    fn test_closure_validator() {
        let positive = |_: &AttributeDefinition, content: &Content| match content.as_integer() {
            Some(v) if v < 0 => Err("must be positive".to_string()),
            _ => Ok(()),
        };
        let def = AttributeDefinition {
            id: 1,
            slug: "rating".into(),
            name: Default::default(),
            description: Default::default(),
            sort_order: 1,
            group: None,
            content_type: "integer".into(),
            is_required: false,
            is_collection: false,
            default: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert!(positive.validate(&def, &Content::Integer(1)).is_ok());
        assert!(positive.validate(&def, &Content::Integer(-1)).is_err());
        assert!(AcceptAll.validate(&def, &Content::Integer(-1)).is_ok());
    }
}
