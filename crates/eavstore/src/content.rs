//! Content kinds and typed cell values.
//!
//! Every value store holds exactly one [`ContentKind`]. Values travel through
//! the API as [`Content`], which carries its kind with it so a store can reject
//! content meant for another store.
//!
//! | Alias | Rust type | Notes |
//! |-------|-----------|-------|
//! | `boolean` | `bool` | raw input: `true`/`false`/`1`/`0` |
//! | `datetime` | `DateTime<Utc>` | raw input: RFC 3339 or `YYYY-MM-DD HH:MM:SS` |
//! | `integer` | `i64` | raw input must be integral |
//! | `text` | `String` | unbounded |
//! | `varchar` | `String` | at most [`VARCHAR_MAX_LEN`] characters |

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EavError, Result};

/// Upper bound for `varchar` content, in characters.
pub const VARCHAR_MAX_LEN: usize = 255;

const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Boolean,
    Datetime,
    Integer,
    Text,
    Varchar,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        ContentKind::Boolean,
        ContentKind::Datetime,
        ContentKind::Integer,
        ContentKind::Text,
        ContentKind::Varchar,
    ];

    /// The alias this kind is registered under by default.
    pub fn alias(&self) -> &'static str {
        match self {
            ContentKind::Boolean => "boolean",
            ContentKind::Datetime => "datetime",
            ContentKind::Integer => "integer",
            ContentKind::Text => "text",
            ContentKind::Varchar => "varchar",
        }
    }

    pub fn from_alias(alias: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.alias() == alias)
    }

    /// Physical table holding values of this kind.
    pub fn table_name(&self) -> String {
        format!("attribute_{}_values", self.alias())
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Content {
    Boolean(bool),
    Datetime(DateTime<Utc>),
    Integer(i64),
    Text(String),
    Varchar(String),
}

impl Content {
    pub fn varchar(value: impl Into<String>) -> Self {
        Content::Varchar(value.into())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Content::Text(value.into())
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Boolean(_) => ContentKind::Boolean,
            Content::Datetime(_) => ContentKind::Datetime,
            Content::Integer(_) => ContentKind::Integer,
            Content::Text(_) => ContentKind::Text,
            Content::Varchar(_) => ContentKind::Varchar,
        }
    }

    /// Parse untyped input into content of the given kind.
    ///
    /// Used for definition defaults and for callers that only hold strings.
    pub fn parse(kind: ContentKind, raw: &str) -> Result<Self> {
        let mismatch = || EavError::TypeMismatch {
            expected: kind.alias().to_string(),
            found: format!("'{}'", raw),
        };

        let content = match kind {
            ContentKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Content::Boolean(true),
                "false" | "0" => Content::Boolean(false),
                _ => return Err(mismatch()),
            },
            ContentKind::Integer => Content::Integer(raw.trim().parse().map_err(|_| mismatch())?),
            ContentKind::Datetime => {
                let raw = raw.trim();
                if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                    Content::Datetime(dt.with_timezone(&Utc))
                } else {
                    let naive = NaiveDateTime::parse_from_str(raw, SQL_DATETIME_FORMAT)
                        .map_err(|_| mismatch())?;
                    Content::Datetime(naive.and_utc())
                }
            }
            ContentKind::Text => Content::Text(raw.to_string()),
            ContentKind::Varchar => Content::Varchar(raw.to_string()),
        };
        content.check_well_formed()?;
        Ok(content)
    }

    /// Check constraints that the kind alone does not express.
    pub fn check_well_formed(&self) -> Result<()> {
        if let Content::Varchar(s) = self {
            let len = s.chars().count();
            if len > VARCHAR_MAX_LEN {
                return Err(EavError::ValidationFailed(format!(
                    "varchar content is {} characters, limit is {}",
                    len, VARCHAR_MAX_LEN
                )));
            }
        }
        Ok(())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Content::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Content::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Content::Datetime(v) => Some(*v),
            _ => None,
        }
    }

    /// String view of `text` and `varchar` content.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Content::Text(s) | Content::Varchar(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Boolean(v) => write!(f, "{}", v),
            Content::Datetime(v) => write!(f, "{}", v.to_rfc3339()),
            Content::Integer(v) => write!(f, "{}", v),
            Content::Text(s) | Content::Varchar(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Content {
    fn from(value: bool) -> Self {
        Content::Boolean(value)
    }
}

impl From<i64> for Content {
    fn from(value: i64) -> Self {
        Content::Integer(value)
    }
}

impl From<i32> for Content {
    fn from(value: i32) -> Self {
        Content::Integer(value.into())
    }
}

impl From<DateTime<Utc>> for Content {
    fn from(value: DateTime<Utc>) -> Self {
        Content::Datetime(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn alias_lookup() {
        for kind in ContentKind::ALL {
            assert_eq!(ContentKind::from_alias(kind.alias()), Some(kind));
        }
        assert_eq!(ContentKind::from_alias("decimal"), None);
    }

    #[test]
    fn table_names_follow_alias() {
        assert_eq!(ContentKind::Integer.table_name(), "attribute_integer_values");
        assert_eq!(ContentKind::Varchar.table_name(), "attribute_varchar_values");
    }

    #[test]
    fn parse_integer_rejects_fractions() {
        assert_eq!(
            Content::parse(ContentKind::Integer, " 42 ").unwrap(),
            Content::Integer(42)
        );
        match Content::parse(ContentKind::Integer, "4.5") {
            Err(EavError::TypeMismatch { expected, .. }) => assert_eq!(expected, "integer"),
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn parse_boolean_forms() {
        assert_eq!(
            Content::parse(ContentKind::Boolean, "TRUE").unwrap(),
            Content::Boolean(true)
        );
        assert_eq!(
            Content::parse(ContentKind::Boolean, "0").unwrap(),
            Content::Boolean(false)
        );
        assert!(Content::parse(ContentKind::Boolean, "maybe").is_err());
    }

    #[test]
    fn parse_datetime_forms() {
        let expected = Utc.with_ymd_and_hms(2020, 1, 1, 12, 30, 0).unwrap();
        assert_eq!(
            Content::parse(ContentKind::Datetime, "2020-01-01T12:30:00Z").unwrap(),
            Content::Datetime(expected)
        );
        assert_eq!(
            Content::parse(ContentKind::Datetime, "2020-01-01 12:30:00").unwrap(),
            Content::Datetime(expected)
        );
        assert!(Content::parse(ContentKind::Datetime, "yesterday").is_err());
    }

    #[test]
    fn varchar_length_limit() {
        let ok = "a".repeat(VARCHAR_MAX_LEN);
        assert!(Content::parse(ContentKind::Varchar, &ok).is_ok());

        let too_long = "a".repeat(VARCHAR_MAX_LEN + 1);
        assert!(matches!(
            Content::parse(ContentKind::Varchar, &too_long),
            Err(EavError::ValidationFailed(_))
        ));
        // text has no limit
        assert!(Content::parse(ContentKind::Text, &too_long).is_ok());
    }

    #[test]
    fn accessors_match_kind() {
        assert_eq!(Content::from(true).as_bool(), Some(true));
        assert_eq!(Content::from(7i32).as_integer(), Some(7));
        assert_eq!(Content::varchar("x").as_str(), Some("x"));
        assert_eq!(Content::text("y").as_str(), Some("y"));
        assert_eq!(Content::from(7i64).as_bool(), None);
    }

    #[test]
    fn serialized_shape_is_tagged() {
        let json = serde_json::to_string(&Content::Integer(42)).unwrap();
        assert_eq!(json, r#"{"kind":"integer","value":42}"#);
    }
}
