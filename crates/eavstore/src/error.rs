use thiserror::Error;

#[derive(Error, Debug)]
pub enum EavError {
    #[error("Unknown attribute type: {0}")]
    UnknownAttributeType(String),

    #[error("No value store registered for type '{0}'")]
    UnresolvedValueStore(String),

    #[error("Attribute slug '{slug}' collides with a native field of '{owner_type}'")]
    SlugCollision { slug: String, owner_type: String },

    #[error("Unknown owner type: {0}")]
    UnknownOwnerType(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(u64),

    #[error("Record {id} not found in {table}")]
    RecordNotFound { table: String, id: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

impl EavError {
    /// Errors caused by how the system was set up rather than by the request.
    /// These are never worth retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EavError::UnknownAttributeType(_)
                | EavError::UnresolvedValueStore(_)
                | EavError::SlugCollision { .. }
                | EavError::UnknownOwnerType(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_family() {
        assert!(EavError::UnknownAttributeType("x".into()).is_configuration());
        assert!(EavError::UnresolvedValueStore("x".into()).is_configuration());
        assert!(EavError::SlugCollision {
            slug: "title".into(),
            owner_type: "Post".into()
        }
        .is_configuration());
        assert!(!EavError::ConstraintViolation("dup".into()).is_configuration());
        assert!(!EavError::ValidationFailed("bad".into()).is_configuration());
    }

    #[test]
    fn display_messages() {
        let err = EavError::TypeMismatch {
            expected: "integer".into(),
            found: "varchar".into(),
        };
        assert_eq!(err.to_string(), "Type mismatch: expected integer, found varchar");
    }
}
