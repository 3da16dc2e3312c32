use thiserror::Error;

use crate::document::{DocumentId, RevisionId};

/// Which uniquely-keyed document attribute collided within a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionField {
    Slug,
    Title,
    /// Another translation of the same parent already exists in the locale.
    Parent,
}

impl std::fmt::Display for CollisionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollisionField::Slug => write!(f, "slug"),
            CollisionField::Title => write!(f, "title"),
            CollisionField::Parent => write!(f, "translation"),
        }
    }
}

/// Errors produced by the knowledge-base core.
#[derive(Debug, Error)]
pub enum KbError {
    /// A structural document/revision invariant would be broken by the write.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A (value, locale) uniqueness key is already taken.
    #[error("a document with {field} {value:?} already exists in locale {locale}")]
    Collision {
        field: CollisionField,
        locale: String,
        value: String,
    },

    /// The caller submitted a `based_on` that does not belong to the origin
    /// document. Never auto-corrected; `suggested` is offered for resubmission.
    #[error("based_on revision {based_on} is not a revision of the origin document")]
    CallerContract {
        based_on: RevisionId,
        /// The document `based_on` should point into; absent for a brand-new
        /// origin document, which has no revisions yet.
        origin: Option<DocumentId>,
        suggested: Option<RevisionId>,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl KbError {
    pub fn invariant(message: impl Into<String>) -> Self {
        KbError::InvariantViolation(message.into())
    }

    pub fn document_not_found(id: DocumentId) -> Self {
        KbError::NotFound {
            entity: "document",
            id: id.to_string(),
        }
    }

    pub fn revision_not_found(id: RevisionId) -> Self {
        KbError::NotFound {
            entity: "revision",
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for KbError {
    fn from(err: sqlx::Error) -> Self {
        KbError::Storage(err.to_string())
    }
}

/// Result alias for core operations.
pub type KbResult<T> = Result<T, KbError>;
