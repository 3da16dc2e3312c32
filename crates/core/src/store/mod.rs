//! Persistence seams.
//!
//! Stores are trusted to serialize writes to a single row and to enforce the
//! unique keys `(slug, locale)`, `(title, locale)` and `(parent, locale)`,
//! reporting violations as `KbError::Collision`. The read-validate-write
//! sequence in the service is not atomic across callers.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::document::{Document, DocumentId, RevisionId};
use crate::error::KbResult;
use crate::revision::Revision;

pub use memory::{MemoryKeyValueStore, MemoryStore};
pub use postgres::PgStore;

/// Mutable document headers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: DocumentId) -> KbResult<Option<Document>>;

    async fn find_by_slug(&self, locale: &str, slug: &str) -> KbResult<Option<Document>>;

    async fn find_by_title(&self, locale: &str, title: &str) -> KbResult<Option<Document>>;

    /// All translations whose parent is `parent`.
    async fn translations(&self, parent: DocumentId) -> KbResult<Vec<Document>>;

    /// Non-localizable origin documents in `locale`; redirect stubs are among them.
    async fn redirect_candidates(&self, locale: &str) -> KbResult<Vec<Document>>;

    /// Insert a new document. `doc.id` is ignored; the stored copy is returned.
    async fn insert(&self, doc: &Document) -> KbResult<Document>;

    async fn update(&self, doc: &Document) -> KbResult<()>;

    async fn delete(&self, id: DocumentId) -> KbResult<()>;
}

/// Append-style revision records. Only moderation fields change after insert.
#[async_trait]
pub trait RevisionStore: Send + Sync {
    async fn get(&self, id: RevisionId) -> KbResult<Option<Revision>>;

    /// Revisions of a document in ascending id order.
    async fn for_document(&self, document: DocumentId) -> KbResult<Vec<Revision>>;

    /// Insert a revision, assigning the next id. `rev.id` is ignored.
    async fn insert(&self, rev: &Revision) -> KbResult<Revision>;

    /// Persist reviewer, review time, approval, significance and readiness.
    async fn update_moderation(&self, rev: &Revision) -> KbResult<()>;

    async fn delete(&self, id: RevisionId) -> KbResult<()>;

    async fn delete_for_document(&self, document: DocumentId) -> KbResult<()>;
}

/// Generic key/value primitive backing the edit lock. No TTL semantics.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> KbResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> KbResult<()>;

    async fn delete(&self, key: &str) -> KbResult<()>;
}
