//! Advisory "who is editing this document" marker.
//!
//! Not a mutex: nothing is ever blocked on it. A second editor is warned
//! that someone else is working on the document and may take over; the
//! original holder's entry clears itself when they submit.
//!
//! # Invariants
//!
//! - `steal` always succeeds and overwrites the holder (last writer wins).
//! - `release` only clears the entry if the caller is still the holder; a
//!   `false` return is the normal "someone else took over" signal.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::document::DocumentId;
use crate::error::KbResult;
use crate::store::KeyValueStore;

/// Outcome of [`EditLock::claim`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "holder", rename_all = "camelCase")]
pub enum LockStatus {
    /// The caller now holds the lock (or already did).
    Acquired,
    /// Someone else holds it; nothing was changed.
    HeldBy(String),
}

/// Edit lock stored in a [`KeyValueStore`], one entry per document.
#[derive(Clone)]
pub struct EditLock {
    store: Arc<dyn KeyValueStore>,
}

impl EditLock {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(doc_id: DocumentId) -> String {
        format!("kb:document:{doc_id}:lock")
    }

    /// Current holder, if any.
    pub async fn check(&self, doc_id: DocumentId) -> KbResult<Option<String>> {
        self.store.get(&Self::key(doc_id)).await
    }

    /// Take the lock regardless of who holds it.
    pub async fn steal(&self, doc_id: DocumentId, holder: &str) -> KbResult<()> {
        self.store.set(&Self::key(doc_id), holder).await?;
        info!(document_id = %doc_id, holder, "edit lock taken");
        Ok(())
    }

    /// Clear the lock if `holder` still holds it.
    pub async fn release(&self, doc_id: DocumentId, holder: &str) -> KbResult<bool> {
        let key = Self::key(doc_id);
        match self.store.get(&key).await? {
            Some(current) if current == holder => {
                self.store.delete(&key).await?;
                debug!(document_id = %doc_id, holder, "edit lock released");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Take the lock only if it is free or already ours.
    pub async fn claim(&self, doc_id: DocumentId, holder: &str) -> KbResult<LockStatus> {
        match self.check(doc_id).await? {
            Some(current) if current != holder => Ok(LockStatus::HeldBy(current)),
            Some(_) => Ok(LockStatus::Acquired),
            None => {
                self.steal(doc_id, holder).await?;
                Ok(LockStatus::Acquired)
            }
        }
    }

    /// Drop the entry whoever holds it; used when the document goes away.
    pub async fn clear(&self, doc_id: DocumentId) -> KbResult<()> {
        self.store.delete(&Self::key(doc_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKeyValueStore;

    fn lock() -> EditLock {
        EditLock::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[tokio::test]
    async fn check_has_no_side_effect() {
        let lock = lock();
        assert_eq!(lock.check(DocumentId(1)).await.unwrap(), None);
        assert_eq!(lock.check(DocumentId(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn release_by_holder_clears() {
        let lock = lock();
        lock.steal(DocumentId(1), "alice").await.unwrap();
        assert_eq!(lock.check(DocumentId(1)).await.unwrap().as_deref(), Some("alice"));
        assert!(lock.release(DocumentId(1), "alice").await.unwrap());
        assert_eq!(lock.check(DocumentId(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn release_after_steal_reports_takeover() {
        let lock = lock();
        lock.steal(DocumentId(1), "alice").await.unwrap();
        lock.steal(DocumentId(1), "bob").await.unwrap();

        assert!(!lock.release(DocumentId(1), "alice").await.unwrap());
        assert_eq!(lock.check(DocumentId(1)).await.unwrap().as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn claim_does_not_overwrite_other_holder() {
        let lock = lock();
        assert_eq!(lock.claim(DocumentId(1), "alice").await.unwrap(), LockStatus::Acquired);
        assert_eq!(lock.claim(DocumentId(1), "alice").await.unwrap(), LockStatus::Acquired);
        assert_eq!(
            lock.claim(DocumentId(1), "bob").await.unwrap(),
            LockStatus::HeldBy("alice".into())
        );
        assert_eq!(lock.check(DocumentId(1)).await.unwrap().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn locks_are_per_document() {
        let lock = lock();
        lock.steal(DocumentId(1), "alice").await.unwrap();
        assert_eq!(lock.check(DocumentId(2)).await.unwrap(), None);
    }
}
