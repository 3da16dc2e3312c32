//! In-memory stores for tests and database-less runs.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{DocumentStore, KeyValueStore, RevisionStore};
use crate::document::{Document, DocumentId, RevisionId};
use crate::error::{CollisionField, KbError, KbResult};
use crate::revision::Revision;

#[derive(Debug, Default)]
struct Inner {
    documents: BTreeMap<DocumentId, Document>,
    revisions: BTreeMap<RevisionId, Revision>,
    last_document_id: i64,
    last_revision_id: i64,
}

impl Inner {
    /// Null out `based_on` references to deleted revisions.
    fn clear_dangling_based_on(&mut self) {
        let existing: HashSet<RevisionId> = self.revisions.keys().copied().collect();
        for rev in self.revisions.values_mut() {
            if rev.based_on_id.is_some_and(|id| !existing.contains(&id)) {
                rev.based_on_id = None;
            }
        }
    }

    /// Enforce the per-locale unique keys against every other document.
    fn check_unique(&self, doc: &Document) -> KbResult<()> {
        for other in self.documents.values() {
            if other.id == doc.id || other.locale != doc.locale {
                continue;
            }
            let field = if other.slug == doc.slug {
                Some((CollisionField::Slug, doc.slug.clone()))
            } else if other.title == doc.title {
                Some((CollisionField::Title, doc.title.clone()))
            } else if doc.parent_id.is_some() && other.parent_id == doc.parent_id {
                Some((
                    CollisionField::Parent,
                    doc.parent_id.map(|p| p.to_string()).unwrap_or_default(),
                ))
            } else {
                None
            };
            if let Some((field, value)) = field {
                return Err(KbError::Collision {
                    field,
                    locale: doc.locale.clone(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Thread-safe in-memory document and revision store.
///
/// Implements both `DocumentStore` and `RevisionStore`; share one instance
/// behind an `Arc` for both roles.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents (for tests).
    pub fn document_count(&self) -> usize {
        self.inner.read().documents.len()
    }

    /// Number of stored revisions (for tests).
    pub fn revision_count(&self) -> usize {
        self.inner.read().revisions.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: DocumentId) -> KbResult<Option<Document>> {
        Ok(self.inner.read().documents.get(&id).cloned())
    }

    async fn find_by_slug(&self, locale: &str, slug: &str) -> KbResult<Option<Document>> {
        let inner = self.inner.read();
        Ok(inner
            .documents
            .values()
            .find(|d| d.locale == locale && d.slug == slug)
            .cloned())
    }

    async fn find_by_title(&self, locale: &str, title: &str) -> KbResult<Option<Document>> {
        let inner = self.inner.read();
        Ok(inner
            .documents
            .values()
            .find(|d| d.locale == locale && d.title == title)
            .cloned())
    }

    async fn translations(&self, parent: DocumentId) -> KbResult<Vec<Document>> {
        let inner = self.inner.read();
        Ok(inner
            .documents
            .values()
            .filter(|d| d.parent_id == Some(parent))
            .cloned()
            .collect())
    }

    async fn redirect_candidates(&self, locale: &str) -> KbResult<Vec<Document>> {
        let inner = self.inner.read();
        Ok(inner
            .documents
            .values()
            .filter(|d| d.locale == locale && !d.is_localizable && d.parent_id.is_none())
            .cloned()
            .collect())
    }

    async fn insert(&self, doc: &Document) -> KbResult<Document> {
        let mut inner = self.inner.write();
        let mut stored = doc.clone();
        stored.id = DocumentId(inner.last_document_id + 1);
        inner.check_unique(&stored)?;
        inner.last_document_id = stored.id.0;
        inner.documents.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, doc: &Document) -> KbResult<()> {
        let mut inner = self.inner.write();
        if !inner.documents.contains_key(&doc.id) {
            return Err(KbError::document_not_found(doc.id));
        }
        inner.check_unique(doc)?;
        inner.documents.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn delete(&self, id: DocumentId) -> KbResult<()> {
        self.inner.write().documents.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl RevisionStore for MemoryStore {
    async fn get(&self, id: RevisionId) -> KbResult<Option<Revision>> {
        Ok(self.inner.read().revisions.get(&id).cloned())
    }

    async fn for_document(&self, document: DocumentId) -> KbResult<Vec<Revision>> {
        let inner = self.inner.read();
        Ok(inner
            .revisions
            .values()
            .filter(|r| r.document_id == document)
            .cloned()
            .collect())
    }

    async fn insert(&self, rev: &Revision) -> KbResult<Revision> {
        let mut inner = self.inner.write();
        if !inner.documents.contains_key(&rev.document_id) {
            return Err(KbError::document_not_found(rev.document_id));
        }
        inner.last_revision_id += 1;
        let mut stored = rev.clone();
        stored.id = RevisionId(inner.last_revision_id);
        inner.revisions.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_moderation(&self, rev: &Revision) -> KbResult<()> {
        let mut inner = self.inner.write();
        let stored = inner
            .revisions
            .get_mut(&rev.id)
            .ok_or_else(|| KbError::revision_not_found(rev.id))?;
        stored.reviewer = rev.reviewer.clone();
        stored.reviewed_at = rev.reviewed_at;
        stored.significance = rev.significance;
        stored.is_approved = rev.is_approved;
        stored.is_ready_for_localization = rev.is_ready_for_localization;
        stored.readied_for_localization_at = rev.readied_for_localization_at;
        stored.readied_for_localization_by = rev.readied_for_localization_by.clone();
        Ok(())
    }

    async fn delete(&self, id: RevisionId) -> KbResult<()> {
        let mut inner = self.inner.write();
        inner.revisions.remove(&id);
        inner.clear_dangling_based_on();
        Ok(())
    }

    async fn delete_for_document(&self, document: DocumentId) -> KbResult<()> {
        let mut inner = self.inner.write();
        inner.revisions.retain(|_, r| r.document_id != document);
        inner.clear_dangling_based_on();
        Ok(())
    }
}

/// In-memory key/value store.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> KbResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> KbResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> KbResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Category, RevisionDraft};
    use chrono::Utc;

    fn doc(title: &str, slug: &str, locale: &str) -> Document {
        Document {
            id: DocumentId(0),
            title: title.into(),
            slug: slug.into(),
            locale: locale.into(),
            category: Category::HowTo,
            is_archived: false,
            is_template: false,
            is_localizable: true,
            parent_id: None,
            current_revision_id: None,
            latest_localizable_revision_id: None,
            html: String::new(),
            contributors: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = DocumentStore::insert(&store, &doc("A", "a", "en-US")).await.unwrap();
        let b = DocumentStore::insert(&store, &doc("B", "b", "en-US")).await.unwrap();
        assert!(b.id > a.id);

        let draft = RevisionDraft {
            content: "x".into(),
            creator: "alice".into(),
            ..Default::default()
        };
        let r1 = RevisionStore::insert(&store, &Revision::from_draft(a.id, draft.clone(), Utc::now()))
            .await
            .unwrap();
        let r2 = RevisionStore::insert(&store, &Revision::from_draft(b.id, draft, Utc::now()))
            .await
            .unwrap();
        assert!(r2.id > r1.id);
    }

    #[tokio::test]
    async fn enforces_unique_keys_per_locale() {
        let store = MemoryStore::new();
        DocumentStore::insert(&store, &doc("Foo", "foo", "en-US")).await.unwrap();

        let slug_clash = DocumentStore::insert(&store, &doc("Other", "foo", "en-US")).await;
        assert!(matches!(
            slug_clash,
            Err(KbError::Collision { field: CollisionField::Slug, .. })
        ));

        let title_clash = DocumentStore::insert(&store, &doc("Foo", "other", "en-US")).await;
        assert!(matches!(
            title_clash,
            Err(KbError::Collision { field: CollisionField::Title, .. })
        ));

        DocumentStore::insert(&store, &doc("Foo", "foo", "de")).await.unwrap();
        assert_eq!(store.document_count(), 2);
    }

    #[tokio::test]
    async fn one_translation_per_parent_and_locale() {
        let store = MemoryStore::new();
        let parent = DocumentStore::insert(&store, &doc("Foo", "foo", "en-US")).await.unwrap();

        let mut t1 = doc("Foo de", "foo-de", "de");
        t1.parent_id = Some(parent.id);
        DocumentStore::insert(&store, &t1).await.unwrap();

        let mut t2 = doc("Foo de 2", "foo-de-2", "de");
        t2.parent_id = Some(parent.id);
        assert!(matches!(
            DocumentStore::insert(&store, &t2).await,
            Err(KbError::Collision { field: CollisionField::Parent, .. })
        ));
    }

    #[tokio::test]
    async fn key_value_round_trip() {
        let kv = MemoryKeyValueStore::new();
        assert_eq!(kv.get("k").await.unwrap(), None);
        kv.set("k", "v").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v"));
        kv.delete("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
    }
}
