//! Document service: create, edit, review, rename and delete, with every
//! invariant re-validated before any write.
//!
//! Each operation validates first and commits after; a failed validation
//! leaves the stores untouched. Events are published once the writes are done.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::KbConfig;
use crate::document::validate::{
    check_localizable_with_translations, check_parent, inherit_from_parent, is_template_title,
    resolve_localizable, validate_document_fields,
};
use crate::document::{
    Document, DocumentFields, DocumentId, NewDocument, ProposedChange, RevisionDraft, RevisionId,
};
use crate::error::{CollisionField, KbError, KbResult};
use crate::events::{ChangeKind, DocumentChanged, EventBus};
use crate::l10n::{self, LocalizationEngine};
use crate::lock::EditLock;
use crate::redirect::RedirectManager;
use crate::render::{MarkupRenderer, Renderer};
use crate::revision::workflow::{
    apply_review, based_on_is_clean, clear_ready, new_contributors, set_ready, should_promote,
};
use crate::revision::{diff, ReviewDecision, Revision, Significance};
use crate::store::{DocumentStore, KeyValueStore, MemoryKeyValueStore, MemoryStore, RevisionStore};


/// Orchestrates the stores, localization engine, redirect manager and edit
/// lock into the knowledge base's write operations.
#[derive(Clone)]
pub struct DocumentService {
    documents: Arc<dyn DocumentStore>,
    revisions: Arc<dyn RevisionStore>,
    renderer: Arc<dyn Renderer>,
    events: EventBus,
    lock: EditLock,
    l10n: LocalizationEngine,
    redirects: RedirectManager,
    config: KbConfig,
}

impl DocumentService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        revisions: Arc<dyn RevisionStore>,
        kv: Arc<dyn KeyValueStore>,
        renderer: Arc<dyn Renderer>,
        events: EventBus,
        config: KbConfig,
    ) -> Self {
        Self {
            l10n: LocalizationEngine::new(documents.clone(), revisions.clone()),
            redirects: RedirectManager::new(
                documents.clone(),
                revisions.clone(),
                renderer.clone(),
                config.clone(),
            ),
            lock: EditLock::new(kv),
            documents,
            revisions,
            renderer,
            events,
            config,
        }
    }

    /// Service over fresh in-memory stores and the markup renderer.
    pub fn in_memory(config: KbConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let events = EventBus::new(config.event_bus_capacity);
        Self::new(
            store.clone(),
            store,
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(MarkupRenderer),
            events,
            config,
        )
    }

    pub fn config(&self) -> &KbConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn edit_lock(&self) -> &EditLock {
        &self.lock
    }

    pub fn localization(&self) -> &LocalizationEngine {
        &self.l10n
    }

    pub fn redirects(&self) -> &RedirectManager {
        &self.redirects
    }

    // ----- queries -------------------------------------------------------

    pub async fn document(&self, id: DocumentId) -> KbResult<Document> {
        self.documents
            .get(id)
            .await?
            .ok_or_else(|| KbError::document_not_found(id))
    }

    pub async fn document_by_slug(&self, locale: &str, slug: &str) -> KbResult<Document> {
        self.documents
            .find_by_slug(locale, slug)
            .await?
            .ok_or_else(|| KbError::NotFound {
                entity: "document",
                id: format!("{locale}/{slug}"),
            })
    }

    pub async fn revision(&self, id: RevisionId) -> KbResult<Revision> {
        self.revisions
            .get(id)
            .await?
            .ok_or_else(|| KbError::revision_not_found(id))
    }

    pub async fn revisions_of(&self, id: DocumentId) -> KbResult<Vec<Revision>> {
        self.document(id).await?;
        self.revisions.for_document(id).await
    }

    pub async fn translations_of(&self, id: DocumentId) -> KbResult<Vec<Document>> {
        self.document(id).await?;
        self.documents.translations(id).await
    }

    pub async fn localizable_or_latest(
        &self,
        id: DocumentId,
        include_rejected: bool,
    ) -> KbResult<Option<Revision>> {
        let doc = self.document(id).await?;
        self.l10n.localizable_or_latest(&doc, include_rejected).await
    }

    pub async fn is_outdated(&self, id: DocumentId, level: Significance) -> KbResult<bool> {
        let doc = self.document(id).await?;
        self.l10n.is_outdated(&doc, level).await
    }

    pub async fn is_majorly_outdated(&self, id: DocumentId) -> KbResult<bool> {
        let doc = self.document(id).await?;
        self.l10n.is_majorly_outdated(&doc).await
    }

    pub async fn translated_to(&self, id: DocumentId, locale: &str) -> KbResult<Option<Document>> {
        let doc = self.document(id).await?;
        self.l10n.translated_to(&doc, locale).await
    }

    pub async fn redirect_target(&self, id: DocumentId) -> KbResult<Option<Document>> {
        let doc = self.document(id).await?;
        self.redirects.redirect_target(&doc).await
    }

    /// Unified diff of two revisions' content.
    pub async fn revision_diff(&self, from: RevisionId, to: RevisionId) -> KbResult<String> {
        let from = self.revision(from).await?;
        let to = self.revision(to).await?;
        Ok(diff::unified_diff(&from, &to))
    }

    // ----- validation helpers ---------------------------------------------

    /// Check that `value` is free for `field` in `locale`. A redirect stub
    /// holding it may be reclaimed and is returned for deletion.
    async fn claim_value(
        &self,
        field: CollisionField,
        locale: &str,
        value: &str,
        own_id: Option<DocumentId>,
    ) -> KbResult<Option<Document>> {
        let existing = match field {
            CollisionField::Slug => self.documents.find_by_slug(locale, value).await?,
            CollisionField::Title => self.documents.find_by_title(locale, value).await?,
            CollisionField::Parent => None,
        };
        let Some(existing) = existing.filter(|d| Some(d.id) != own_id) else {
            return Ok(None);
        };
        if self.redirects.redirect_title(&existing).await?.is_some() {
            debug!(
                redirect_id = %existing.id,
                %field,
                value,
                "reclaiming value held by a redirect"
            );
            return Ok(Some(existing));
        }
        Err(KbError::Collision {
            field,
            locale: locale.to_string(),
            value: value.to_string(),
        })
    }

    /// `based_on` must be a revision of `origin`. For a brand-new origin
    /// document (`origin` is `None`) it must be absent.
    async fn check_based_on(
        &self,
        origin: Option<&Document>,
        based_on: Option<RevisionId>,
    ) -> KbResult<()> {
        let Some(based_on_id) = based_on else {
            return Ok(());
        };
        let based_on = self.revision(based_on_id).await?;
        if let Some(origin) = origin {
            if based_on_is_clean(Some(&based_on), origin.id) {
                return Ok(());
            }
        }
        let suggested = match origin {
            Some(origin) => self
                .l10n
                .localizable_or_latest(origin, false)
                .await?
                .map(|r| r.id),
            None => None,
        };
        warn!(
            based_on = %based_on_id,
            suggested = ?suggested,
            "rejected revision with a based_on outside the origin document"
        );
        Err(KbError::CallerContract {
            based_on: based_on_id,
            origin: origin.map(|o| o.id),
            suggested,
        })
    }

    async fn origin_of(&self, doc: &Document) -> KbResult<Document> {
        self.l10n.original(doc).await
    }

    /// Delete a redirect stub whose slug or title is being reclaimed.
    async fn remove_stub(&self, stub: &Document) -> KbResult<()> {
        self.revisions.delete_for_document(stub.id).await?;
        self.documents.delete(stub.id).await?;
        self.emit(stub.id, None, ChangeKind::Deleted);
        Ok(())
    }

    async fn remove_stubs(&self, stubs: [Option<Document>; 2]) -> KbResult<()> {
        let [first, second] = stubs;
        if let Some(first) = &first {
            self.remove_stub(first).await?;
        }
        if let Some(second) = second.filter(|s| first.as_ref().map(|f| f.id) != Some(s.id)) {
            self.remove_stub(&second).await?;
        }
        Ok(())
    }

    fn emit(&self, document: DocumentId, revision: Option<RevisionId>, kind: ChangeKind) {
        self.events
            .publish(DocumentChanged::new(document, revision, kind));
    }

    /// Advance `current_revision` / `latest_localizable_revision` to `rev`
    /// where it is newer, and persist the document if anything moved.
    async fn promote(&self, doc: &mut Document, rev: &Revision) -> KbResult<(bool, bool)> {
        let mut became_current = false;
        let mut became_localizable = false;

        if rev.is_approved && should_promote(rev.id, doc.current_revision_id) {
            let revisions = self.revisions.for_document(doc.id).await?;
            let contributors = new_contributors(&revisions, doc.current_revision_id, rev.id);
            doc.contributors.extend(contributors);
            doc.current_revision_id = Some(rev.id);
            doc.html = self.renderer.render(&rev.content, &doc.locale, doc.id);
            became_current = true;
        }

        if rev.is_ready_for_localization
            && should_promote(rev.id, doc.latest_localizable_revision_id)
        {
            doc.latest_localizable_revision_id = Some(rev.id);
            became_localizable = true;
        }

        if became_current || became_localizable {
            doc.updated_at = Utc::now();
            self.documents.update(doc).await?;
        }
        Ok((became_current, became_localizable))
    }

    // ----- documents ------------------------------------------------------

    /// Create a document together with its first revision (a draft).
    pub async fn create_document(&self, new: NewDocument) -> KbResult<Document> {
        let NewDocument {
            title,
            slug,
            locale,
            category,
            parent_id,
            is_localizable,
            is_archived,
            revision,
        } = new;

        validate_document_fields(&title, &slug, &locale)?;
        if revision.creator.trim().is_empty() {
            return Err(KbError::invariant("a revision needs a creator"));
        }

        let parent = match parent_id {
            Some(parent_id) => {
                let parent = self.document(parent_id).await?;
                check_parent(&parent, &locale)?;
                if self
                    .documents
                    .translations(parent_id)
                    .await?
                    .iter()
                    .any(|t| t.locale == locale)
                {
                    return Err(KbError::Collision {
                        field: CollisionField::Parent,
                        locale,
                        value: parent_id.to_string(),
                    });
                }
                Some(parent)
            }
            None => None,
        };

        let is_localizable = resolve_localizable(&locale, is_localizable, &self.config)?;
        let (category, is_archived) = match (&parent, category) {
            (Some(parent), requested) => {
                if requested.is_some_and(|c| c != parent.category) {
                    debug!(parent_id = %parent.id, "translation category overridden by parent");
                }
                (parent.category, parent.is_archived)
            }
            (None, Some(category)) => (category, is_archived.unwrap_or(false)),
            (None, None) => {
                return Err(KbError::invariant(
                    "a document that is not a translation needs a category",
                ))
            }
        };

        let slug_stub = self
            .claim_value(CollisionField::Slug, &locale, &slug, None)
            .await?;
        let title_stub = self
            .claim_value(CollisionField::Title, &locale, &title, None)
            .await?;
        self.check_based_on(parent.as_ref(), revision.based_on_id)
            .await?;

        self.remove_stubs([slug_stub, title_stub]).await?;

        let now = Utc::now();
        let doc = Document {
            id: DocumentId(0),
            is_template: is_template_title(&title, &self.config),
            title,
            slug,
            locale,
            category,
            is_archived,
            is_localizable,
            parent_id: parent.as_ref().map(|p| p.id),
            current_revision_id: None,
            latest_localizable_revision_id: None,
            html: String::new(),
            contributors: Default::default(),
            created_at: now,
            updated_at: now,
        };
        let doc = self.documents.insert(&doc).await?;
        let rev = self
            .revisions
            .insert(&Revision::from_draft(doc.id, revision, now))
            .await?;

        info!(
            document_id = %doc.id,
            revision_id = %rev.id,
            locale = %doc.locale,
            slug = %doc.slug,
            "document created"
        );
        self.emit(doc.id, Some(rev.id), ChangeKind::Created);
        Ok(doc)
    }

    /// Apply a title/slug change and header field edits.
    ///
    /// A rename of a document that already has a current revision leaves
    /// exactly one redirect stub behind, however many of title and slug
    /// changed.
    pub async fn edit_document(
        &self,
        id: DocumentId,
        change: ProposedChange,
        fields: DocumentFields,
    ) -> KbResult<Document> {
        let stored = self.document(id).await?;
        if change.old_title != stored.title || change.old_slug != stored.slug {
            warn!(
                document_id = %id,
                "proposed change was computed against a stale copy; diffing against the stored document"
            );
        }
        let change = ProposedChange::new(&stored, change.new_title, change.new_slug);

        validate_document_fields(&change.new_title, &change.new_slug, &stored.locale)?;

        let mut doc = stored.clone();
        doc.title = change.new_title.clone();
        doc.slug = change.new_slug.clone();
        doc.is_template = is_template_title(&doc.title, &self.config);
        doc.is_localizable = match fields.is_localizable {
            Some(requested) => resolve_localizable(&doc.locale, Some(requested), &self.config)?,
            None => doc.is_localizable && doc.locale == self.config.default_locale,
        };
        if let Some(category) = fields.category {
            doc.category = category;
        }
        if let Some(is_archived) = fields.is_archived {
            doc.is_archived = is_archived;
        }

        let translations = if doc.is_translation() {
            Vec::new()
        } else {
            self.documents.translations(id).await?
        };
        check_localizable_with_translations(&doc, doc.is_localizable, translations.len())?;

        if let Some(parent_id) = doc.parent_id {
            let parent = self.document(parent_id).await?;
            inherit_from_parent(&mut doc, &parent);
        }

        let slug_stub = if change.slug_changed() {
            self.claim_value(CollisionField::Slug, &doc.locale, &doc.slug, Some(id))
                .await?
        } else {
            None
        };
        let title_stub = if change.title_changed() {
            self.claim_value(CollisionField::Title, &doc.locale, &doc.title, Some(id))
                .await?
        } else {
            None
        };

        self.remove_stubs([slug_stub, title_stub]).await?;

        doc.updated_at = Utc::now();
        self.documents.update(&doc).await?;

        for mut translation in translations {
            if translation.category != doc.category || translation.is_archived != doc.is_archived {
                translation.category = doc.category;
                translation.is_archived = doc.is_archived;
                translation.updated_at = doc.updated_at;
                self.documents.update(&translation).await?;
                debug!(
                    document_id = %translation.id,
                    parent_id = %id,
                    "cascaded category/archival state to translation"
                );
                self.emit(translation.id, translation.current_revision_id, ChangeKind::Updated);
            }
        }

        if change.is_rename() && doc.current_revision_id.is_some() {
            let (stub, stub_rev) = self.redirects.create_redirect(&doc, &change).await?;
            self.emit(stub.id, Some(stub_rev.id), ChangeKind::Created);
            self.emit(id, doc.current_revision_id, ChangeKind::Redirected);
        } else {
            self.emit(id, doc.current_revision_id, ChangeKind::Updated);
        }

        info!(document_id = %id, renamed = change.is_rename(), "document edited");
        Ok(doc)
    }

    /// Delete a document and its revisions.
    ///
    /// Refused while translations exist. Redirect stubs pointing at the
    /// document are deleted with it and its edit-lock entry is cleared.
    pub async fn delete_document(&self, id: DocumentId) -> KbResult<()> {
        let doc = self.document(id).await?;
        let translations = self.documents.translations(id).await?;
        if !translations.is_empty() {
            return Err(KbError::invariant(format!(
                "document {:?} still has {} translations; delete them first",
                doc.title,
                translations.len()
            )));
        }
        let stubs = self.redirects.redirects_to(&doc).await?;

        for stub in &stubs {
            self.remove_stub(stub).await?;
        }
        self.revisions.delete_for_document(id).await?;
        self.documents.delete(id).await?;
        self.lock.clear(id).await?;

        info!(
            document_id = %id,
            redirects = stubs.len(),
            "document deleted"
        );
        self.emit(id, None, ChangeKind::Deleted);
        Ok(())
    }

    // ----- revisions ------------------------------------------------------

    /// Append a draft revision. On success the creator's edit lock on the
    /// document is released.
    pub async fn submit_revision(&self, id: DocumentId, draft: RevisionDraft) -> KbResult<Revision> {
        let doc = self.document(id).await?;
        if draft.creator.trim().is_empty() {
            return Err(KbError::invariant("a revision needs a creator"));
        }
        let existing = self.revisions.for_document(id).await?;
        if !existing.is_empty() && draft.significance.is_none() {
            return Err(KbError::invariant(
                "only a document's first revision may omit its significance",
            ));
        }
        let origin = self.origin_of(&doc).await?;
        self.check_based_on(Some(&origin), draft.based_on_id).await?;

        let rev = self
            .revisions
            .insert(&Revision::from_draft(id, draft, Utc::now()))
            .await?;

        if !self.lock.release(id, &rev.creator).await? {
            debug!(document_id = %id, creator = %rev.creator, "edit lock not held by submitter");
        }

        info!(document_id = %id, revision_id = %rev.id, "revision submitted");
        self.emit(id, Some(rev.id), ChangeKind::Submitted);
        Ok(rev)
    }

    /// Approve or reject a draft.
    ///
    /// Approving a revision whose `based_on` is outside the origin document
    /// fails with `CallerContract`. An approved revision newer than the
    /// current one becomes current; a ready one newer than the latest
    /// localizable one becomes that.
    pub async fn review_revision(
        &self,
        rev_id: RevisionId,
        reviewer: &str,
        decision: ReviewDecision,
    ) -> KbResult<Revision> {
        let rev = self.revision(rev_id).await?;
        let mut doc = self.document(rev.document_id).await?;
        if decision.approve {
            let origin = self.origin_of(&doc).await?;
            self.check_based_on(Some(&origin), rev.based_on_id).await?;
        }

        let mut reviewed = rev;
        apply_review(&mut reviewed, &doc, reviewer, &decision, &self.config, Utc::now())?;

        self.revisions.update_moderation(&reviewed).await?;
        let (became_current, became_localizable) = self.promote(&mut doc, &reviewed).await?;

        info!(
            document_id = %doc.id,
            revision_id = %reviewed.id,
            approved = reviewed.is_approved,
            became_current,
            became_localizable,
            "revision reviewed"
        );
        let kind = if reviewed.is_approved {
            ChangeKind::Approved
        } else {
            ChangeKind::Rejected
        };
        self.emit(doc.id, Some(reviewed.id), kind);
        if reviewed.is_ready_for_localization {
            self.emit(doc.id, Some(reviewed.id), ChangeKind::ReadiedForL10n);
        }
        Ok(reviewed)
    }

    /// Flag an approved revision ready for localization.
    ///
    /// If the revision is trivial or the document is not in the default
    /// locale, the flag stays false and the revision is returned unchanged.
    pub async fn mark_ready_for_localization(
        &self,
        rev_id: RevisionId,
        user: &str,
    ) -> KbResult<Revision> {
        let rev = self.revision(rev_id).await?;
        if !rev.is_approved {
            return Err(KbError::invariant(format!(
                "revision {rev_id} is not approved and cannot be readied for localization"
            )));
        }
        let mut doc = self.document(rev.document_id).await?;

        let mut readied = rev.clone();
        if !set_ready(&mut readied, &doc, user, &self.config, Utc::now()) {
            return Ok(readied);
        }
        if readied != rev {
            self.revisions.update_moderation(&readied).await?;
        }
        let (_, became_localizable) = self.promote(&mut doc, &readied).await?;

        info!(
            document_id = %doc.id,
            revision_id = %rev_id,
            became_localizable,
            "revision ready for localization"
        );
        self.emit(doc.id, Some(rev_id), ChangeKind::ReadiedForL10n);
        Ok(readied)
    }

    /// Clear the ready flag; the latest localizable revision falls back to
    /// the next ready one if this was it.
    pub async fn clear_ready_for_localization(&self, rev_id: RevisionId) -> KbResult<Revision> {
        let rev = self.revision(rev_id).await?;
        if !rev.is_ready_for_localization {
            return Ok(rev);
        }
        let mut doc = self.document(rev.document_id).await?;

        let mut cleared = rev;
        clear_ready(&mut cleared);
        self.revisions.update_moderation(&cleared).await?;

        if doc.latest_localizable_revision_id == Some(rev_id) {
            let revisions = self.revisions.for_document(doc.id).await?;
            doc.latest_localizable_revision_id =
                l10n::replacement_localizable(&revisions, rev_id).map(|r| r.id);
            doc.updated_at = Utc::now();
            self.documents.update(&doc).await?;
        }

        info!(document_id = %doc.id, revision_id = %rev_id, "localization readiness cleared");
        self.emit(doc.id, Some(rev_id), ChangeKind::Updated);
        Ok(cleared)
    }

    /// Delete a revision, repairing `current_revision` and
    /// `latest_localizable_revision` if they pointed at it.
    pub async fn delete_revision(&self, rev_id: RevisionId) -> KbResult<()> {
        let rev = self.revision(rev_id).await?;
        let doc = self.document(rev.document_id).await?;
        let revisions = self.revisions.for_document(doc.id).await?;
        if revisions.len() <= 1 {
            return Err(KbError::invariant(format!(
                "revision {rev_id} is the only revision of {:?}; delete the document instead",
                doc.title
            )));
        }

        let mut repaired = doc.clone();
        if doc.current_revision_id == Some(rev_id) {
            let replacement = l10n::replacement_current(&revisions, rev_id);
            repaired.current_revision_id = replacement.map(|r| r.id);
            repaired.html = replacement
                .map(|r| self.renderer.render(&r.content, &doc.locale, doc.id))
                .unwrap_or_default();
        }
        if doc.latest_localizable_revision_id == Some(rev_id) {
            repaired.latest_localizable_revision_id =
                l10n::replacement_localizable(&revisions, rev_id).map(|r| r.id);
        }

        self.revisions.delete(rev_id).await?;
        if repaired != doc {
            repaired.updated_at = Utc::now();
            self.documents.update(&repaired).await?;
            info!(
                document_id = %doc.id,
                current_revision = ?repaired.current_revision_id,
                latest_localizable_revision = ?repaired.latest_localizable_revision_id,
                "repaired revision pointers after deletion"
            );
        }

        info!(document_id = %doc.id, revision_id = %rev_id, "revision deleted");
        self.emit(doc.id, Some(rev_id), ChangeKind::Deleted);
        Ok(())
    }
}
