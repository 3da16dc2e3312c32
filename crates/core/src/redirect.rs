//! Redirect stubs left behind when a document is renamed.

use std::sync::Arc;

use chrono::Utc;
use kb_markup::{parse_redirect, redirect_content};
use tracing::info;

use crate::config::KbConfig;
use crate::document::{Document, DocumentId, ProposedChange, RevisionDraft};
use crate::error::{CollisionField, KbError, KbResult};
use crate::render::Renderer;
use crate::revision::Revision;
use crate::store::{DocumentStore, RevisionStore};

/// Substitute `{old}` and `{number}` in a redirect template.
pub fn fill_template(template: &str, old: &str, number: u64) -> String {
    template
        .replace("{old}", old)
        .replace("{number}", &number.to_string())
}

/// Whether `content` is a redirect marker.
pub fn is_redirect_content(content: &str) -> bool {
    parse_redirect(content).is_some()
}

/// Creates and resolves redirect stubs.
#[derive(Clone)]
pub struct RedirectManager {
    documents: Arc<dyn DocumentStore>,
    revisions: Arc<dyn RevisionStore>,
    renderer: Arc<dyn Renderer>,
    config: KbConfig,
}

impl RedirectManager {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        revisions: Arc<dyn RevisionStore>,
        renderer: Arc<dyn Renderer>,
        config: KbConfig,
    ) -> Self {
        Self {
            documents,
            revisions,
            renderer,
            config,
        }
    }

    async fn is_taken(&self, field: CollisionField, locale: &str, value: &str) -> KbResult<bool> {
        let existing = match field {
            CollisionField::Slug => self.documents.find_by_slug(locale, value).await?,
            CollisionField::Title => self.documents.find_by_title(locale, value).await?,
            CollisionField::Parent => None,
        };
        Ok(existing.is_some())
    }

    /// First `template` variant of `old` not yet used in `locale`, trying
    /// number = 1, 2, 3, ... Deterministic for a given occupied set.
    pub async fn unique_value(
        &self,
        field: CollisionField,
        locale: &str,
        template: &str,
        old: &str,
    ) -> KbResult<String> {
        let mut number = 1u64;
        loop {
            let candidate = fill_template(template, old, number);
            if !self.is_taken(field, locale, &candidate).await? {
                return Ok(candidate);
            }
            number += 1;
        }
    }

    /// Value for the stub's slug or title. A value the rename just vacated
    /// is reused as is; an unchanged one gets a numbered variant.
    async fn value_for_redirect(
        &self,
        field: CollisionField,
        locale: &str,
        old: &str,
        changed: bool,
    ) -> KbResult<String> {
        if changed && !self.is_taken(field, locale, old).await? {
            return Ok(old.to_string());
        }
        let template = match field {
            CollisionField::Title => &self.config.redirect_title_template,
            _ => &self.config.redirect_slug_template,
        };
        self.unique_value(field, locale, template, old).await
    }

    /// Create the stub for an already-saved rename of `renamed`.
    ///
    /// The stub is not localizable, keeps the category of the renamed
    /// document and has one auto-approved revision authored and reviewed by
    /// the creator of the renamed document's current revision.
    pub async fn create_redirect(
        &self,
        renamed: &Document,
        change: &ProposedChange,
    ) -> KbResult<(Document, Revision)> {
        let current_id = renamed.current_revision_id.ok_or_else(|| {
            KbError::invariant(format!(
                "document {} has no current revision to redirect from",
                renamed.id
            ))
        })?;
        let current = self
            .revisions
            .get(current_id)
            .await?
            .ok_or_else(|| KbError::revision_not_found(current_id))?;

        let locale = renamed.locale.as_str();
        let title = self
            .value_for_redirect(CollisionField::Title, locale, &change.old_title, change.title_changed())
            .await?;
        let slug = self
            .value_for_redirect(CollisionField::Slug, locale, &change.old_slug, change.slug_changed())
            .await?;

        let now = Utc::now();
        let stub = Document {
            id: DocumentId(0),
            is_template: title.starts_with(&self.config.template_title_prefix),
            title,
            slug,
            locale: renamed.locale.clone(),
            category: renamed.category,
            is_archived: false,
            is_localizable: false,
            parent_id: None,
            current_revision_id: None,
            latest_localizable_revision_id: None,
            html: String::new(),
            contributors: Default::default(),
            created_at: now,
            updated_at: now,
        };
        let mut stub = self.documents.insert(&stub).await?;

        let mut revision = Revision::from_draft(
            stub.id,
            RevisionDraft {
                content: redirect_content(&renamed.title),
                creator: current.creator.clone(),
                ..Default::default()
            },
            now,
        );
        revision.is_approved = true;
        revision.reviewer = Some(current.creator.clone());
        revision.reviewed_at = Some(now);
        let revision = self.revisions.insert(&revision).await?;

        stub.current_revision_id = Some(revision.id);
        stub.html = self
            .renderer
            .render(&revision.content, &stub.locale, stub.id);
        stub.contributors.insert(revision.creator.clone());
        self.documents.update(&stub).await?;

        info!(
            document_id = %renamed.id,
            redirect_id = %stub.id,
            slug = %stub.slug,
            title = %stub.title,
            "created redirect for renamed document"
        );
        Ok((stub, revision))
    }

    /// Title a redirect stub points at, if `doc` is one.
    pub async fn redirect_title(&self, doc: &Document) -> KbResult<Option<String>> {
        let Some(current_id) = doc.current_revision_id else {
            return Ok(None);
        };
        Ok(self
            .revisions
            .get(current_id)
            .await?
            .and_then(|rev| parse_redirect(&rev.content)))
    }

    /// Follow a redirect stub to its target in the same locale.
    pub async fn redirect_target(&self, doc: &Document) -> KbResult<Option<Document>> {
        match self.redirect_title(doc).await? {
            Some(title) => self.documents.find_by_title(&doc.locale, &title).await,
            None => Ok(None),
        }
    }

    /// Redirect stubs in `target`'s locale that lead to it, directly or
    /// through other stubs left by earlier renames.
    pub async fn redirects_to(&self, target: &Document) -> KbResult<Vec<Document>> {
        let mut pointing = Vec::new();
        for candidate in self.documents.redirect_candidates(&target.locale).await? {
            if candidate.id == target.id {
                continue;
            }
            if let Some(title) = self.redirect_title(&candidate).await? {
                pointing.push((candidate, title));
            }
        }

        let mut titles = vec![target.title.clone()];
        let mut stubs = Vec::new();
        while let Some(title) = titles.pop() {
            let (hits, rest): (Vec<_>, Vec<_>) =
                pointing.into_iter().partition(|(_, to)| *to == title);
            pointing = rest;
            for (stub, _) in hits {
                titles.push(stub.title.clone());
                stubs.push(stub);
            }
        }
        Ok(stubs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_both_placeholders() {
        assert_eq!(fill_template("{old}-redirect-{number}", "foo", 2), "foo-redirect-2");
        assert_eq!(fill_template("{old} Redirect {number}", "Foo", 1), "Foo Redirect 1");
    }

    #[test]
    fn recognises_marker_content() {
        assert!(is_redirect_content("REDIRECT [[Foo]]"));
        assert!(!is_redirect_content("Foo"));
    }
}
