//! Which revision is current, which is ready for translators, and how far a
//! translation has fallen behind its origin.

use std::sync::Arc;

use crate::document::{Document, RevisionId};
use crate::error::{KbError, KbResult};
use crate::revision::{Revision, Significance};
use crate::store::{DocumentStore, RevisionStore};

/// Fallback chain for "the revision translators should work from".
///
/// 1. `latest_localizable_revision`, if set and the document is localizable;
/// 2. else the highest-id approved revision;
/// 3. else the highest-id revision that is not rejected;
/// 4. else, with `include_rejected`, the highest-id revision of any kind.
///
/// An older ready revision therefore wins over a newer merely-approved one.
pub fn localizable_or_latest<'a>(
    doc: &Document,
    revisions: &'a [Revision],
    include_rejected: bool,
) -> Option<&'a Revision> {
    if doc.is_localizable {
        if let Some(ready) = doc
            .latest_localizable_revision_id
            .and_then(|id| revisions.iter().find(|r| r.id == id))
        {
            return Some(ready);
        }
    }

    latest(revisions, |r| r.is_approved)
        .or_else(|| latest(revisions, |r| !r.is_rejected()))
        .or_else(|| {
            if include_rejected {
                latest(revisions, |_| true)
            } else {
                None
            }
        })
}

fn latest(revisions: &[Revision], keep: impl Fn(&Revision) -> bool) -> Option<&Revision> {
    revisions.iter().filter(|r| keep(r)).max_by_key(|r| r.id)
}

/// Highest approved revision other than `excluded`: the repair target for
/// `current_revision`.
pub fn replacement_current(revisions: &[Revision], excluded: RevisionId) -> Option<&Revision> {
    latest(revisions, |r| r.id != excluded && r.is_approved)
}

/// Highest ready-for-localization revision other than `excluded`: the repair
/// target for `latest_localizable_revision`.
pub fn replacement_localizable(revisions: &[Revision], excluded: RevisionId) -> Option<&Revision> {
    latest(revisions, |r| {
        r.id != excluded && r.is_approved && r.is_ready_for_localization
    })
}

/// Whether the origin has a ready revision of at least `level` newer than
/// the one the translation's current revision was based on.
pub fn is_outdated(
    translation_current: &Revision,
    origin_revisions: &[Revision],
    level: Significance,
) -> bool {
    let based_on = translation_current.based_on_id.unwrap_or(RevisionId(0));
    origin_revisions.iter().any(|r| {
        r.is_approved
            && r.is_ready_for_localization
            && r.significance.is_some_and(|s| s >= level)
            && r.id > based_on
    })
}

/// Store-backed localization queries.
#[derive(Clone)]
pub struct LocalizationEngine {
    documents: Arc<dyn DocumentStore>,
    revisions: Arc<dyn RevisionStore>,
}

impl LocalizationEngine {
    pub fn new(documents: Arc<dyn DocumentStore>, revisions: Arc<dyn RevisionStore>) -> Self {
        Self {
            documents,
            revisions,
        }
    }

    pub async fn localizable_or_latest(
        &self,
        doc: &Document,
        include_rejected: bool,
    ) -> KbResult<Option<Revision>> {
        let revisions = self.revisions.for_document(doc.id).await?;
        Ok(localizable_or_latest(doc, &revisions, include_rejected).cloned())
    }

    pub async fn is_outdated(&self, translation: &Document, level: Significance) -> KbResult<bool> {
        let (Some(parent_id), Some(current_id)) =
            (translation.parent_id, translation.current_revision_id)
        else {
            return Ok(false);
        };
        let current = self
            .revisions
            .get(current_id)
            .await?
            .ok_or_else(|| KbError::revision_not_found(current_id))?;
        let origin_revisions = self.revisions.for_document(parent_id).await?;
        Ok(is_outdated(&current, &origin_revisions, level))
    }

    pub async fn is_majorly_outdated(&self, translation: &Document) -> KbResult<bool> {
        self.is_outdated(translation, Significance::Major).await
    }

    /// The origin-locale document: the parent of a translation, else itself.
    pub async fn original(&self, doc: &Document) -> KbResult<Document> {
        match doc.parent_id {
            Some(parent_id) => self
                .documents
                .get(parent_id)
                .await?
                .ok_or_else(|| KbError::document_not_found(parent_id)),
            None => Ok(doc.clone()),
        }
    }

    /// The version of `doc`'s article in `locale`, if one exists.
    pub async fn translated_to(&self, doc: &Document, locale: &str) -> KbResult<Option<Document>> {
        let origin = self.original(doc).await?;
        if origin.locale == locale {
            return Ok(Some(origin));
        }
        Ok(self
            .documents
            .translations(origin.id)
            .await?
            .into_iter()
            .find(|t| t.locale == locale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Category, DocumentId, RevisionDraft};
    use chrono::Utc;

    fn doc() -> Document {
        Document {
            id: DocumentId(1),
            title: "Foo".into(),
            slug: "foo".into(),
            locale: "en-US".into(),
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

    fn rev(id: i64) -> Revision {
        let mut r = Revision::from_draft(
            DocumentId(1),
            RevisionDraft {
                content: format!("rev {id}"),
                creator: "alice".into(),
                significance: Some(Significance::Minor),
                ..Default::default()
            },
            Utc::now(),
        );
        r.id = RevisionId(id);
        r
    }

    fn approved(id: i64) -> Revision {
        let mut r = rev(id);
        r.is_approved = true;
        r.reviewed_at = Some(Utc::now());
        r
    }

    fn ready(id: i64, significance: Significance) -> Revision {
        let mut r = approved(id);
        r.significance = Some(significance);
        r.is_ready_for_localization = true;
        r
    }

    fn rejected(id: i64) -> Revision {
        let mut r = rev(id);
        r.reviewed_at = Some(Utc::now());
        r
    }

    fn pick(doc: &Document, revisions: &[Revision], include_rejected: bool) -> Option<i64> {
        localizable_or_latest(doc, revisions, include_rejected).map(|r| r.id.0)
    }

    #[test]
    fn ready_over_recent() {
        let mut d = doc();
        d.latest_localizable_revision_id = Some(RevisionId(1));
        let revisions = vec![ready(1, Significance::Major), approved(2)];
        assert_eq!(pick(&d, &revisions, false), Some(1));
    }

    #[test]
    fn non_localizable_skips_ready_pointer() {
        let mut d = doc();
        d.is_localizable = false;
        d.latest_localizable_revision_id = Some(RevisionId(1));
        let revisions = vec![ready(1, Significance::Major), approved(2)];
        assert_eq!(pick(&d, &revisions, false), Some(2));
    }

    #[test]
    fn falls_back_to_latest_approved_then_unrejected() {
        let d = doc();
        assert_eq!(pick(&d, &[approved(1), rev(2), approved(3), rev(4)], false), Some(3));
        assert_eq!(pick(&d, &[rejected(1), rev(2), rejected(3)], false), Some(2));
    }

    #[test]
    fn rejected_only_with_flag() {
        let d = doc();
        let revisions = vec![rejected(1), rejected(2)];
        assert_eq!(pick(&d, &revisions, false), None);
        assert_eq!(pick(&d, &revisions, true), Some(2));
        assert_eq!(pick(&d, &[], true), None);
    }

    #[test]
    fn replacements_skip_the_excluded_revision() {
        let revisions = vec![ready(1, Significance::Major), approved(2), ready(3, Significance::Minor)];
        assert_eq!(replacement_current(&revisions, RevisionId(3)).map(|r| r.id.0), Some(2));
        assert_eq!(replacement_localizable(&revisions, RevisionId(3)).map(|r| r.id.0), Some(1));
        assert_eq!(replacement_localizable(&revisions[1..2], RevisionId(3)), None);
    }

    #[test]
    fn outdated_by_level() {
        let mut current = approved(10);
        current.based_on_id = Some(RevisionId(5));

        let origin = vec![ready(5, Significance::Major), ready(9, Significance::Minor)];
        assert!(is_outdated(&current, &origin, Significance::Minor));
        assert!(!is_outdated(&current, &origin, Significance::Major));

        let origin = vec![ready(5, Significance::Major), ready(9, Significance::Major)];
        assert!(is_outdated(&current, &origin, Significance::Major));
    }

    #[test]
    fn missing_based_on_counts_as_zero() {
        let current = approved(10);
        assert!(is_outdated(&current, &[ready(1, Significance::Major)], Significance::Major));
        assert!(!is_outdated(&current, &[approved(1)], Significance::Major));
    }
}
