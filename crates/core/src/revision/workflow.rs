//! Approval workflow: Draft → Approved (or Rejected), plus the orthogonal
//! ready-for-localization flag on approved revisions.
//!
//! These functions only mutate the revision passed in; promoting a revision
//! to `current_revision` / `latest_localizable_revision` is decided here but
//! written by the service.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::model::{Revision, RevisionState, Significance};
use crate::config::KbConfig;
use crate::document::{Document, DocumentId, RevisionId};
use crate::error::{KbError, KbResult};

/// A reviewer's verdict on a draft revision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDecision {
    pub approve: bool,
    /// Overrides the significance the editor submitted.
    #[serde(default)]
    pub significance: Option<Significance>,
    /// Also flag the revision ready for localization, where allowed.
    #[serde(default)]
    pub ready_for_localization: bool,
}

/// `based_on`, if present, must be a revision of the origin document.
pub fn based_on_is_clean(based_on: Option<&Revision>, origin: DocumentId) -> bool {
    based_on.is_none_or(|rev| rev.document_id == origin)
}

/// Whether an approved revision may carry the ready-for-localization flag.
pub fn can_be_readied(rev: &Revision, doc: &Document, config: &KbConfig) -> bool {
    rev.is_approved
        && rev.significance.is_some_and(|s| s > Significance::Trivial)
        && doc.locale == config.default_locale
}

/// True when `candidate` should replace `current` as the pointer target.
pub fn should_promote(candidate: RevisionId, current: Option<RevisionId>) -> bool {
    current.is_none_or(|current| candidate > current)
}

/// Apply a review to a draft. Readiness that is not allowed is forced back
/// to false instead of failing the review.
pub fn apply_review(
    rev: &mut Revision,
    doc: &Document,
    reviewer: &str,
    decision: &ReviewDecision,
    config: &KbConfig,
    now: DateTime<Utc>,
) -> KbResult<()> {
    if rev.state() != RevisionState::Draft {
        return Err(KbError::invariant(format!(
            "revision {} has already been reviewed",
            rev.id
        )));
    }
    if reviewer.trim().is_empty() {
        return Err(KbError::invariant("a reviewer is required to review a revision"));
    }

    rev.reviewer = Some(reviewer.to_string());
    rev.reviewed_at = Some(now);
    rev.is_approved = decision.approve;
    if let Some(significance) = decision.significance {
        rev.significance = Some(significance);
    }

    if decision.ready_for_localization {
        set_ready(rev, doc, reviewer, config, now);
    }
    Ok(())
}

/// Flag an approved revision ready for localization. Returns whether the
/// flag was accepted; a refused flag leaves the revision not ready.
pub fn set_ready(
    rev: &mut Revision,
    doc: &Document,
    user: &str,
    config: &KbConfig,
    now: DateTime<Utc>,
) -> bool {
    if !can_be_readied(rev, doc, config) {
        warn!(
            revision_id = %rev.id,
            document_id = %doc.id,
            locale = %doc.locale,
            "revision cannot be readied for localization; flag forced to false"
        );
        rev.is_ready_for_localization = false;
        return false;
    }
    if !rev.is_ready_for_localization {
        rev.is_ready_for_localization = true;
        rev.readied_for_localization_at = Some(now);
        rev.readied_for_localization_by = Some(user.to_string());
    }
    true
}

pub fn clear_ready(rev: &mut Revision) {
    rev.is_ready_for_localization = false;
    rev.readied_for_localization_at = None;
    rev.readied_for_localization_by = None;
}

/// Creators of every non-rejected revision after `previous_current`, up to
/// and including `promoted`.
pub fn new_contributors(
    revisions: &[Revision],
    previous_current: Option<RevisionId>,
    promoted: RevisionId,
) -> BTreeSet<String> {
    revisions
        .iter()
        .filter(|r| previous_current.is_none_or(|prev| r.id > prev))
        .filter(|r| r.id <= promoted)
        .filter(|r| !r.is_rejected())
        .map(|r| r.creator.clone())
        .collect()
}
