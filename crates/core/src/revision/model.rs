use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{DocumentId, RevisionDraft, RevisionId};

/// How consequential a change is; drives localization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Trivial,
    Minor,
    Major,
}

impl Significance {
    pub fn code(self) -> i16 {
        match self {
            Significance::Trivial => 10,
            Significance::Minor => 20,
            Significance::Major => 30,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            10 => Some(Significance::Trivial),
            20 => Some(Significance::Minor),
            30 => Some(Significance::Major),
            _ => None,
        }
    }
}

/// Moderation state of a revision.
///
/// Readiness for localization is an orthogonal flag on `Approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionState {
    Draft,
    Approved,
    Rejected,
}

/// An immutable snapshot of a document's content plus its moderation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub id: RevisionId,
    pub document_id: DocumentId,
    pub content: String,
    pub summary: String,
    pub keywords: String,
    pub comment: String,
    pub creator: String,
    pub reviewer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Absent only on a document's very first revision.
    pub significance: Option<Significance>,
    pub is_approved: bool,
    pub is_ready_for_localization: bool,
    pub readied_for_localization_at: Option<DateTime<Utc>>,
    pub readied_for_localization_by: Option<String>,
    /// A revision of the origin-locale document this one was drafted against.
    pub based_on_id: Option<RevisionId>,
}

impl Revision {
    /// Build an unreviewed revision from a draft. The id is assigned on insert.
    pub fn from_draft(document_id: DocumentId, draft: RevisionDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: RevisionId(0),
            document_id,
            content: draft.content,
            summary: draft.summary,
            keywords: draft.keywords,
            comment: draft.comment,
            creator: draft.creator,
            reviewer: None,
            created_at: now,
            reviewed_at: None,
            significance: draft.significance,
            is_approved: false,
            is_ready_for_localization: false,
            readied_for_localization_at: None,
            readied_for_localization_by: None,
            based_on_id: draft.based_on_id,
        }
    }

    /// Reviewed and not approved.
    pub fn is_rejected(&self) -> bool {
        self.reviewed_at.is_some() && !self.is_approved
    }

    pub fn state(&self) -> RevisionState {
        if self.is_approved {
            RevisionState::Approved
        } else if self.is_rejected() {
            RevisionState::Rejected
        } else {
            RevisionState::Draft
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn significance_is_ordered() {
        assert!(Significance::Major > Significance::Minor);
        assert!(Significance::Minor > Significance::Trivial);
        assert_eq!(Significance::from_code(30), Some(Significance::Major));
        assert_eq!(Significance::from_code(0), None);
    }

    #[test]
    fn state_follows_moderation_fields() {
        let draft = RevisionDraft {
            content: "Hello".into(),
            creator: "alice".into(),
            ..Default::default()
        };
        let mut rev = Revision::from_draft(DocumentId(1), draft, Utc::now());
        assert_eq!(rev.state(), RevisionState::Draft);

        rev.reviewed_at = Some(Utc::now());
        assert_eq!(rev.state(), RevisionState::Rejected);
        assert!(rev.is_rejected());

        rev.is_approved = true;
        assert_eq!(rev.state(), RevisionState::Approved);
        assert!(!rev.is_rejected());
    }
}
