use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{DocumentId, RevisionId};

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    /// Header edit (title, slug, category, flags) without a redirect.
    Updated,
    /// A draft revision was appended.
    Submitted,
    Approved,
    Rejected,
    ReadiedForL10n,
    Redirected,
    Deleted,
}

/// Emitted synchronously at the end of each mutating operation, for
/// indexing and notification collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChanged {
    pub event_id: Uuid,
    pub document_id: DocumentId,
    pub revision_id: Option<RevisionId>,
    pub kind: ChangeKind,
    pub timestamp: DateTime<Utc>,
}

impl DocumentChanged {
    pub fn new(document_id: DocumentId, revision_id: Option<RevisionId>, kind: ChangeKind) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            document_id,
            revision_id,
            kind,
            timestamp: Utc::now(),
        }
    }
}
