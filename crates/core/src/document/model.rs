use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{DocumentId, RevisionId};
use crate::revision::Significance;

/// Article category. Translations always carry their parent's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Troubleshooting,
    HowTo,
    HowToContribute,
    Administration,
    Navigation,
    Templates,
    CannedResponses,
}

impl Category {
    /// Stable numeric code used by the persistent store.
    pub fn code(self) -> i16 {
        match self {
            Category::Troubleshooting => 10,
            Category::HowTo => 20,
            Category::HowToContribute => 30,
            Category::Administration => 40,
            Category::Navigation => 50,
            Category::Templates => 60,
            Category::CannedResponses => 70,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            10 => Some(Category::Troubleshooting),
            20 => Some(Category::HowTo),
            30 => Some(Category::HowToContribute),
            40 => Some(Category::Administration),
            50 => Some(Category::Navigation),
            60 => Some(Category::Templates),
            70 => Some(Category::CannedResponses),
            _ => None,
        }
    }
}

/// One help article in one locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub slug: String,
    pub locale: String,
    pub category: Category,
    pub is_archived: bool,
    /// Derived from the title prefix on every save.
    pub is_template: bool,
    pub is_localizable: bool,
    /// The origin-locale document this is a translation of.
    pub parent_id: Option<DocumentId>,
    pub current_revision_id: Option<RevisionId>,
    pub latest_localizable_revision_id: Option<RevisionId>,
    /// Rendered HTML of the current revision.
    pub html: String,
    pub contributors: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn is_translation(&self) -> bool {
        self.parent_id.is_some()
    }

    /// The document whose revisions `based_on` must point into.
    pub fn origin_id(&self) -> DocumentId {
        self.parent_id.unwrap_or(self.id)
    }
}

/// Content of a revision as submitted by an editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionDraft {
    pub content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub comment: String,
    pub creator: String,
    #[serde(default)]
    pub significance: Option<Significance>,
    #[serde(default)]
    pub based_on_id: Option<RevisionId>,
}

/// Input for creating a document together with its first revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub title: String,
    pub slug: String,
    pub locale: String,
    /// Required unless `parent_id` is set, in which case it is inherited.
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub parent_id: Option<DocumentId>,
    /// Defaults to true in the default locale and false elsewhere.
    #[serde(default)]
    pub is_localizable: Option<bool>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    pub revision: RevisionDraft,
}

/// Header fields an edit may change besides title and slug.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub is_localizable: Option<bool>,
}

/// A title/slug edit, computed by the caller by diffing a freshly loaded
/// document against the submitted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedChange {
    pub old_title: String,
    pub old_slug: String,
    pub new_title: String,
    pub new_slug: String,
}

impl ProposedChange {
    pub fn new(current: &Document, new_title: impl Into<String>, new_slug: impl Into<String>) -> Self {
        Self {
            old_title: current.title.clone(),
            old_slug: current.slug.clone(),
            new_title: new_title.into(),
            new_slug: new_slug.into(),
        }
    }

    /// A change that keeps title and slug as they are.
    pub fn unchanged(current: &Document) -> Self {
        Self::new(current, current.title.clone(), current.slug.clone())
    }

    pub fn title_changed(&self) -> bool {
        self.old_title != self.new_title
    }

    pub fn slug_changed(&self) -> bool {
        self.old_slug != self.new_slug
    }

    pub fn is_rename(&self) -> bool {
        self.title_changed() || self.slug_changed()
    }
}
