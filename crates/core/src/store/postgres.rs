//! PostgreSQL stores. Schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{DocumentStore, KeyValueStore, RevisionStore};
use crate::document::{Category, Document, DocumentId, RevisionId};
use crate::error::{CollisionField, KbError, KbResult};
use crate::revision::{Revision, Significance};

const DOCUMENT_COLUMNS: &str = "id, title, slug, locale, category, is_archived, is_template, \
     is_localizable, parent_id, current_revision_id, latest_localizable_revision_id, html, \
     contributors, created_at, updated_at";

const REVISION_COLUMNS: &str = "id, document_id, content, summary, keywords, comment, creator, \
     reviewer, created_at, reviewed_at, significance, is_approved, is_ready_for_localization, \
     readied_for_localization_at, readied_for_localization_by, based_on_id";

/// Database row representation of a document.
#[derive(Debug, Clone, sqlx::FromRow)]
struct DocumentRow {
    id: i64,
    title: String,
    slug: String,
    locale: String,
    category: i16,
    is_archived: bool,
    is_template: bool,
    is_localizable: bool,
    parent_id: Option<i64>,
    current_revision_id: Option<i64>,
    latest_localizable_revision_id: Option<i64>,
    html: String,
    contributors: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = KbError;

    fn try_from(row: DocumentRow) -> KbResult<Self> {
        let category = Category::from_code(row.category).ok_or_else(|| {
            KbError::Storage(format!(
                "document {} has unknown category code {}",
                row.id, row.category
            ))
        })?;
        Ok(Document {
            id: DocumentId(row.id),
            title: row.title,
            slug: row.slug,
            locale: row.locale,
            category,
            is_archived: row.is_archived,
            is_template: row.is_template,
            is_localizable: row.is_localizable,
            parent_id: row.parent_id.map(DocumentId),
            current_revision_id: row.current_revision_id.map(RevisionId),
            latest_localizable_revision_id: row.latest_localizable_revision_id.map(RevisionId),
            html: row.html,
            contributors: row.contributors.into_iter().collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row representation of a revision.
#[derive(Debug, Clone, sqlx::FromRow)]
struct RevisionRow {
    id: i64,
    document_id: i64,
    content: String,
    summary: String,
    keywords: String,
    comment: String,
    creator: String,
    reviewer: Option<String>,
    created_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    significance: Option<i16>,
    is_approved: bool,
    is_ready_for_localization: bool,
    readied_for_localization_at: Option<DateTime<Utc>>,
    readied_for_localization_by: Option<String>,
    based_on_id: Option<i64>,
}

impl TryFrom<RevisionRow> for Revision {
    type Error = KbError;

    fn try_from(row: RevisionRow) -> KbResult<Self> {
        let significance = row
            .significance
            .map(|code| {
                Significance::from_code(code).ok_or_else(|| {
                    KbError::Storage(format!(
                        "revision {} has unknown significance code {code}",
                        row.id
                    ))
                })
            })
            .transpose()?;
        Ok(Revision {
            id: RevisionId(row.id),
            document_id: DocumentId(row.document_id),
            content: row.content,
            summary: row.summary,
            keywords: row.keywords,
            comment: row.comment,
            creator: row.creator,
            reviewer: row.reviewer,
            created_at: row.created_at,
            reviewed_at: row.reviewed_at,
            significance,
            is_approved: row.is_approved,
            is_ready_for_localization: row.is_ready_for_localization,
            readied_for_localization_at: row.readied_for_localization_at,
            readied_for_localization_by: row.readied_for_localization_by,
            based_on_id: row.based_on_id.map(RevisionId),
        })
    }
}

/// Map a unique-constraint violation on `documents` to a collision.
fn document_write_error(err: sqlx::Error, doc: &Document) -> KbError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let (field, value) = match db.constraint() {
                Some("documents_slug_locale_key") => (CollisionField::Slug, doc.slug.clone()),
                Some("documents_title_locale_key") => (CollisionField::Title, doc.title.clone()),
                _ => (
                    CollisionField::Parent,
                    doc.parent_id.map(|p| p.to_string()).unwrap_or_default(),
                ),
            };
            return KbError::Collision {
                field,
                locale: doc.locale.clone(),
                value,
            };
        }
    }
    err.into()
}

fn documents(rows: Vec<DocumentRow>) -> KbResult<Vec<Document>> {
    rows.into_iter().map(Document::try_from).collect()
}

/// Postgres-backed implementation of all three store traits.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn find_one(&self, filter: &str, locale: &str, value: &str) -> KbResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE locale = $1 AND {filter} = $2"
        ))
        .bind(locale)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Document::try_from).transpose()
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, id: DocumentId) -> KbResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Document::try_from).transpose()
    }

    async fn find_by_slug(&self, locale: &str, slug: &str) -> KbResult<Option<Document>> {
        self.find_one("slug", locale, slug).await
    }

    async fn find_by_title(&self, locale: &str, title: &str) -> KbResult<Option<Document>> {
        self.find_one("title", locale, title).await
    }

    async fn translations(&self, parent: DocumentId) -> KbResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE parent_id = $1 ORDER BY id"
        ))
        .bind(parent.0)
        .fetch_all(&self.pool)
        .await?;
        documents(rows)
    }

    async fn redirect_candidates(&self, locale: &str) -> KbResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents \
             WHERE locale = $1 AND NOT is_localizable AND parent_id IS NULL ORDER BY id"
        ))
        .bind(locale)
        .fetch_all(&self.pool)
        .await?;
        documents(rows)
    }

    async fn insert(&self, doc: &Document) -> KbResult<Document> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "INSERT INTO documents (title, slug, locale, category, is_archived, is_template, \
             is_localizable, parent_id, current_revision_id, latest_localizable_revision_id, \
             html, contributors, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(&doc.title)
        .bind(&doc.slug)
        .bind(&doc.locale)
        .bind(doc.category.code())
        .bind(doc.is_archived)
        .bind(doc.is_template)
        .bind(doc.is_localizable)
        .bind(doc.parent_id.map(|p| p.0))
        .bind(doc.current_revision_id.map(|r| r.0))
        .bind(doc.latest_localizable_revision_id.map(|r| r.0))
        .bind(&doc.html)
        .bind(doc.contributors.iter().cloned().collect::<Vec<_>>())
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| document_write_error(e, doc))?;
        Document::try_from(row)
    }

    async fn update(&self, doc: &Document) -> KbResult<()> {
        let result = sqlx::query(
            "UPDATE documents SET title = $2, slug = $3, locale = $4, category = $5, \
             is_archived = $6, is_template = $7, is_localizable = $8, parent_id = $9, \
             current_revision_id = $10, latest_localizable_revision_id = $11, html = $12, \
             contributors = $13, updated_at = $14 WHERE id = $1",
        )
        .bind(doc.id.0)
        .bind(&doc.title)
        .bind(&doc.slug)
        .bind(&doc.locale)
        .bind(doc.category.code())
        .bind(doc.is_archived)
        .bind(doc.is_template)
        .bind(doc.is_localizable)
        .bind(doc.parent_id.map(|p| p.0))
        .bind(doc.current_revision_id.map(|r| r.0))
        .bind(doc.latest_localizable_revision_id.map(|r| r.0))
        .bind(&doc.html)
        .bind(doc.contributors.iter().cloned().collect::<Vec<_>>())
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| document_write_error(e, doc))?;

        if result.rows_affected() == 0 {
            return Err(KbError::document_not_found(doc.id));
        }
        Ok(())
    }

    async fn delete(&self, id: DocumentId) -> KbResult<()> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RevisionStore for PgStore {
    async fn get(&self, id: RevisionId) -> KbResult<Option<Revision>> {
        let row = sqlx::query_as::<_, RevisionRow>(&format!(
            "SELECT {REVISION_COLUMNS} FROM revisions WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Revision::try_from).transpose()
    }

    async fn for_document(&self, document: DocumentId) -> KbResult<Vec<Revision>> {
        let rows = sqlx::query_as::<_, RevisionRow>(&format!(
            "SELECT {REVISION_COLUMNS} FROM revisions WHERE document_id = $1 ORDER BY id"
        ))
        .bind(document.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Revision::try_from).collect()
    }

    async fn insert(&self, rev: &Revision) -> KbResult<Revision> {
        let row = sqlx::query_as::<_, RevisionRow>(&format!(
            "INSERT INTO revisions (document_id, content, summary, keywords, comment, creator, \
             reviewer, created_at, reviewed_at, significance, is_approved, \
             is_ready_for_localization, readied_for_localization_at, \
             readied_for_localization_by, based_on_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {REVISION_COLUMNS}"
        ))
        .bind(rev.document_id.0)
        .bind(&rev.content)
        .bind(&rev.summary)
        .bind(&rev.keywords)
        .bind(&rev.comment)
        .bind(&rev.creator)
        .bind(&rev.reviewer)
        .bind(rev.created_at)
        .bind(rev.reviewed_at)
        .bind(rev.significance.map(Significance::code))
        .bind(rev.is_approved)
        .bind(rev.is_ready_for_localization)
        .bind(rev.readied_for_localization_at)
        .bind(&rev.readied_for_localization_by)
        .bind(rev.based_on_id.map(|r| r.0))
        .fetch_one(&self.pool)
        .await?;
        Revision::try_from(row)
    }

    async fn update_moderation(&self, rev: &Revision) -> KbResult<()> {
        let result = sqlx::query(
            "UPDATE revisions SET reviewer = $2, reviewed_at = $3, significance = $4, \
             is_approved = $5, is_ready_for_localization = $6, \
             readied_for_localization_at = $7, readied_for_localization_by = $8 WHERE id = $1",
        )
        .bind(rev.id.0)
        .bind(&rev.reviewer)
        .bind(rev.reviewed_at)
        .bind(rev.significance.map(Significance::code))
        .bind(rev.is_approved)
        .bind(rev.is_ready_for_localization)
        .bind(rev.readied_for_localization_at)
        .bind(&rev.readied_for_localization_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(KbError::revision_not_found(rev.id));
        }
        Ok(())
    }

    async fn delete(&self, id: RevisionId) -> KbResult<()> {
        sqlx::query("DELETE FROM revisions WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_for_document(&self, document: DocumentId) -> KbResult<()> {
        sqlx::query("DELETE FROM revisions WHERE document_id = $1")
            .bind(document.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for PgStore {
    async fn get(&self, key: &str) -> KbResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_entries WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> KbResult<()> {
        sqlx::query(
            "INSERT INTO kv_entries (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> KbResult<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
