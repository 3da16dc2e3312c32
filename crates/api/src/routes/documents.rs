use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use kb_core::document::{
    Category, Document, DocumentFields, DocumentId, NewDocument, ProposedChange, RevisionDraft,
    RevisionId,
};
use kb_core::revision::{Revision, Significance};
use serde::Deserialize;

use crate::auth::Editor;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/documents", post(create_document))
        .route(
            "/v1/documents/{id}",
            get(get_document).patch(edit_document).delete(delete_document),
        )
        .route("/v1/documents/by-slug/{locale}/{slug}", get(get_by_slug))
        .route(
            "/v1/documents/{id}/revisions",
            get(list_revisions).post(submit_revision),
        )
        .route("/v1/documents/{id}/translations", get(list_translations))
}

/// Revision content as submitted; the creator is the authenticated editor.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftBody {
    pub content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub significance: Option<Significance>,
    #[serde(default)]
    pub based_on_id: Option<RevisionId>,
}

impl DraftBody {
    fn into_draft(self, editor: &Editor) -> RevisionDraft {
        RevisionDraft {
            content: self.content,
            summary: self.summary,
            keywords: self.keywords,
            comment: self.comment,
            creator: editor.name().to_string(),
            significance: self.significance,
            based_on_id: self.based_on_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentBody {
    pub title: String,
    pub slug: String,
    pub locale: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub parent_id: Option<DocumentId>,
    #[serde(default)]
    pub is_localizable: Option<bool>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    pub revision: DraftBody,
}

/// Header edit; omitted title or slug keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditDocumentBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(flatten)]
    pub fields: DocumentFields,
}

async fn create_document(
    State(state): State<AppState>,
    editor: Editor,
    Json(body): Json<CreateDocumentBody>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let new = NewDocument {
        title: body.title,
        slug: body.slug,
        locale: body.locale,
        category: body.category,
        parent_id: body.parent_id,
        is_localizable: body.is_localizable,
        is_archived: body.is_archived,
        revision: body.revision.into_draft(&editor),
    };
    let doc = state.service().create_document(new).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> ApiResult<Json<Document>> {
    Ok(Json(state.service().document(id).await?))
}

async fn get_by_slug(
    State(state): State<AppState>,
    Path((locale, slug)): Path<(String, String)>,
) -> ApiResult<Json<Document>> {
    Ok(Json(state.service().document_by_slug(&locale, &slug).await?))
}

async fn edit_document(
    State(state): State<AppState>,
    editor: Editor,
    Path(id): Path<DocumentId>,
    Json(body): Json<EditDocumentBody>,
) -> ApiResult<Json<Document>> {
    let current = state.service().document(id).await?;
    let change = ProposedChange::new(
        &current,
        body.title.unwrap_or_else(|| current.title.clone()),
        body.slug.unwrap_or_else(|| current.slug.clone()),
    );
    tracing::debug!(document_id = %id, editor = editor.name(), "editing document");
    let doc = state.service().edit_document(id, change, body.fields).await?;
    Ok(Json(doc))
}

async fn delete_document(
    State(state): State<AppState>,
    editor: Editor,
    Path(id): Path<DocumentId>,
) -> ApiResult<StatusCode> {
    tracing::debug!(document_id = %id, editor = editor.name(), "deleting document");
    state.service().delete_document(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_revisions(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> ApiResult<Json<Vec<Revision>>> {
    Ok(Json(state.service().revisions_of(id).await?))
}

async fn submit_revision(
    State(state): State<AppState>,
    editor: Editor,
    Path(id): Path<DocumentId>,
    Json(body): Json<DraftBody>,
) -> ApiResult<(StatusCode, Json<Revision>)> {
    let rev = state
        .service()
        .submit_revision(id, body.into_draft(&editor))
        .await?;
    Ok((StatusCode::CREATED, Json(rev)))
}

async fn list_translations(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.service().translations_of(id).await?))
}
