use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use kb_core::document::{Document, DocumentId};
use kb_core::revision::{Revision, Significance};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/documents/{id}/localizable", get(localizable_or_latest))
        .route("/v1/documents/{id}/outdated", get(outdated))
        .route("/v1/documents/{id}/translations/{locale}", get(translated_to))
        .route("/v1/documents/{id}/redirect-target", get(redirect_target))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalizableQuery {
    #[serde(default)]
    include_rejected: bool,
}

#[derive(Debug, Deserialize)]
struct OutdatedQuery {
    level: Option<Significance>,
}

#[derive(Debug, Serialize)]
struct OutdatedResponse {
    level: Significance,
    outdated: bool,
}

async fn localizable_or_latest(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    Query(query): Query<LocalizableQuery>,
) -> ApiResult<Json<Revision>> {
    state
        .service()
        .localizable_or_latest(id, query.include_rejected)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("document {id} has no eligible revision")))
}

/// Defaults to the major level.
async fn outdated(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    Query(query): Query<OutdatedQuery>,
) -> ApiResult<Json<OutdatedResponse>> {
    let level = query.level.unwrap_or(Significance::Major);
    let outdated = state.service().is_outdated(id, level).await?;
    Ok(Json(OutdatedResponse { level, outdated }))
}

async fn translated_to(
    State(state): State<AppState>,
    Path((id, locale)): Path<(DocumentId, String)>,
) -> ApiResult<Json<Document>> {
    state
        .service()
        .translated_to(id, &locale)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("document {id} has no {locale} version")))
}

async fn redirect_target(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> ApiResult<Json<Document>> {
    state
        .service()
        .redirect_target(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("document {id} is not a redirect")))
}
