use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use kb_core::document::RevisionId;
use kb_core::revision::{ReviewDecision, Revision};

use crate::auth::Editor;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/revisions/{id}", get(get_revision).delete(delete_revision))
        .route("/v1/revisions/{id}/review", post(review_revision))
        .route(
            "/v1/revisions/{id}/ready",
            put(mark_ready).delete(clear_ready),
        )
        .route("/v1/revisions/{id}/diff/{to}", get(diff))
}

async fn get_revision(
    State(state): State<AppState>,
    Path(id): Path<RevisionId>,
) -> ApiResult<Json<Revision>> {
    Ok(Json(state.service().revision(id).await?))
}

async fn review_revision(
    State(state): State<AppState>,
    editor: Editor,
    Path(id): Path<RevisionId>,
    Json(decision): Json<ReviewDecision>,
) -> ApiResult<Json<Revision>> {
    let rev = state
        .service()
        .review_revision(id, editor.name(), decision)
        .await?;
    Ok(Json(rev))
}

async fn mark_ready(
    State(state): State<AppState>,
    editor: Editor,
    Path(id): Path<RevisionId>,
) -> ApiResult<Json<Revision>> {
    let rev = state
        .service()
        .mark_ready_for_localization(id, editor.name())
        .await?;
    Ok(Json(rev))
}

async fn clear_ready(
    State(state): State<AppState>,
    _editor: Editor,
    Path(id): Path<RevisionId>,
) -> ApiResult<Json<Revision>> {
    Ok(Json(state.service().clear_ready_for_localization(id).await?))
}

async fn delete_revision(
    State(state): State<AppState>,
    _editor: Editor,
    Path(id): Path<RevisionId>,
) -> ApiResult<StatusCode> {
    state.service().delete_revision(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn diff(
    State(state): State<AppState>,
    Path((from, to)): Path<(RevisionId, RevisionId)>,
) -> ApiResult<String> {
    Ok(state.service().revision_diff(from, to).await?)
}
