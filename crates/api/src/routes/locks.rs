use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use kb_core::document::DocumentId;
use kb_core::lock::LockStatus;
use serde_json::{json, Value};

use crate::auth::Editor;
use crate::error::ApiResult;
use crate::state::AppState;

/// Advisory edit-lock routes. The lock never blocks a write.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/v1/documents/{id}/lock",
        get(check).post(claim).put(steal).delete(release),
    )
}

async fn check(State(state): State<AppState>, Path(id): Path<DocumentId>) -> ApiResult<Json<Value>> {
    let holder = state.service().edit_lock().check(id).await?;
    Ok(Json(json!({ "holder": holder })))
}

async fn claim(
    State(state): State<AppState>,
    editor: Editor,
    Path(id): Path<DocumentId>,
) -> ApiResult<Json<LockStatus>> {
    state.service().document(id).await?;
    Ok(Json(state.service().edit_lock().claim(id, editor.name()).await?))
}

async fn steal(
    State(state): State<AppState>,
    editor: Editor,
    Path(id): Path<DocumentId>,
) -> ApiResult<Json<LockStatus>> {
    state.service().document(id).await?;
    state.service().edit_lock().steal(id, editor.name()).await?;
    Ok(Json(LockStatus::Acquired))
}

async fn release(
    State(state): State<AppState>,
    editor: Editor,
    Path(id): Path<DocumentId>,
) -> ApiResult<Json<Value>> {
    let released = state.service().edit_lock().release(id, editor.name()).await?;
    Ok(Json(json!({ "released": released })))
}
