//! Sync and pull endpoints.

use crate::api::{require, ApiErr, AppState};
use crate::services::sync_engine::{self, FileChange, PullResult, SyncResult};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest {
    project_id: String,
    account_id: String,
    files: Vec<FileChange>,
    #[serde(default)]
    message: String,
    branch: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestBody {
    project_id: String,
    account_id: String,
    branch: Option<String>,
    paths: Option<Vec<String>>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/sync", post(sync_project))
        .route("/api/pull", post(pull_project))
}

/// POST /api/sync — push a batch of files as one commit.
async fn sync_project(
    State(state): State<AppState>,
    Json(req): Json<SyncRequest>,
) -> Result<Json<SyncResult>, ApiErr> {
    require(&req.project_id, "projectId")?;
    require(&req.account_id, "accountId")?;

    let client = state.clients.get(&req.account_id).await?;
    let result = sync_engine::sync(
        &state.db,
        &client,
        &req.project_id,
        &req.files,
        &req.message,
        req.branch.as_deref(),
    )
    .await?;

    Ok(Json(result))
}

/// POST /api/pull — fetch the repository's top-level files.
async fn pull_project(
    State(state): State<AppState>,
    Json(req): Json<PullRequestBody>,
) -> Result<Json<PullResult>, ApiErr> {
    require(&req.project_id, "projectId")?;
    require(&req.account_id, "accountId")?;

    let client = state.clients.get(&req.account_id).await?;
    let result = sync_engine::pull(
        &state.db,
        &client,
        &req.project_id,
        req.branch.as_deref(),
        req.paths.as_deref(),
    )
    .await?;

    Ok(Json(result))
}
