//! Branch, merge, and release endpoints.

use crate::api::{require, ApiErr, AppState};
use crate::services::branches::{
    self, BranchCreateResult, BranchDetails, MergeOutcome, MergePreview, ReleaseOutcome,
};
use crate::services::github_client::BranchProtection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BranchesQuery {
    account_id: String,
    #[serde(default = "default_branch")]
    default_branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBranchRequest {
    account_id: String,
    owner: String,
    repo: String,
    name: String,
    from: String,
    protection: Option<BranchProtection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergeRequest {
    account_id: String,
    owner: String,
    repo: String,
    base: String,
    head: String,
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseRequest {
    account_id: String,
    owner: String,
    repo: String,
    tag: String,
    #[serde(default)]
    name: String,
    #[serde(default = "default_branch")]
    branch: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/branches/{owner}/{repo}", get(list_branch_details))
        .route("/api/branches", post(create_branch))
        .route("/api/merge/preview", post(merge_preview))
        .route("/api/merge", post(perform_merge))
        .route("/api/releases", post(create_release))
}

/// GET /api/branches/{owner}/{repo} — detailed branch listing.
async fn list_branch_details(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(q): Query<BranchesQuery>,
) -> Result<Json<Vec<BranchDetails>>, ApiErr> {
    let client = state.clients.get(&q.account_id).await?;
    let details = branches::branch_details(&client, &owner, &repo, &q.default_branch).await?;
    Ok(Json(details))
}

/// POST /api/branches — create a branch, optionally protected.
async fn create_branch(
    State(state): State<AppState>,
    Json(req): Json<CreateBranchRequest>,
) -> Result<Json<BranchCreateResult>, ApiErr> {
    require(&req.account_id, "accountId")?;
    require(&req.owner, "owner")?;
    require(&req.repo, "repo")?;
    require(&req.name, "name")?;
    require(&req.from, "from")?;

    let client = state.clients.get(&req.account_id).await?;
    let result = branches::create_branch(
        &client,
        &req.owner,
        &req.repo,
        &req.name,
        &req.from,
        req.protection.as_ref(),
    )
    .await;
    Ok(Json(result))
}

/// POST /api/merge/preview — preview merging head into base.
async fn merge_preview(
    State(state): State<AppState>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<MergePreview>, ApiErr> {
    require(&req.account_id, "accountId")?;
    require(&req.owner, "owner")?;
    require(&req.repo, "repo")?;
    require(&req.base, "base")?;
    require(&req.head, "head")?;

    let client = state.clients.get(&req.account_id).await?;
    let preview =
        branches::merge_preview(&client, &req.owner, &req.repo, &req.base, &req.head).await?;
    Ok(Json(preview))
}

/// POST /api/merge — merge head into base through a pull request.
async fn perform_merge(
    State(state): State<AppState>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<MergeOutcome>, ApiErr> {
    require(&req.account_id, "accountId")?;
    require(&req.owner, "owner")?;
    require(&req.repo, "repo")?;
    require(&req.base, "base")?;
    require(&req.head, "head")?;

    let title = if req.title.trim().is_empty() {
        format!("Merge {} into {}", req.head, req.base)
    } else {
        req.title.clone()
    };

    let client = state.clients.get(&req.account_id).await?;
    let outcome = branches::perform_merge(
        &client,
        &req.owner,
        &req.repo,
        &req.head,
        &req.base,
        &title,
    )
    .await;
    Ok(Json(outcome))
}

/// POST /api/releases — create a release with a generated changelog.
async fn create_release(
    State(state): State<AppState>,
    Json(req): Json<ReleaseRequest>,
) -> Result<Json<ReleaseOutcome>, ApiErr> {
    require(&req.account_id, "accountId")?;
    require(&req.owner, "owner")?;
    require(&req.repo, "repo")?;
    require(&req.tag, "tag")?;

    let name = if req.name.trim().is_empty() {
        req.tag.clone()
    } else {
        req.name.clone()
    };

    let client = state.clients.get(&req.account_id).await?;
    let outcome = branches::create_release(
        &client,
        &req.owner,
        &req.repo,
        &req.tag,
        &name,
        &req.branch,
        req.draft,
        req.prerelease,
    )
    .await;
    Ok(Json(outcome))
}
