//! Workflow endpoints: templates, installation, runs, and logs.

use crate::api::{require, ApiErr, AppState};
use crate::error::AppError;
use crate::services::github_client::{Workflow, WorkflowJob, WorkflowRun};
use crate::services::workflows::{self, CancelResult, TriggerResult, WorkflowTemplate};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

/// Account/repo selector for read endpoints.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoQuery {
    account_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateWorkflowRequest {
    account_id: String,
    owner: String,
    repo: String,
    template_id: String,
    branch: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerRequest {
    account_id: String,
    owner: String,
    repo: String,
    workflow_id: String,
    branch: String,
    #[serde(default)]
    inputs: serde_json::Value,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/templates", get(list_templates))
        .route("/api/workflows", post(create_workflow))
        .route("/api/workflows/{owner}/{repo}", get(list_workflows))
        .route("/api/runs/{owner}/{repo}", get(list_runs))
        .route("/api/trigger", post(trigger_workflow))
        .route("/api/cancel/{owner}/{repo}/{run_id}", post(cancel_run))
        .route("/api/logs/{owner}/{repo}/{run_id}", get(run_logs))
}

/// GET /api/templates — the built-in workflow templates.
async fn list_templates() -> Json<Vec<WorkflowTemplate>> {
    Json(workflows::workflow_templates())
}

/// POST /api/workflows — install a template into a repository.
async fn create_workflow(
    State(state): State<AppState>,
    Json(req): Json<CreateWorkflowRequest>,
) -> Result<Json<WorkflowTemplate>, ApiErr> {
    require(&req.account_id, "accountId")?;
    require(&req.owner, "owner")?;
    require(&req.repo, "repo")?;
    require(&req.template_id, "templateId")?;
    require(&req.branch, "branch")?;

    let client = state.clients.get(&req.account_id).await?;
    let template =
        workflows::create_workflow(&client, &req.owner, &req.repo, &req.template_id, &req.branch)
            .await?;
    Ok(Json(template))
}

/// GET /api/workflows/{owner}/{repo} — workflows configured in a repository.
async fn list_workflows(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(q): Query<RepoQuery>,
) -> Result<Json<Vec<Workflow>>, ApiErr> {
    let client = state.clients.get(&q.account_id).await?;
    Ok(Json(workflows::list_workflows(&client, &owner, &repo).await?))
}

/// GET /api/runs/{owner}/{repo} — recent workflow runs.
async fn list_runs(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(q): Query<RepoQuery>,
) -> Result<Json<Vec<WorkflowRun>>, ApiErr> {
    let client = state.clients.get(&q.account_id).await?;
    Ok(Json(workflows::list_runs(&client, &owner, &repo).await?))
}

/// POST /api/trigger — dispatch a workflow run.
async fn trigger_workflow(
    State(state): State<AppState>,
    Json(req): Json<TriggerRequest>,
) -> Result<Json<TriggerResult>, ApiErr> {
    require(&req.account_id, "accountId")?;
    require(&req.owner, "owner")?;
    require(&req.repo, "repo")?;
    require(&req.workflow_id, "workflowId")?;
    require(&req.branch, "branch")?;

    let inputs = if req.inputs.is_null() {
        serde_json::json!({})
    } else {
        req.inputs
    };

    let client = state.clients.get(&req.account_id).await?;
    let result = workflows::trigger_workflow(
        &client,
        &req.owner,
        &req.repo,
        &req.workflow_id,
        &req.branch,
        inputs,
    )
    .await;
    Ok(Json(result))
}

/// POST /api/cancel/{owner}/{repo}/{run_id} — cancel a running workflow.
async fn cancel_run(
    State(state): State<AppState>,
    Path((owner, repo, run_id)): Path<(String, String, String)>,
    Query(q): Query<RepoQuery>,
) -> Result<Json<CancelResult>, ApiErr> {
    let run_id: i64 = run_id
        .parse()
        .map_err(|_| AppError::invalid_input_field("runId must be numeric", "runId"))?;

    let client = state.clients.get(&q.account_id).await?;
    Ok(Json(workflows::cancel_run(&client, &owner, &repo, run_id).await))
}

/// GET /api/logs/{owner}/{repo}/{run_id} — per-job step status of a run.
async fn run_logs(
    State(state): State<AppState>,
    Path((owner, repo, run_id)): Path<(String, String, String)>,
    Query(q): Query<RepoQuery>,
) -> Result<Json<Vec<WorkflowJob>>, ApiErr> {
    let run_id: i64 = run_id
        .parse()
        .map_err(|_| AppError::invalid_input_field("runId must be numeric", "runId"))?;

    let client = state.clients.get(&q.account_id).await?;
    Ok(Json(workflows::run_jobs(&client, &owner, &repo, run_id).await?))
}
