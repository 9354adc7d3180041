//! CI workflow orchestration.
//!
//! Installs workflow files from built-in templates, dispatches and cancels
//! runs, and reads back run/job status through the Actions API.

use crate::error::AppError;
use crate::services::github_client::{
    GitHubClient, Workflow, WorkflowJob, WorkflowRun,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Fixed page size for run listings.
const RUNS_PAGE_SIZE: u32 = 100;

/// A built-in workflow template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Filename under `.github/workflows/`.
    pub filename: &'static str,
    /// Workflow YAML body.
    pub content: &'static str,
}

/// Outcome of a dispatch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResult {
    pub success: bool,
    pub message: String,
}

/// Outcome of a run cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResult {
    pub success: bool,
    pub message: String,
}

/// The built-in workflow templates. Pure data; no I/O.
pub fn workflow_templates() -> Vec<WorkflowTemplate> {
    vec![
        WorkflowTemplate {
            id: "ci",
            name: "CI",
            description: "Install dependencies, lint, and run the test suite on every push",
            filename: "ci.yml",
            content: include_str!("templates/ci.yml"),
        },
        WorkflowTemplate {
            id: "deploy",
            name: "Deploy",
            description: "Build and deploy on pushes to the default branch",
            filename: "deploy.yml",
            content: include_str!("templates/deploy.yml"),
        },
        WorkflowTemplate {
            id: "release",
            name: "Release",
            description: "Draft a release when a version tag is pushed",
            filename: "release.yml",
            content: include_str!("templates/release.yml"),
        },
    ]
}

/// Look up a template by id.
pub fn find_template(template_id: &str) -> Option<WorkflowTemplate> {
    workflow_templates().into_iter().find(|t| t.id == template_id)
}

/// Install a workflow template into a repository.
///
/// Refuses with a named conflict, writing nothing, when the workflow file
/// already exists on the target branch.
pub async fn create_workflow(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    template_id: &str,
    branch: &str,
) -> Result<WorkflowTemplate, AppError> {
    let template = find_template(template_id)
        .ok_or_else(|| AppError::not_found_with_id("Workflow template", template_id))?;

    let path = format!(".github/workflows/{}", template.filename);

    let existing = client.get_content(owner, repo, &path, branch).await?;
    if existing.is_some() {
        return Err(AppError::invalid_input(format!(
            "Workflow '{}' already exists in {}/{}",
            template.name, owner, repo
        )));
    }

    client
        .put_content(
            owner,
            repo,
            &path,
            branch,
            &format!("Add {} workflow", template.name),
            &BASE64.encode(template.content),
        )
        .await?;

    log::info!(
        "Installed workflow template '{}' into {}/{}",
        template.id,
        owner,
        repo
    );
    Ok(template)
}

/// List the workflows configured in a repository.
pub async fn list_workflows(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
) -> Result<Vec<Workflow>, AppError> {
    Ok(client.list_workflows(owner, repo).await?.workflows)
}

/// Dispatch a workflow run on a branch.
///
/// Upstream failures (workflow file missing, dispatch not enabled, API or
/// network errors) come back as a soft failure so callers always get a
/// reportable outcome.
pub async fn trigger_workflow(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    workflow_id: &str,
    branch: &str,
    inputs: serde_json::Value,
) -> TriggerResult {
    match client
        .dispatch_workflow(owner, repo, workflow_id, branch, &inputs)
        .await
    {
        Ok(()) => TriggerResult {
            success: true,
            message: format!("Workflow '{}' triggered on {}", workflow_id, branch),
        },
        Err(e) => TriggerResult {
            success: false,
            message: format!("Failed to trigger workflow: {}", e),
        },
    }
}

/// List recent workflow runs.
pub async fn list_runs(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
) -> Result<Vec<WorkflowRun>, AppError> {
    Ok(client
        .list_workflow_runs(owner, repo, RUNS_PAGE_SIZE)
        .await?
        .workflow_runs)
}

/// Cancel a running workflow. Upstream failures come back as a soft failure,
/// like dispatch.
pub async fn cancel_run(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    run_id: i64,
) -> CancelResult {
    match client.cancel_workflow_run(owner, repo, run_id).await {
        Ok(()) => CancelResult {
            success: true,
            message: format!("Cancellation requested for run {}", run_id),
        },
        Err(e) => CancelResult {
            success: false,
            message: format!("Failed to cancel workflow run: {}", e),
        },
    }
}

/// Fetch the job/step breakdown of a run.
pub async fn run_jobs(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    run_id: i64,
) -> Result<Vec<WorkflowJob>, AppError> {
    Ok(client.list_run_jobs(owner, repo, run_id).await?.jobs)
}
