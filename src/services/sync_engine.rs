//! Repository synchronization engine.
//!
//! Pushes a project's files to its linked repository as a single commit via
//! the git data API (ref -> commit -> tree -> commit -> ref), and pulls the
//! repository's top-level files back down. Every outcome, success or
//! failure, is persisted onto the project row.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::project::{self, Project};
use crate::services::github_client::{GitHubClient, TreeEntry};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// One file in a sync commit or pull result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    /// Repository-relative path.
    pub path: String,
    /// Full file content (the tree delta replaces the whole file).
    pub content: String,
    /// Content SHA, populated on pulled files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            sha: None,
        }
    }
}

/// Outcome of a sync attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    /// Number of files included in the commit.
    pub files_changed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}

/// Outcome of a pull. Per-file failures land in `errors` without aborting
/// the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResult {
    pub files: Vec<FileChange>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}

/// Load a project and check it is linked to a repository.
///
/// Returns the project together with its (owner, repo) pair.
async fn linked_project(
    pool: &DbPool,
    project_id: &str,
) -> Result<(Project, String, String), AppError> {
    let project = project::get_project(pool, project_id)
        .await?
        .ok_or_else(|| AppError::not_found_with_id("Project", project_id))?;

    if !project.github_enabled {
        return Err(AppError::invalid_input(format!(
            "Project {} does not have repository integration enabled",
            project_id
        )));
    }

    let owner = project.repo_owner.clone().ok_or_else(|| {
        AppError::invalid_input_field("Project has no repository owner", "repo_owner")
    })?;
    let repo = project.repo_name.clone().ok_or_else(|| {
        AppError::invalid_input_field("Project has no repository name", "repo_name")
    })?;

    Ok((project, owner, repo))
}

/// Push files to the project's repository as one commit.
///
/// Validation failures (unknown project, integration disabled, nothing left
/// after dropping empty paths) return `Err` and touch nothing. Once the
/// remote pipeline starts, any failure is captured: the project row is
/// marked `error` with the message list and the returned `SyncResult` has
/// `success = false`.
pub async fn sync(
    pool: &DbPool,
    client: &GitHubClient,
    project_id: &str,
    files: &[FileChange],
    message: &str,
    branch: Option<&str>,
) -> Result<SyncResult, AppError> {
    let (project, owner, repo) = linked_project(pool, project_id).await?;

    let files: Vec<&FileChange> = files.iter().filter(|f| !f.path.trim().is_empty()).collect();
    if files.is_empty() {
        return Err(AppError::invalid_input_field("No files to sync", "files"));
    }

    let branch = branch.unwrap_or(&project.default_branch);
    let message = if message.trim().is_empty() {
        "Sync project files"
    } else {
        message
    };

    log::info!(
        "Syncing {} file(s) from project {} to {}/{}@{}",
        files.len(),
        project_id,
        owner,
        repo,
        branch
    );

    match push_commit(client, &owner, &repo, branch, &files, message).await {
        Ok((sha, url)) => {
            let now = chrono::Utc::now().timestamp();
            project::mark_synced(pool, project_id, &sha, now).await?;
            log::info!("Project {} synced as commit {}", project_id, sha);
            Ok(SyncResult {
                success: true,
                files_changed: files.len(),
                commit_sha: Some(sha),
                commit_url: url,
                errors: Vec::new(),
            })
        }
        Err(e) => {
            let now = chrono::Utc::now().timestamp();
            let errors = vec![e.to_string()];
            project::mark_sync_error(pool, project_id, &errors, now).await?;
            log::warn!("Sync failed for project {}: {}", project_id, e);
            Ok(SyncResult {
                success: false,
                files_changed: 0,
                commit_sha: None,
                commit_url: None,
                errors,
            })
        }
    }
}

/// The ref -> commit -> tree -> commit -> ref write sequence.
async fn push_commit(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    branch: &str,
    files: &[&FileChange],
    message: &str,
) -> Result<(String, Option<String>), AppError> {
    let tip = client.get_ref(owner, repo, branch).await?;
    let parent_sha = tip.object.sha;

    let parent_commit = client.get_commit(owner, repo, &parent_sha).await?;
    let base_tree = parent_commit.tree.sha;

    let entries: Vec<TreeEntry> = files
        .iter()
        .map(|f| TreeEntry::blob(f.path.clone(), f.content.clone()))
        .collect();
    let new_tree = client.create_tree(owner, repo, &base_tree, &entries).await?;

    let commit = client
        .create_commit(
            owner,
            repo,
            message,
            &new_tree.sha,
            std::slice::from_ref(&parent_sha),
        )
        .await?;

    // Non-forced update; a concurrent push to the same branch rejects here
    // and the whole attempt is reported as a failure.
    client.update_ref(owner, repo, branch, &commit.sha).await?;

    Ok((commit.sha, commit.html_url))
}

/// Pull the repository's top-level files into memory.
///
/// Only regular files at the repository root are fetched (no recursion),
/// optionally restricted to paths with one of the given prefixes. A file
/// that fails to download or decode contributes an error message instead of
/// failing the pull; only a pull where every file fails marks the project
/// `error`.
pub async fn pull(
    pool: &DbPool,
    client: &GitHubClient,
    project_id: &str,
    branch: Option<&str>,
    paths: Option<&[String]>,
) -> Result<PullResult, AppError> {
    let (project, owner, repo) = linked_project(pool, project_id).await?;
    let branch = branch.unwrap_or(&project.default_branch);

    let entries = client.list_contents(&owner, &repo, "", branch).await?;

    let mut files = Vec::new();
    let mut errors = Vec::new();
    let mut attempted = 0usize;

    let wanted = |path: &str| match paths {
        Some(prefixes) if !prefixes.is_empty() => prefixes.iter().any(|p| path.starts_with(p.as_str())),
        _ => true,
    };

    for entry in entries
        .iter()
        .filter(|e| e.entry_type == "file" && wanted(&e.path))
    {
        attempted += 1;
        match client.get_content(&owner, &repo, &entry.path, branch).await {
            Ok(Some(file)) => match decode_content(&file.content, file.encoding.as_deref()) {
                Ok(content) => files.push(FileChange {
                    path: entry.path.clone(),
                    content,
                    sha: Some(file.sha),
                }),
                Err(e) => errors.push(format!("{}: {}", entry.path, e)),
            },
            Ok(None) => errors.push(format!("{}: disappeared during pull", entry.path)),
            Err(e) => errors.push(format!("{}: {}", entry.path, e)),
        }
    }

    let now = chrono::Utc::now().timestamp();
    if attempted > 0 && files.is_empty() && !errors.is_empty() {
        project::mark_sync_error(pool, project_id, &errors, now).await?;
    } else {
        project::mark_pulled(pool, project_id, now).await?;
    }

    log::info!(
        "Pulled {} file(s) ({} failed) from {}/{}@{} for project {}",
        files.len(),
        errors.len(),
        owner,
        repo,
        branch,
        project_id
    );

    Ok(PullResult { files, errors })
}

/// Decode a contents-API payload into text.
fn decode_content(content: &Option<String>, encoding: Option<&str>) -> Result<String, AppError> {
    let raw = content
        .as_deref()
        .ok_or_else(|| AppError::sync("Missing file content in response"))?;

    match encoding {
        Some("base64") | None => {
            // GitHub inserts newlines into base64 payloads
            let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = BASE64
                .decode(compact)
                .map_err(|_| AppError::sync("Invalid base64 content"))?;
            String::from_utf8(bytes).map_err(|_| AppError::sync("File content is not valid UTF-8"))
        }
        Some("none") => Ok(raw.to_string()),
        Some(other) => Err(AppError::sync(format!("Unsupported encoding: {}", other))),
    }
}
