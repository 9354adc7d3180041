//! Project model and sync-status persistence.
//!
//! The sync_status / last_sync_at / last_commit_sha / sync_errors columns are
//! owned exclusively by the synchronization pipeline; no other subsystem
//! writes them.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Outcome of the most recent synchronization attempt for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown sync status: {}", other)),
        }
    }
}

/// A unit of work optionally bound to exactly one remote repository.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Whether repository integration is enabled.
    pub github_enabled: bool,

    /// Repository owner (user or organization login).
    pub repo_owner: Option<String>,

    /// Repository name.
    pub repo_name: Option<String>,

    /// Browsable repository URL.
    pub repo_url: Option<String>,

    /// Default branch name.
    pub default_branch: String,

    /// Last sync outcome: `pending`, `synced`, or `error`.
    pub sync_status: String,

    /// Unix timestamp of the last sync attempt (success or failure).
    pub last_sync_at: Option<i64>,

    /// SHA of the last commit produced by a successful sync.
    pub last_commit_sha: Option<String>,

    /// JSON array of error strings from the last failed sync.
    pub sync_errors: Option<String>,

    /// Unix timestamp the project was created.
    pub created_at: i64,
}

impl Project {
    /// Parsed sync status.
    pub fn status(&self) -> SyncStatus {
        self.sync_status.parse().unwrap_or(SyncStatus::Pending)
    }

    /// Decoded sync error list.
    pub fn errors(&self) -> Vec<String> {
        self.sync_errors
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }
}

/// Look up a project by id.
pub async fn get_project(
    pool: &sqlx::SqlitePool,
    project_id: &str,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "SELECT id, name, github_enabled, repo_owner, repo_name, repo_url, default_branch,
                sync_status, last_sync_at, last_commit_sha, sync_errors, created_at
         FROM projects WHERE id = ?",
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await
}

/// Insert a project row.
pub async fn insert_project(pool: &sqlx::SqlitePool, project: &Project) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO projects (id, name, github_enabled, repo_owner, repo_name, repo_url,
                               default_branch, sync_status, last_sync_at, last_commit_sha,
                               sync_errors, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&project.id)
    .bind(&project.name)
    .bind(project.github_enabled)
    .bind(&project.repo_owner)
    .bind(&project.repo_name)
    .bind(&project.repo_url)
    .bind(&project.default_branch)
    .bind(&project.sync_status)
    .bind(project.last_sync_at)
    .bind(&project.last_commit_sha)
    .bind(&project.sync_errors)
    .bind(project.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist a successful sync outcome: status `synced`, timestamp, new commit
/// SHA, and cleared error list.
pub async fn mark_synced(
    pool: &sqlx::SqlitePool,
    project_id: &str,
    commit_sha: &str,
    synced_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE projects SET sync_status = 'synced', last_sync_at = ?,
                last_commit_sha = ?, sync_errors = NULL
         WHERE id = ?",
    )
    .bind(synced_at)
    .bind(commit_sha)
    .bind(project_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist a successful pull: status `synced` and timestamp, leaving
/// `last_commit_sha` as it was.
pub async fn mark_pulled(
    pool: &sqlx::SqlitePool,
    project_id: &str,
    synced_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE projects SET sync_status = 'synced', last_sync_at = ?, sync_errors = NULL
         WHERE id = ?",
    )
    .bind(synced_at)
    .bind(project_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist a failed sync outcome: status `error`, timestamp, and the error
/// list as a JSON array. `last_commit_sha` is left untouched.
pub async fn mark_sync_error(
    pool: &sqlx::SqlitePool,
    project_id: &str,
    errors: &[String],
    synced_at: i64,
) -> Result<(), sqlx::Error> {
    let errors_json = serde_json::to_string(errors).unwrap_or_else(|_| "[]".to_string());

    sqlx::query(
        "UPDATE projects SET sync_status = 'error', last_sync_at = ?, sync_errors = ?
         WHERE id = ?",
    )
    .bind(synced_at)
    .bind(errors_json)
    .bind(project_id)
    .execute(pool)
    .await?;

    Ok(())
}
