//! GitHub API client.
//!
//! Provides an authenticated HTTP client for the GitHub REST API (v3),
//! covering git data (refs/trees/commits), repository contents, branches,
//! comparisons, pulls, releases, and Actions workflows.

use crate::error::AppError;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// GitHub API client configuration. No Debug impl so the token never lands
/// in log output.
#[derive(Clone)]
pub struct GitHubClientConfig {
    /// Base URL of the API (e.g., `https://api.github.com`). Injectable so
    /// tests can point the client at a local mock.
    pub base_url: String,

    /// Access token for authentication.
    pub token: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

/// GitHub API client.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubClientConfig,
}

// ── Git data types ───────────────────────────────────────────────────────────

/// Object a ref points at.
#[derive(Debug, Clone, Deserialize)]
pub struct GitObject {
    pub sha: String,
    #[serde(rename = "type")]
    pub object_type: String,
}

/// A named ref (branch/tag pointer).
#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub object: GitObject,
}

/// Tree pointer inside a commit.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitTree {
    pub sha: String,
}

/// Parent pointer inside a commit.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitParent {
    pub sha: String,
}

/// A git commit object (git data API).
#[derive(Debug, Clone, Deserialize)]
pub struct GitCommit {
    pub sha: String,
    pub tree: CommitTree,
    #[serde(default)]
    pub parents: Vec<CommitParent>,
    pub html_url: Option<String>,
    pub message: Option<String>,
}

/// One entry submitted when creating a tree. Content is inlined; no separate
/// blob-creation round trip.
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub content: String,
}

impl TreeEntry {
    /// Regular-file blob entry.
    pub fn blob(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: "100644".to_string(),
            entry_type: "blob".to_string(),
            content: content.into(),
        }
    }
}

/// Result of creating a tree.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTree {
    pub sha: String,
}

// ── Repository content types ─────────────────────────────────────────────────

/// Directory listing entry from the contents API.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub size: u64,
}

/// File payload from the contents API (content is transport-encoded).
#[derive(Debug, Clone, Deserialize)]
pub struct ContentFile {
    pub path: String,
    pub sha: String,
    pub content: Option<String>,
    pub encoding: Option<String>,
}

// ── Branch / comparison types ────────────────────────────────────────────────

/// Commit pointer inside a branch listing.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchCommit {
    pub sha: String,
}

/// Branch from the branch listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchInfo {
    pub name: String,
    pub commit: BranchCommit,
    #[serde(default)]
    pub protected: bool,
}

/// Commit summary from list/compare endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub commit: CommitDetailInner,
    pub html_url: Option<String>,
}

/// Nested commit body (message/author) in a commit summary.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetailInner {
    pub message: String,
    pub author: Option<CommitAuthor>,
}

/// Commit author metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    pub name: Option<String>,
    pub date: Option<String>,
}

/// File entry in a branch comparison.
#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonFile {
    pub filename: String,
    pub status: String,
    #[serde(default)]
    pub additions: i64,
    #[serde(default)]
    pub deletions: i64,
}

/// Two-branch comparison result.
#[derive(Debug, Clone, Deserialize)]
pub struct Comparison {
    pub status: String,
    pub ahead_by: i64,
    pub behind_by: i64,
    #[serde(default)]
    pub commits: Vec<CommitSummary>,
    #[serde(default)]
    pub files: Vec<ComparisonFile>,
}

// ── Pull request types ───────────────────────────────────────────────────────

/// Pull request from the pulls API.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: i64,
    pub title: String,
    pub html_url: String,
    pub state: String,
    pub mergeable: Option<bool>,
}

/// Result of merging a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeResult {
    pub sha: Option<String>,
    pub merged: bool,
    pub message: String,
}

// ── Release types ────────────────────────────────────────────────────────────

/// Release object.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub id: i64,
    pub tag_name: String,
    pub name: Option<String>,
    pub html_url: String,
}

// ── Actions / workflow types ─────────────────────────────────────────────────

/// A configured workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub state: String,
}

/// Workflow listing envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowList {
    pub total_count: i64,
    #[serde(default)]
    pub workflows: Vec<Workflow>,
}

/// One workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: i64,
    pub name: Option<String>,
    pub status: String,
    pub conclusion: Option<String>,
    pub head_branch: Option<String>,
    pub head_sha: Option<String>,
    pub html_url: String,
    pub created_at: String,
}

/// Workflow run listing envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunList {
    pub total_count: i64,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

/// One job inside a workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

/// One step inside a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub number: i64,
}

/// Job listing envelope for a run.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowJobList {
    #[serde(default)]
    pub jobs: Vec<WorkflowJob>,
}

// ── Branch protection request ────────────────────────────────────────────────

/// Branch protection settings applied after branch creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchProtection {
    /// Status check contexts that must pass before merging.
    #[serde(default)]
    pub required_status_checks: Vec<String>,

    /// Whether admins are also subject to the rules.
    #[serde(default)]
    pub enforce_admins: bool,

    /// Number of required approving PR reviews (0 = none required).
    #[serde(default)]
    pub required_approving_review_count: u32,
}

impl GitHubClient {
    /// Create a new GitHub client.
    pub fn new(config: GitHubClientConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();

        let token_value = header::HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| AppError::authentication("Invalid token format"))?;
        headers.insert(header::AUTHORIZATION, token_value);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        // GitHub rejects requests without a User-Agent
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("octosync"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the full URL for an API path.
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Handle API response errors.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        endpoint: &str,
    ) -> Result<T, AppError> {
        let status = response.status();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| AppError::internal(format!("Failed to parse response: {}", e)))
        } else if status == StatusCode::UNAUTHORIZED {
            // 401 Unauthorized - token is expired or revoked
            Err(AppError::authentication_expired(
                "GitHub token expired or revoked. Please re-link the account.",
            ))
        } else {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            // GitHub returns errors as {"message": "...", "errors": [...]}
            let body_message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("message").and_then(|m| {
                        if let Some(s) = m.as_str() {
                            Some(s.to_string())
                        } else {
                            Some(m.to_string())
                        }
                    })
                });

            let message = body_message.unwrap_or_else(|| match status_code {
                403 => "Access denied".to_string(),
                404 => "Resource not found".to_string(),
                429 => "Rate limit exceeded".to_string(),
                _ => format!("Request failed ({}): {}", status_code, body),
            });

            Err(AppError::github_api_full(&message, status_code, endpoint))
        }
    }

    /// GET a JSON payload.
    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, AppError> {
        let url = self.api_url(endpoint);
        let response = self.client.get(&url).send().await?;
        self.handle_response(response, endpoint).await
    }

    /// POST a JSON body and parse a JSON payload.
    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T, AppError> {
        let url = self.api_url(endpoint);
        let response = self.client.post(&url).json(body).send().await?;
        self.handle_response(response, endpoint).await
    }

    /// POST a JSON body, expecting only a success status.
    async fn post_empty(&self, endpoint: &str, body: &serde_json::Value) -> Result<(), AppError> {
        let url = self.api_url(endpoint);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::UNAUTHORIZED {
            Err(AppError::authentication_expired(
                "GitHub token expired or revoked. Please re-link the account.",
            ))
        } else {
            let body_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body_text)
                .ok()
                .and_then(|v| v.get("message")?.as_str().map(String::from))
                .unwrap_or_else(|| format!("Request failed ({})", status));
            Err(AppError::github_api_full(&message, status.as_u16(), endpoint))
        }
    }

    // ── Git data API ─────────────────────────────────────────────────────────

    /// Resolve a branch ref to its current tip.
    pub async fn get_ref(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<GitRef, AppError> {
        let endpoint = format!("/repos/{}/{}/git/ref/heads/{}", owner, repo, branch);
        self.get_json(&endpoint).await
    }

    /// Fetch a commit object (includes its tree SHA).
    pub async fn get_commit(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<GitCommit, AppError> {
        let endpoint = format!("/repos/{}/{}/git/commits/{}", owner, repo, sha);
        self.get_json(&endpoint).await
    }

    /// Create a tree from inline entries, deltaed against `base_tree`.
    pub async fn create_tree(
        &self,
        owner: &str,
        repo: &str,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<CreatedTree, AppError> {
        let endpoint = format!("/repos/{}/{}/git/trees", owner, repo);
        let body = serde_json::json!({
            "base_tree": base_tree,
            "tree": entries,
        });
        self.post_json(&endpoint, &body).await
    }

    /// Create a commit object pointing at a tree.
    pub async fn create_commit(
        &self,
        owner: &str,
        repo: &str,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<GitCommit, AppError> {
        let endpoint = format!("/repos/{}/{}/git/commits", owner, repo);
        let body = serde_json::json!({
            "message": message,
            "tree": tree,
            "parents": parents,
        });
        self.post_json(&endpoint, &body).await
    }

    /// Advance a branch ref to a new commit (fast-forward only).
    pub async fn update_ref(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<GitRef, AppError> {
        let endpoint = format!("/repos/{}/{}/git/refs/heads/{}", owner, repo, branch);
        let url = self.api_url(&endpoint);
        let body = serde_json::json!({ "sha": sha, "force": false });
        let response = self.client.patch(&url).json(&body).send().await?;
        self.handle_response(response, &endpoint).await
    }

    /// Create a new ref pointing at an existing commit.
    pub async fn create_ref(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<GitRef, AppError> {
        let endpoint = format!("/repos/{}/{}/git/refs", owner, repo);
        let body = serde_json::json!({
            "ref": format!("refs/heads/{}", branch),
            "sha": sha,
        });
        self.post_json(&endpoint, &body).await
    }

    // ── Contents API ─────────────────────────────────────────────────────────

    /// List the entries of a directory at a ref. Top-level only; the contents
    /// API does not recurse.
    pub async fn list_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<ContentEntry>, AppError> {
        let endpoint = format!(
            "/repos/{}/{}/contents/{}?ref={}",
            owner,
            repo,
            urlencoding::encode(path).replace("%2F", "/"),
            urlencoding::encode(branch)
        );
        self.get_json(&endpoint).await
    }

    /// Fetch a single file's transport-encoded content at a ref.
    ///
    /// Returns `None` when the file does not exist (404 is the upstream
    /// signal for "file does not exist yet", not an error here).
    pub async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<ContentFile>, AppError> {
        let endpoint = format!(
            "/repos/{}/{}/contents/{}?ref={}",
            owner,
            repo,
            urlencoding::encode(path).replace("%2F", "/"),
            urlencoding::encode(branch)
        );
        let url = self.api_url(&endpoint);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        self.handle_response(response, &endpoint).await.map(Some)
    }

    /// Create a file through the contents API.
    pub async fn put_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
        message: &str,
        content_base64: &str,
    ) -> Result<(), AppError> {
        let endpoint = format!(
            "/repos/{}/{}/contents/{}",
            owner,
            repo,
            urlencoding::encode(path).replace("%2F", "/")
        );
        let url = self.api_url(&endpoint);
        let body = serde_json::json!({
            "message": message,
            "content": content_base64,
            "branch": branch,
        });
        let response = self.client.put(&url).json(&body).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body_text)
                .ok()
                .and_then(|v| v.get("message")?.as_str().map(String::from))
                .unwrap_or_else(|| format!("Request failed ({})", status));
            Err(AppError::github_api_full(&message, status.as_u16(), &endpoint))
        }
    }

    // ── Branches & comparisons ───────────────────────────────────────────────

    /// List branches (fixed page size of 100; larger repositories truncate).
    pub async fn list_branches(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<BranchInfo>, AppError> {
        let endpoint = format!("/repos/{}/{}/branches?per_page=100", owner, repo);
        self.get_json(&endpoint).await
    }

    /// Check whether a branch has protection configured. A 404 means "not
    /// protected" rather than an error.
    pub async fn get_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<bool, AppError> {
        let endpoint = format!("/repos/{}/{}/branches/{}/protection", owner, repo, branch);
        let url = self.api_url(&endpoint);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            Ok(false)
        } else if status.is_success() {
            Ok(true)
        } else {
            Err(AppError::github_api_full(
                "Failed to fetch branch protection",
                status.as_u16(),
                &endpoint,
            ))
        }
    }

    /// Apply protection rules to a branch.
    pub async fn set_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        protection: &BranchProtection,
    ) -> Result<(), AppError> {
        let endpoint = format!("/repos/{}/{}/branches/{}/protection", owner, repo, branch);
        let url = self.api_url(&endpoint);
        let required_checks = if protection.required_status_checks.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::json!({
                "strict": true,
                "contexts": protection.required_status_checks,
            })
        };
        let required_reviews = if protection.required_approving_review_count == 0 {
            serde_json::Value::Null
        } else {
            serde_json::json!({
                "required_approving_review_count": protection.required_approving_review_count,
            })
        };
        let body = serde_json::json!({
            "required_status_checks": required_checks,
            "enforce_admins": protection.enforce_admins,
            "required_pull_request_reviews": required_reviews,
            "restrictions": serde_json::Value::Null,
        });

        let response = self.client.put(&url).json(&body).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::github_api_full(
                "Failed to apply branch protection",
                status.as_u16(),
                &endpoint,
            ))
        }
    }

    /// Compare two branches (ahead/behind, commits, changed files).
    pub async fn compare(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Comparison, AppError> {
        let endpoint = format!(
            "/repos/{}/{}/compare/{}...{}",
            owner,
            repo,
            urlencoding::encode(base),
            urlencoding::encode(head)
        );
        self.get_json(&endpoint).await
    }

    /// List recent commits on a branch (fixed page size).
    pub async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        per_page: u32,
    ) -> Result<Vec<CommitSummary>, AppError> {
        let endpoint = format!(
            "/repos/{}/{}/commits?sha={}&per_page={}",
            owner,
            repo,
            urlencoding::encode(branch),
            per_page
        );
        self.get_json(&endpoint).await
    }

    /// Fetch one commit's detail (summary shape, includes message/author).
    pub async fn get_commit_detail(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<CommitSummary, AppError> {
        let endpoint = format!("/repos/{}/{}/commits/{}", owner, repo, sha);
        self.get_json(&endpoint).await
    }

    // ── Pull requests ────────────────────────────────────────────────────────

    /// Open a pull request.
    pub async fn create_pull(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest, AppError> {
        let endpoint = format!("/repos/{}/{}/pulls", owner, repo);
        let payload = serde_json::json!({
            "title": title,
            "body": body,
            "head": head,
            "base": base,
        });
        self.post_json(&endpoint, &payload).await
    }

    /// Fetch a pull request (mergeable state included).
    pub async fn get_pull(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
    ) -> Result<PullRequest, AppError> {
        let endpoint = format!("/repos/{}/{}/pulls/{}", owner, repo, number);
        self.get_json(&endpoint).await
    }

    /// Merge a pull request.
    pub async fn merge_pull(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        method: &str,
    ) -> Result<MergeResult, AppError> {
        let endpoint = format!("/repos/{}/{}/pulls/{}/merge", owner, repo, number);
        let url = self.api_url(&endpoint);
        let body = serde_json::json!({ "merge_method": method });
        let response = self.client.put(&url).json(&body).send().await?;
        self.handle_response(response, &endpoint).await
    }

    // ── Releases ─────────────────────────────────────────────────────────────

    /// Create a release.
    pub async fn create_release(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        name: &str,
        body: &str,
        draft: bool,
        prerelease: bool,
    ) -> Result<Release, AppError> {
        let endpoint = format!("/repos/{}/{}/releases", owner, repo);
        let payload = serde_json::json!({
            "tag_name": tag,
            "name": name,
            "body": body,
            "draft": draft,
            "prerelease": prerelease,
        });
        self.post_json(&endpoint, &payload).await
    }

    // ── Actions workflows ────────────────────────────────────────────────────

    /// List configured workflows.
    pub async fn list_workflows(&self, owner: &str, repo: &str) -> Result<WorkflowList, AppError> {
        let endpoint = format!("/repos/{}/{}/actions/workflows?per_page=100", owner, repo);
        self.get_json(&endpoint).await
    }

    /// Dispatch a workflow run on a branch.
    pub async fn dispatch_workflow(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: &str,
        branch: &str,
        inputs: &serde_json::Value,
    ) -> Result<(), AppError> {
        let endpoint = format!(
            "/repos/{}/{}/actions/workflows/{}/dispatches",
            owner,
            repo,
            urlencoding::encode(workflow_id)
        );
        let body = serde_json::json!({ "ref": branch, "inputs": inputs });
        self.post_empty(&endpoint, &body).await
    }

    /// List recent workflow runs (fixed page size).
    pub async fn list_workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<WorkflowRunList, AppError> {
        let endpoint = format!(
            "/repos/{}/{}/actions/runs?per_page={}",
            owner, repo, per_page
        );
        self.get_json(&endpoint).await
    }

    /// Cancel a workflow run.
    pub async fn cancel_workflow_run(
        &self,
        owner: &str,
        repo: &str,
        run_id: i64,
    ) -> Result<(), AppError> {
        let endpoint = format!("/repos/{}/{}/actions/runs/{}/cancel", owner, repo, run_id);
        self.post_empty(&endpoint, &serde_json::json!({})).await
    }

    /// List the jobs (with per-step status) of a workflow run.
    pub async fn list_run_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: i64,
    ) -> Result<WorkflowJobList, AppError> {
        let endpoint = format!("/repos/{}/{}/actions/runs/{}/jobs", owner, repo, run_id);
        self.get_json(&endpoint).await
    }
}
