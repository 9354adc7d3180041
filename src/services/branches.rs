//! Branch, merge, and release orchestration.
//!
//! Reads propagate `AppError`; mutations catch their own failures and come
//! back as `{success, message}` result values so callers always get a
//! reportable outcome. Branch detail assembly fans out per branch
//! (protection, comparison, tip commit) and degrades per field rather than
//! failing the whole listing when one upstream call misbehaves.

use crate::error::AppError;
use crate::services::github_client::{
    BranchProtection, Comparison, GitHubClient, Release,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

/// Commits folded into a generated changelog.
const CHANGELOG_COMMITS: u32 = 20;

/// Poll attempts while the merge-ability of a fresh PR is still unknown.
const MERGEABLE_POLL_ATTEMPTS: u32 = 5;

/// Assembled view of one branch. Fields sourced from degraded upstream calls
/// are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchDetails {
    pub name: String,
    pub sha: String,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ahead_by: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behind_by: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit_date: Option<String>,
}

/// Outcome of a branch creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchCreateResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// Two-branch merge preview with a generated PR title/description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePreview {
    pub ahead_by: i64,
    pub behind_by: i64,
    pub commit_messages: Vec<String>,
    pub changed_files: Vec<ChangedFile>,
    pub suggested_title: String,
    pub suggested_description: String,
}

/// One changed file in a merge preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    pub status: String,
    pub additions: i64,
    pub deletions: i64,
}

/// Outcome of a merge attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<i64>,
}

/// Outcome of a release creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseSummary>,
}

/// The fields of a created release the caller cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    pub id: i64,
    pub tag_name: String,
    pub html_url: String,
}

impl From<Release> for ReleaseSummary {
    fn from(r: Release) -> Self {
        Self {
            id: r.id,
            tag_name: r.tag_name,
            html_url: r.html_url,
        }
    }
}

/// Create a branch from the tip of another, optionally applying protection.
pub async fn create_branch(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    name: &str,
    from: &str,
    protection: Option<&BranchProtection>,
) -> BranchCreateResult {
    match try_create_branch(client, owner, repo, name, from, protection).await {
        Ok(sha) => BranchCreateResult {
            success: true,
            message: format!("Created branch '{}' from '{}'", name, from),
            sha: Some(sha),
        },
        Err(e) => BranchCreateResult {
            success: false,
            message: format!("Failed to create branch: {}", e),
            sha: None,
        },
    }
}

async fn try_create_branch(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    name: &str,
    from: &str,
    protection: Option<&BranchProtection>,
) -> Result<String, AppError> {
    let tip = client.get_ref(owner, repo, from).await?;
    let created = client.create_ref(owner, repo, name, &tip.object.sha).await?;

    if let Some(rules) = protection {
        client.set_branch_protection(owner, repo, name, rules).await?;
        log::info!("Created protected branch {} in {}/{}", name, owner, repo);
    } else {
        log::info!("Created branch {} in {}/{}", name, owner, repo);
    }

    Ok(created.object.sha)
}

/// Assemble details for every branch in the repository.
///
/// For each branch, protection status, divergence from the default branch,
/// and the tip commit are fetched concurrently. Any of the three failing
/// leaves its fields unset instead of failing the branch or the listing.
pub async fn branch_details(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    default_branch: &str,
) -> Result<Vec<BranchDetails>, AppError> {
    let branches = client.list_branches(owner, repo).await?;

    let futures = branches.into_iter().map(|branch| async move {
        let (protection, comparison, tip) = tokio::join!(
            client.get_branch_protection(owner, repo, &branch.name),
            client.compare(owner, repo, default_branch, &branch.name),
            client.get_commit_detail(owner, repo, &branch.commit.sha),
        );

        if let Err(e) = &protection {
            log::debug!("Protection lookup failed for {}: {}", branch.name, e);
        }
        if let Err(e) = &comparison {
            log::debug!("Comparison failed for {}: {}", branch.name, e);
        }
        if let Err(e) = &tip {
            log::debug!("Tip commit lookup failed for {}: {}", branch.name, e);
        }

        let comparison = comparison.ok();
        let tip = tip.ok();

        BranchDetails {
            is_default: branch.name == default_branch,
            sha: branch.commit.sha,
            protected: protection.ok(),
            ahead_by: comparison.as_ref().map(|c| c.ahead_by),
            behind_by: comparison.as_ref().map(|c| c.behind_by),
            last_commit_message: tip
                .as_ref()
                .map(|c| c.commit.message.lines().next().unwrap_or("").to_string()),
            last_commit_author: tip
                .as_ref()
                .and_then(|c| c.commit.author.as_ref())
                .and_then(|a| a.name.clone()),
            last_commit_date: tip
                .as_ref()
                .and_then(|c| c.commit.author.as_ref())
                .and_then(|a| a.date.clone()),
            name: branch.name,
        }
    });

    Ok(join_all(futures).await)
}

/// Preview what merging `head` into `base` would bring in, with a generated
/// pull request title and description.
pub async fn merge_preview(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    base: &str,
    head: &str,
) -> Result<MergePreview, AppError> {
    let comparison = client.compare(owner, repo, base, head).await?;
    Ok(preview_from_comparison(comparison, base, head))
}

fn preview_from_comparison(comparison: Comparison, base: &str, head: &str) -> MergePreview {
    let commit_messages: Vec<String> = comparison
        .commits
        .iter()
        .map(|c| c.commit.message.lines().next().unwrap_or("").to_string())
        .collect();

    // One commit titles the PR itself; more than one gets a summary title
    // and a bullet list.
    let (suggested_title, suggested_description) = match commit_messages.as_slice() {
        [only] => (only.clone(), format!("Merging `{}` into `{}`.", head, base)),
        messages => (
            format!("Merge {} into {}", head, base),
            messages
                .iter()
                .filter(|m| !m.is_empty())
                .map(|m| format!("- {}", m))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
    };

    MergePreview {
        ahead_by: comparison.ahead_by,
        behind_by: comparison.behind_by,
        commit_messages,
        changed_files: comparison
            .files
            .into_iter()
            .map(|f| ChangedFile {
                filename: f.filename,
                status: f.status,
                additions: f.additions,
                deletions: f.deletions,
            })
            .collect(),
        suggested_title,
        suggested_description,
    }
}

/// Merge `head` into `base` through a pull request.
///
/// The PR's merge-ability is checked first; a conflicting PR is refused and
/// left open for manual resolution. All failures come back as a result
/// value.
pub async fn perform_merge(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    head: &str,
    base: &str,
    title: &str,
) -> MergeOutcome {
    match try_merge(client, owner, repo, head, base, title).await {
        Ok(outcome) => outcome,
        Err(e) => MergeOutcome {
            success: false,
            message: format!("Failed to merge: {}", e),
            merge_sha: None,
            pr_number: None,
        },
    }
}

async fn try_merge(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    head: &str,
    base: &str,
    title: &str,
) -> Result<MergeOutcome, AppError> {
    let mut pr = client
        .create_pull(
            owner,
            repo,
            title,
            &format!("Merging `{}` into `{}`.", head, base),
            head,
            base,
        )
        .await?;

    // GitHub computes merge-ability asynchronously; poll until it settles.
    let mut attempts = 0;
    while pr.mergeable.is_none() && attempts < MERGEABLE_POLL_ATTEMPTS {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        pr = client.get_pull(owner, repo, pr.number).await?;
        attempts += 1;
    }

    match pr.mergeable {
        Some(true) => {
            let result = client.merge_pull(owner, repo, pr.number, "merge").await?;
            log::info!(
                "Merged {} into {} in {}/{} (PR #{})",
                head,
                base,
                owner,
                repo,
                pr.number
            );
            Ok(MergeOutcome {
                success: result.merged,
                message: result.message,
                merge_sha: result.sha,
                pr_number: Some(pr.number),
            })
        }
        _ => Ok(MergeOutcome {
            success: false,
            message: format!(
                "Branch '{}' has conflicts with '{}'; resolve them in PR #{}",
                head, base, pr.number
            ),
            merge_sha: None,
            pr_number: Some(pr.number),
        }),
    }
}

/// Create a release with a changelog generated from recent commits on the
/// target branch.
pub async fn create_release(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    tag: &str,
    name: &str,
    branch: &str,
    draft: bool,
    prerelease: bool,
) -> ReleaseOutcome {
    match try_create_release(client, owner, repo, tag, name, branch, draft, prerelease).await {
        Ok(release) => ReleaseOutcome {
            success: true,
            message: format!("Created release {}", tag),
            release: Some(release.into()),
        },
        Err(e) => ReleaseOutcome {
            success: false,
            message: format!("Failed to create release: {}", e),
            release: None,
        },
    }
}

#[allow(clippy::too_many_arguments)]
async fn try_create_release(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    tag: &str,
    name: &str,
    branch: &str,
    draft: bool,
    prerelease: bool,
) -> Result<Release, AppError> {
    let commits = client
        .list_commits(owner, repo, branch, CHANGELOG_COMMITS)
        .await?;

    let changelog = build_changelog(
        commits
            .iter()
            .map(|c| c.commit.message.lines().next().unwrap_or("")),
    );

    let release = client
        .create_release(owner, repo, tag, name, &changelog, draft, prerelease)
        .await?;

    log::info!("Created release {} in {}/{}", tag, owner, repo);
    Ok(release)
}

/// Render commit subjects into a markdown changelog.
fn build_changelog<'a>(subjects: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::from("## Changes\n\n");
    let mut any = false;
    for subject in subjects {
        if subject.is_empty() {
            continue;
        }
        out.push_str("- ");
        out.push_str(subject);
        out.push('\n');
        any = true;
    }
    if !any {
        out.push_str("- No changes recorded\n");
    }
    out
}
