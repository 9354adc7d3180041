//! Branch, merge, and release orchestration tests against the GitHub mock.

mod common;

use common::{mock_client, MockGitHub};
use octosync::services::branches;
use octosync::services::github_client::BranchProtection;
use serde_json::json;

fn commit_summary(sha: &str, message: &str) -> serde_json::Value {
    json!({
        "sha": sha,
        "commit": {
            "message": message,
            "author": {"name": "Octo Cat", "date": "2026-08-01T00:00:00Z"}
        },
        "html_url": format!("https://example.invalid/{}", sha)
    })
}

#[tokio::test]
async fn create_branch_from_source_tip() {
    let mock = MockGitHub::start().await;
    mock.state.lock().unwrap().seed_main();
    let client = mock_client(&mock);

    let result = branches::create_branch(&client, "acme", "widgets", "feature", "main", None).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.sha.as_deref(), Some("commit-base"));
    assert_eq!(
        mock.state.lock().unwrap().branch_tips.get("feature"),
        Some(&"commit-base".to_string())
    );
}

#[tokio::test]
async fn create_protected_branch_applies_rules() {
    let mock = MockGitHub::start().await;
    mock.state.lock().unwrap().seed_main();
    let client = mock_client(&mock);

    let protection = BranchProtection {
        required_status_checks: vec!["ci".into()],
        enforce_admins: true,
        required_approving_review_count: 1,
    };
    let result = branches::create_branch(
        &client,
        "acme",
        "widgets",
        "release",
        "main",
        Some(&protection),
    )
    .await;

    assert!(result.success, "{}", result.message);
    let protections = mock.requests("PUT", "/repos/acme/widgets/branches/release/protection");
    assert_eq!(protections.len(), 1);
    assert_eq!(protections[0].body["enforce_admins"], json!(true));
    assert_eq!(
        protections[0].body["required_status_checks"]["contexts"],
        json!(["ci"])
    );
}

#[tokio::test]
async fn create_branch_from_missing_source_is_soft_failure() {
    let mock = MockGitHub::start().await;
    let client = mock_client(&mock);

    let result = branches::create_branch(&client, "acme", "widgets", "feature", "ghost", None).await;

    assert!(!result.success);
    assert!(result.message.starts_with("Failed to create branch:"));
}

#[tokio::test]
async fn branch_details_degrade_per_field() {
    let mock = MockGitHub::start().await;
    {
        let mut s = mock.state.lock().unwrap();
        s.seed_main();
        s.branch_tips.insert("feature".into(), "commit-feat".into());
        s.protected_branches.insert("main".into());
        // Comparison and tip detail exist for feature only; main degrades.
        s.comparisons.insert(
            "main...feature".into(),
            json!({
                "status": "ahead",
                "ahead_by": 3,
                "behind_by": 1,
                "commits": [],
                "files": []
            }),
        );
        s.commit_summaries
            .push(commit_summary("commit-feat", "Add feature\n\nbody"));
    }
    let client = mock_client(&mock);

    let mut details = branches::branch_details(&client, "acme", "widgets", "main")
        .await
        .unwrap();
    details.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(details.len(), 2);

    let feature = &details[0];
    assert_eq!(feature.name, "feature");
    assert!(!feature.is_default);
    assert_eq!(feature.protected, Some(false));
    assert_eq!(feature.ahead_by, Some(3));
    assert_eq!(feature.behind_by, Some(1));
    assert_eq!(feature.last_commit_message.as_deref(), Some("Add feature"));
    assert_eq!(feature.last_commit_author.as_deref(), Some("Octo Cat"));

    let main = &details[1];
    assert_eq!(main.name, "main");
    assert!(main.is_default);
    assert_eq!(main.protected, Some(true));
    // Degraded fields, not a failed listing
    assert_eq!(main.ahead_by, None);
    assert_eq!(main.last_commit_message, None);
}

#[tokio::test]
async fn merge_preview_generates_title_and_description() {
    let mock = MockGitHub::start().await;
    mock.state.lock().unwrap().comparisons.insert(
        "main...feature".into(),
        json!({
            "status": "ahead",
            "ahead_by": 2,
            "behind_by": 0,
            "commits": [
                commit_summary("c1", "First change"),
                commit_summary("c2", "Second change")
            ],
            "files": [
                {"filename": "src/app.js", "status": "modified", "additions": 4, "deletions": 1}
            ]
        }),
    );
    let client = mock_client(&mock);

    let preview = branches::merge_preview(&client, "acme", "widgets", "main", "feature")
        .await
        .unwrap();

    assert_eq!(preview.ahead_by, 2);
    assert_eq!(preview.suggested_title, "Merge feature into main");
    assert!(preview.suggested_description.contains("- First change"));
    assert_eq!(preview.changed_files.len(), 1);
    assert_eq!(preview.changed_files[0].filename, "src/app.js");
}

#[tokio::test]
async fn mergeable_pr_is_merged() {
    let mock = MockGitHub::start().await;
    mock.state.lock().unwrap().pr_mergeable = Some(true);
    let client = mock_client(&mock);

    let outcome =
        branches::perform_merge(&client, "acme", "widgets", "feature", "main", "Merge it").await;

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.merge_sha.as_deref(), Some("merge-sha"));
    assert_eq!(outcome.pr_number, Some(1));
    assert_eq!(mock.requests("PUT", "/repos/acme/widgets/pulls/1/merge").len(), 1);
}

#[tokio::test]
async fn conflicting_pr_is_refused_not_merged() {
    let mock = MockGitHub::start().await;
    mock.state.lock().unwrap().pr_mergeable = Some(false);
    let client = mock_client(&mock);

    let outcome =
        branches::perform_merge(&client, "acme", "widgets", "feature", "main", "Merge it").await;

    assert!(!outcome.success);
    assert!(outcome.message.contains("conflicts"));
    assert_eq!(outcome.pr_number, Some(1));
    assert!(mock.requests("PUT", "/repos/acme/widgets/pulls/1/merge").is_empty());
}

#[tokio::test]
async fn release_changelog_lists_recent_commit_subjects() {
    let mock = MockGitHub::start().await;
    {
        let mut s = mock.state.lock().unwrap();
        s.commit_summaries
            .push(commit_summary("c1", "Fix login bug\n\ndetails"));
        s.commit_summaries.push(commit_summary("c2", "Add dark mode"));
    }
    let client = mock_client(&mock);

    let outcome = branches::create_release(
        &client,
        "acme",
        "widgets",
        "v1.2.0",
        "v1.2.0",
        "main",
        false,
        false,
    )
    .await;

    assert!(outcome.success, "{}", outcome.message);
    let release = outcome.release.unwrap();
    assert_eq!(release.tag_name, "v1.2.0");

    let creates = mock.requests("POST", "/repos/acme/widgets/releases");
    assert_eq!(creates.len(), 1);
    let changelog = creates[0].body["body"].as_str().unwrap();
    assert!(changelog.contains("- Fix login bug"));
    assert!(changelog.contains("- Add dark mode"));
    assert!(!changelog.contains("details"));
}
