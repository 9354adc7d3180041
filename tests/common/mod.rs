//! Shared test fixtures: a scripted in-process GitHub API mock and database
//! seeding helpers.
#![allow(dead_code)]

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use octosync::models::{Account, Project};
use octosync::services::TokenCipher;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// One request the mock received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: Value,
}

/// Scriptable repository state behind the mock.
#[derive(Default)]
pub struct MockState {
    /// branch name -> tip commit sha
    pub branch_tips: HashMap<String, String>,
    /// commit sha -> git commit object
    pub commits: HashMap<String, Value>,
    /// top-level file path -> plain content
    pub files: HashMap<String, String>,
    /// file paths that answer 500 on fetch
    pub broken_files: HashSet<String>,
    /// workflow ids that accept dispatches
    pub known_workflow_ids: HashSet<String>,
    /// configured workflow listing
    pub workflows: Vec<Value>,
    /// workflow runs listing
    pub runs: Vec<Value>,
    /// jobs returned for any run
    pub jobs: Vec<Value>,
    /// "base...head" -> comparison object
    pub comparisons: HashMap<String, Value>,
    /// branches with protection configured
    pub protected_branches: HashSet<String>,
    /// mergeable flag reported for created PRs
    pub pr_mergeable: Option<bool>,
    /// commit summaries returned by the list-commits endpoint
    pub commit_summaries: Vec<Value>,
    /// force ref updates to fail with a conflict
    pub fail_ref_update: bool,
    /// force workflow dispatches to answer 500
    pub fail_dispatch: bool,
    /// force run cancellations to answer 500
    pub fail_run_cancel: bool,
    pub requests: Vec<Recorded>,
    tree_counter: u64,
    commit_counter: u64,
    pr_counter: i64,
}

impl MockState {
    /// Seed a repository with a `main` branch at a known tip.
    pub fn seed_main(&mut self) {
        self.branch_tips.insert("main".into(), "commit-base".into());
        self.commits.insert(
            "commit-base".into(),
            json!({
                "sha": "commit-base",
                "tree": {"sha": "tree-base"},
                "parents": [],
                "html_url": "https://example.invalid/commit-base",
                "message": "initial"
            }),
        );
    }
}

type Shared = Arc<Mutex<MockState>>;

/// In-process GitHub API stand-in bound to an ephemeral port.
pub struct MockGitHub {
    pub state: Shared,
    addr: SocketAddr,
}

impl MockGitHub {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { state, addr }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received for a method + path prefix.
    pub fn requests(&self, method: &str, path_prefix: &str) -> Vec<Recorded> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path.starts_with(path_prefix))
            .cloned()
            .collect()
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response()
}

async fn handle(State(state): State<Shared>, req: Request) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let bytes = axum::body::to_bytes(req.into_body(), 1024 * 1024)
        .await
        .unwrap_or_default();
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    let mut s = state.lock().unwrap();
    s.requests.push(Recorded {
        method: method.to_string(),
        path: path.clone(),
        body: body.clone(),
    });

    let segments: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let rest = match segments.as_slice() {
        ["repos", _owner, _repo, rest @ ..] => rest.to_vec(),
        _ => return not_found(),
    };

    match (method.as_str(), rest.as_slice()) {
        ("GET", ["git", "ref", "heads", branch]) => match s.branch_tips.get(*branch) {
            Some(sha) => Json(json!({
                "ref": format!("refs/heads/{}", branch),
                "object": {"sha": sha, "type": "commit"}
            }))
            .into_response(),
            None => not_found(),
        },

        ("GET", ["git", "commits", sha]) => match s.commits.get(*sha) {
            Some(commit) => Json(commit.clone()).into_response(),
            None => not_found(),
        },

        ("POST", ["git", "trees"]) => {
            s.tree_counter += 1;
            let sha = format!("tree-new-{}", s.tree_counter);
            (StatusCode::CREATED, Json(json!({"sha": sha}))).into_response()
        }

        ("POST", ["git", "commits"]) => {
            s.commit_counter += 1;
            let sha = format!("commit-new-{}", s.commit_counter);
            let commit = json!({
                "sha": sha,
                "tree": {"sha": body["tree"]},
                "parents": body["parents"].as_array().map(|ps| {
                    ps.iter().map(|p| json!({"sha": p})).collect::<Vec<_>>()
                }).unwrap_or_default(),
                "html_url": format!("https://example.invalid/{}", sha),
                "message": body["message"]
            });
            s.commits.insert(sha.clone(), commit.clone());
            (StatusCode::CREATED, Json(commit)).into_response()
        }

        ("PATCH", ["git", "refs", "heads", branch]) => {
            if s.fail_ref_update {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({"message": "Update is not a fast forward"})),
                )
                    .into_response();
            }
            let sha = body["sha"].as_str().unwrap_or_default().to_string();
            s.branch_tips.insert(branch.to_string(), sha.clone());
            Json(json!({
                "ref": format!("refs/heads/{}", branch),
                "object": {"sha": sha, "type": "commit"}
            }))
            .into_response()
        }

        ("POST", ["git", "refs"]) => {
            let full = body["ref"].as_str().unwrap_or_default().to_string();
            let branch = full.trim_start_matches("refs/heads/").to_string();
            let sha = body["sha"].as_str().unwrap_or_default().to_string();
            s.branch_tips.insert(branch, sha.clone());
            (
                StatusCode::CREATED,
                Json(json!({"ref": full, "object": {"sha": sha, "type": "commit"}})),
            )
                .into_response()
        }

        ("GET", ["contents"]) => {
            let entries: Vec<Value> = s
                .files
                .iter()
                .filter(|(p, _)| !p.contains('/'))
                .map(|(p, c)| {
                    json!({
                        "name": p,
                        "path": p,
                        "sha": format!("sha-{}", p),
                        "type": "file",
                        "size": c.len()
                    })
                })
                .collect();
            Json(entries).into_response()
        }

        ("GET", ["contents", file_path @ ..]) => {
            let file_path = file_path.join("/");
            if s.broken_files.contains(&file_path) {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"message": "boom"})),
                )
                    .into_response();
            }
            match s.files.get(&file_path) {
                Some(content) => Json(json!({
                    "path": file_path,
                    "sha": format!("sha-{}", file_path),
                    "content": BASE64.encode(content),
                    "encoding": "base64"
                }))
                .into_response(),
                None => not_found(),
            }
        }

        ("PUT", ["contents", file_path @ ..]) => {
            let file_path = file_path.join("/");
            let encoded = body["content"].as_str().unwrap_or_default();
            let content = BASE64
                .decode(encoded)
                .ok()
                .and_then(|b| String::from_utf8(b).ok())
                .unwrap_or_default();
            s.files.insert(file_path.clone(), content);
            (
                StatusCode::CREATED,
                Json(json!({"content": {"path": file_path}})),
            )
                .into_response()
        }

        ("GET", ["branches"]) => {
            let branches: Vec<Value> = s
                .branch_tips
                .iter()
                .map(|(name, sha)| {
                    json!({
                        "name": name,
                        "commit": {"sha": sha},
                        "protected": s.protected_branches.contains(name)
                    })
                })
                .collect();
            Json(branches).into_response()
        }

        ("GET", ["branches", branch, "protection"]) => {
            if s.protected_branches.contains(*branch) {
                Json(json!({"enabled": true})).into_response()
            } else {
                not_found()
            }
        }

        ("PUT", ["branches", branch, "protection"]) => {
            s.protected_branches.insert(branch.to_string());
            Json(json!({"enabled": true})).into_response()
        }

        ("GET", ["compare", range]) => match s.comparisons.get(*range) {
            Some(cmp) => Json(cmp.clone()).into_response(),
            None => not_found(),
        },

        ("GET", ["commits"]) => Json(s.commit_summaries.clone()).into_response(),

        ("GET", ["commits", sha]) => {
            let found = s
                .commit_summaries
                .iter()
                .find(|c| c["sha"] == json!(sha))
                .cloned();
            match found {
                Some(c) => Json(c).into_response(),
                None => not_found(),
            }
        }

        ("POST", ["pulls"]) => {
            s.pr_counter += 1;
            (
                StatusCode::CREATED,
                Json(json!({
                    "number": s.pr_counter,
                    "title": body["title"],
                    "html_url": format!("https://example.invalid/pull/{}", s.pr_counter),
                    "state": "open",
                    "mergeable": s.pr_mergeable
                })),
            )
                .into_response()
        }

        ("GET", ["pulls", number]) => Json(json!({
            "number": number.parse::<i64>().unwrap_or(0),
            "title": "pr",
            "html_url": "https://example.invalid/pull",
            "state": "open",
            "mergeable": s.pr_mergeable
        }))
        .into_response(),

        ("PUT", ["pulls", _number, "merge"]) => Json(json!({
            "sha": "merge-sha",
            "merged": true,
            "message": "Pull Request successfully merged"
        }))
        .into_response(),

        ("POST", ["releases"]) => (
            StatusCode::CREATED,
            Json(json!({
                "id": 1,
                "tag_name": body["tag_name"],
                "name": body["name"],
                "html_url": "https://example.invalid/releases/1"
            })),
        )
            .into_response(),

        ("GET", ["actions", "workflows"]) => Json(json!({
            "total_count": s.workflows.len(),
            "workflows": s.workflows.clone()
        }))
        .into_response(),

        ("POST", ["actions", "workflows", id, "dispatches"]) => {
            if s.fail_dispatch {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"message": "dispatch exploded"})),
                )
                    .into_response()
            } else if s.known_workflow_ids.contains(*id) {
                StatusCode::NO_CONTENT.into_response()
            } else {
                not_found()
            }
        }

        ("GET", ["actions", "runs"]) => Json(json!({
            "total_count": s.runs.len(),
            "workflow_runs": s.runs.clone()
        }))
        .into_response(),

        ("POST", ["actions", "runs", _id, "cancel"]) => {
            if s.fail_run_cancel {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"message": "cancel exploded"})),
                )
                    .into_response()
            } else {
                StatusCode::ACCEPTED.into_response()
            }
        }

        ("GET", ["actions", "runs", _id, "jobs"]) => {
            Json(json!({"jobs": s.jobs})).into_response()
        }

        _ => not_found(),
    }
}

// ── Database seeding ─────────────────────────────────────────────────────────

pub const TEST_SECRET: &str = "integration-test-secret";

/// Fresh database with one active account and one linked project.
pub async fn seeded_db() -> (octosync::db::pool::DbPool, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = octosync::db::initialize(&dir.path().join("test.db"))
        .await
        .unwrap();

    let cipher = TokenCipher::new(TEST_SECRET).unwrap();
    let account = Account {
        id: "acct-1".into(),
        owner_id: "user-1".into(),
        username: "octocat".into(),
        token_ciphertext: cipher.encrypt("ghp_test_token").unwrap(),
        is_active: true,
        is_default: true,
        can_create_repos: true,
        can_create_private_repos: true,
        created_at: 1_700_000_000,
    };
    octosync::models::account::insert_account(&pool, &account)
        .await
        .unwrap();

    let project = Project {
        id: "proj-1".into(),
        name: "Widgets".into(),
        github_enabled: true,
        repo_owner: Some("acme".into()),
        repo_name: Some("widgets".into()),
        repo_url: Some("https://github.com/acme/widgets".into()),
        default_branch: "main".into(),
        sync_status: "pending".into(),
        last_sync_at: None,
        last_commit_sha: None,
        sync_errors: None,
        created_at: 1_700_000_000,
    };
    octosync::models::project::insert_project(&pool, &project)
        .await
        .unwrap();

    (pool, dir)
}

/// Client pointed at the mock.
pub fn mock_client(mock: &MockGitHub) -> octosync::services::GitHubClient {
    octosync::services::GitHubClient::new(octosync::services::GitHubClientConfig {
        base_url: mock.base_url(),
        token: "ghp_test_token".into(),
        timeout_secs: 5,
    })
    .unwrap()
}
