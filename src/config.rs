//! Runtime configuration from environment variables.

use std::path::PathBuf;

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the HTTP API.
    pub port: u16,

    /// Path to the SQLite database file.
    pub db_path: PathBuf,

    /// Secret used to derive the token encryption key.
    pub token_key: String,

    /// Base URL of the GitHub API.
    pub github_api: String,
}

impl Config {
    /// Read configuration from the environment, with local-development
    /// defaults for everything except the token key.
    pub fn from_env() -> Result<Self, String> {
        let port = match std::env::var("OCTOSYNC_PORT") {
            Ok(v) => v
                .parse::<u16>()
                .map_err(|_| format!("OCTOSYNC_PORT is not a valid port: {}", v))?,
            Err(_) => 7420,
        };

        let db_path = std::env::var("OCTOSYNC_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::db::get_db_path(std::path::Path::new("data")));

        let token_key = std::env::var("OCTOSYNC_TOKEN_KEY")
            .map_err(|_| "OCTOSYNC_TOKEN_KEY is required".to_string())?;
        if token_key.is_empty() {
            return Err("OCTOSYNC_TOKEN_KEY must not be empty".to_string());
        }

        let github_api = std::env::var("OCTOSYNC_GITHUB_API")
            .unwrap_or_else(|_| "https://api.github.com".to_string());

        Ok(Self {
            port,
            db_path,
            token_key,
            github_api,
        })
    }
}
