//! Service layer: the GitHub client, credential handling, and the
//! synchronization and orchestration engines built on top of them.

pub mod branches;
pub mod client_cache;
pub mod credentials;
pub mod github_client;
pub mod sync_engine;
pub mod workflows;

pub use client_cache::ClientCache;
pub use credentials::TokenCipher;
pub use github_client::{GitHubClient, GitHubClientConfig};
