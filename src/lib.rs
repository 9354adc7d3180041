//! octosync: GitHub repository synchronization and workflow orchestration.
//!
//! Pushes batches of in-memory file changes to linked repositories as single
//! commits via the git data API, pulls remote content back, and exposes
//! workflow, branch, merge, and release orchestration over a small HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use error::AppError;
