//! Persistent data models and their query helpers.

pub mod account;
pub mod project;

pub use account::Account;
pub use project::{Project, SyncStatus};
