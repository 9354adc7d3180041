//! Linked GitHub account model.
//!
//! An account represents one external git-hosting identity. The access token
//! is stored encrypted at rest and only decrypted transiently inside the
//! credential resolver. This subsystem never mutates account rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A linked GitHub identity used to authenticate API calls.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account identifier.
    pub id: String,

    /// Owning user/organization reference.
    pub owner_id: String,

    /// GitHub username.
    pub username: String,

    /// Encrypted access token (base64 of nonce || ciphertext).
    #[serde(skip_serializing)]
    pub token_ciphertext: String,

    /// Whether the account is active.
    pub is_active: bool,

    /// Whether this is the owner's default account.
    pub is_default: bool,

    /// Whether the token is scoped to create repositories.
    pub can_create_repos: bool,

    /// Whether the token is scoped to create private repositories.
    pub can_create_private_repos: bool,

    /// Unix timestamp the account was linked.
    pub created_at: i64,
}

/// Look up an account by id.
pub async fn get_account(
    pool: &sqlx::SqlitePool,
    account_id: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT id, owner_id, username, token_ciphertext, is_active, is_default,
                can_create_repos, can_create_private_repos, created_at
         FROM accounts WHERE id = ?",
    )
    .bind(account_id)
    .fetch_optional(pool)
    .await
}

/// Insert an account row. Used when a user links an account.
pub async fn insert_account(pool: &sqlx::SqlitePool, account: &Account) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO accounts (id, owner_id, username, token_ciphertext, is_active, is_default,
                               can_create_repos, can_create_private_repos, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&account.id)
    .bind(&account.owner_id)
    .bind(&account.username)
    .bind(&account.token_ciphertext)
    .bind(account.is_active)
    .bind(account.is_default)
    .bind(account.can_create_repos)
    .bind(account.can_create_private_repos)
    .bind(account.created_at)
    .execute(pool)
    .await?;

    Ok(())
}
