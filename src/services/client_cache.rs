//! Per-account API client cache.
//!
//! Building a client means a database read, a token decryption, and an HTTP
//! connection pool. The cache guarantees at most one client is constructed
//! per account even under concurrent access, and evicts entries after a TTL
//! so revoked or rotated tokens do not live forever.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::services::credentials::{self, TokenCipher};
use crate::services::github_client::{GitHubClient, GitHubClientConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default cache entry lifetime.
const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

struct CachedClient {
    client: Arc<GitHubClient>,
    created_at: Instant,
}

/// Cache of authenticated API clients keyed by account id.
///
/// Owned by application state and passed by reference; there are no globals.
pub struct ClientCache {
    pool: DbPool,
    cipher: TokenCipher,
    base_url: String,
    ttl: Duration,
    clients: RwLock<HashMap<String, CachedClient>>,
    misses: AtomicU64,
}

impl ClientCache {
    /// Create a cache with the default TTL.
    pub fn new(pool: DbPool, cipher: TokenCipher, base_url: impl Into<String>) -> Self {
        Self::with_ttl(pool, cipher, base_url, DEFAULT_TTL)
    }

    /// Create a cache with an explicit TTL.
    pub fn with_ttl(
        pool: DbPool,
        cipher: TokenCipher,
        base_url: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            pool,
            cipher,
            base_url: base_url.into(),
            ttl,
            clients: RwLock::new(HashMap::new()),
            misses: AtomicU64::new(0),
        }
    }

    /// Get the client for an account, constructing it on first use.
    pub async fn get(&self, account_id: &str) -> Result<Arc<GitHubClient>, AppError> {
        {
            let clients = self.clients.read().await;
            if let Some(entry) = clients.get(account_id) {
                if entry.created_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(&entry.client));
                }
            }
        }

        // Write lock held across construction so concurrent callers for the
        // same account wait instead of building duplicate clients.
        let mut clients = self.clients.write().await;
        if let Some(entry) = clients.get(account_id) {
            if entry.created_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&entry.client));
            }
        }

        let token = credentials::resolve_token(&self.pool, &self.cipher, account_id).await?;
        let client = Arc::new(GitHubClient::new(GitHubClientConfig {
            base_url: self.base_url.clone(),
            token,
            ..GitHubClientConfig::default()
        })?);

        self.misses.fetch_add(1, Ordering::Relaxed);
        clients.insert(
            account_id.to_string(),
            CachedClient {
                client: Arc::clone(&client),
                created_at: Instant::now(),
            },
        );

        log::debug!("Constructed API client for account {}", account_id);
        Ok(client)
    }

    /// Drop the cached client for one account (e.g., after token rotation).
    pub async fn clear_account(&self, account_id: &str) {
        self.clients.write().await.remove(account_id);
    }

    /// Drop all cached clients.
    pub async fn clear(&self) {
        self.clients.write().await.clear();
    }

    /// Number of live cache entries (expired entries included until touched).
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Cache misses so far, i.e. how many times a client was actually built.
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Account;
    use tempfile::tempdir;

    async fn setup() -> (DbPool, TokenCipher, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let pool = db::initialize(&dir.path().join("test.db")).await.unwrap();
        let cipher = TokenCipher::new("cache-test-secret").unwrap();

        let account = Account {
            id: "acct-1".into(),
            owner_id: "user-1".into(),
            username: "octocat".into(),
            token_ciphertext: cipher.encrypt("ghp_token").unwrap(),
            is_active: true,
            is_default: true,
            can_create_repos: true,
            can_create_private_repos: false,
            created_at: 1_700_000_000,
        };
        crate::models::account::insert_account(&pool, &account)
            .await
            .unwrap();

        (pool, cipher, dir)
    }

    #[tokio::test]
    async fn test_same_client_returned_for_same_account() {
        let (pool, cipher, _dir) = setup().await;
        let cache = ClientCache::new(pool, cipher, "http://localhost:1");

        let a = cache.get("acct-1").await.unwrap();
        let b = cache.get("acct-1").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.miss_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_gets_construct_one_client() {
        let (pool, cipher, _dir) = setup().await;
        let cache = Arc::new(ClientCache::new(pool, cipher, "http://localhost:1"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get("acct-1").await.unwrap() })
            })
            .collect();

        let mut clients = Vec::new();
        for h in handles {
            clients.push(h.await.unwrap());
        }

        for c in &clients[1..] {
            assert!(Arc::ptr_eq(&clients[0], c));
        }
        assert_eq!(cache.len().await, 1);
        // Exactly one decrypt-and-build happened across the eight tasks, not
        // a built-then-discarded duplicate.
        assert_eq!(cache.miss_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_account_forces_rebuild() {
        let (pool, cipher, _dir) = setup().await;
        let cache = ClientCache::new(pool, cipher, "http://localhost:1");

        let a = cache.get("acct-1").await.unwrap();
        cache.clear_account("acct-1").await;
        let b = cache.get("acct-1").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_ttl_expiry_rebuilds() {
        let (pool, cipher, _dir) = setup().await;
        let cache = ClientCache::with_ttl(
            pool,
            cipher,
            "http://localhost:1",
            Duration::from_millis(10),
        );

        let a = cache.get("acct-1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        let b = cache.get("acct-1").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.miss_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_account_not_cached() {
        let (pool, cipher, _dir) = setup().await;
        let cache = ClientCache::new(pool, cipher, "http://localhost:1");

        assert!(cache.get("missing").await.is_err());
        assert!(cache.is_empty().await);
    }
}
