//! Credential resolution for linked accounts.
//!
//! Access tokens are stored encrypted at rest (AES-256-GCM, key derived from
//! the process secret) and decrypted transiently here. Plaintext tokens never
//! leave this module except inside a constructed API client.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::account;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Symmetric cipher for access tokens.
///
/// The key is derived from an operator-supplied secret via SHA-256. Each
/// encryption uses a fresh random nonce, prepended to the ciphertext, and the
/// whole payload is base64-encoded for storage in a TEXT column.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher").finish_non_exhaustive()
    }
}

impl TokenCipher {
    /// Derive a cipher from the process secret.
    pub fn new(secret: &str) -> Result<Self, AppError> {
        if secret.is_empty() {
            return Err(AppError::credential("Token encryption secret is empty"));
        }

        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Encrypt a plaintext token for storage.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| AppError::credential("Token encryption failed"))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(payload))
    }

    /// Decrypt a stored token.
    pub fn decrypt(&self, encoded: &str) -> Result<String, AppError> {
        let payload = BASE64
            .decode(encoded)
            .map_err(|_| AppError::credential("Stored token is not valid base64"))?;

        if payload.len() <= NONCE_LEN {
            return Err(AppError::credential("Stored token payload too short"));
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| AppError::credential("Token decryption failed"))?;

        String::from_utf8(plaintext)
            .map_err(|_| AppError::credential("Decrypted token is not valid UTF-8"))
    }
}

/// Resolve the plaintext access token for an account.
///
/// Fails with `NotFound` for unknown accounts and `Authentication` for
/// inactive ones; decryption failures surface as `Credential` errors.
pub async fn resolve_token(
    pool: &DbPool,
    cipher: &TokenCipher,
    account_id: &str,
) -> Result<String, AppError> {
    let account = account::get_account(pool, account_id)
        .await?
        .ok_or_else(|| AppError::not_found_with_id("Account", account_id))?;

    if !account.is_active {
        return Err(AppError::authentication(format!(
            "Account {} is not active",
            account_id
        )));
    }

    cipher.decrypt(&account.token_ciphertext)
}
