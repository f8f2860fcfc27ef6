//! Bearer token authentication.
//!
//! Tokens are opaque strings handed out at login and kept only as SHA-256
//! hashes. Lookups go through the hash, and the final comparison is
//! constant-time so token validation never leaks timing information.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Prefix for issued tokens, handy for spotting them in logs and configs.
const TOKEN_PREFIX: &str = "amora_";

/// Authentication error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No token was supplied
    #[error("missing credentials")]
    MissingCredentials,

    /// Token is unknown or revoked
    #[error("invalid token")]
    InvalidToken,

    /// Internal store failure
    #[error("internal auth error: {0}")]
    Internal(String),
}

/// Result type alias for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Hash a token with SHA-256.
fn hash_token(token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Convert a hash to a hex string for map keys.
fn hash_to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Clone)]
struct TokenRecord {
    token_hash: [u8; 32],
    user_id: Uuid,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

/// In-memory session token store.
///
/// Tokens do not survive a restart; clients re-authenticate through the
/// login flow.
#[derive(Debug, Default)]
pub struct AuthStore {
    /// Keyed by hex-encoded token hash.
    tokens: RwLock<HashMap<String, TokenRecord>>,
}

impl AuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for a user. Multiple live tokens per user are
    /// allowed, one per logged-in device.
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let token = format!("{}{}", TOKEN_PREFIX, Uuid::new_v4().as_simple());
        let token_hash = hash_token(&token);
        let record = TokenRecord {
            token_hash,
            user_id,
            created_at: Utc::now(),
        };

        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| AuthError::Internal("token store lock poisoned".to_string()))?;
        tokens.insert(hash_to_hex(&token_hash), record);

        debug!(%user_id, "issued session token");
        Ok(token)
    }

    /// Validate a token and return the owning user.
    pub fn validate(&self, token: &str) -> Result<Uuid> {
        if token.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let token_hash = hash_token(token);
        let tokens = self
            .tokens
            .read()
            .map_err(|_| AuthError::Internal("token store lock poisoned".to_string()))?;

        let record = tokens
            .get(&hash_to_hex(&token_hash))
            .ok_or(AuthError::InvalidToken)?;

        if record.token_hash.ct_eq(&token_hash).into() {
            Ok(record.user_id)
        } else {
            Err(AuthError::InvalidToken)
        }
    }

    /// Revoke a token. Revoking an unknown token is a no-op.
    pub fn revoke(&self, token: &str) -> Result<()> {
        let token_hash = hash_token(token);
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| AuthError::Internal("token store lock poisoned".to_string()))?;
        tokens.remove(&hash_to_hex(&token_hash));
        Ok(())
    }
}
