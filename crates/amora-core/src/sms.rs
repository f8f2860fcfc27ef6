//! Phone verification codes.
//!
//! Codes are held in memory with a short TTL. Delivery is a stub that logs
//! the code; a real SMS gateway would hook in at [`CodeStore::issue`].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

/// How long an issued code stays valid.
const DEFAULT_CODE_TTL_MINUTES: i64 = 5;

/// Verification error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeError {
    /// No code was issued for this phone
    #[error("no verification code issued")]
    NotFound,

    /// Code exists but its TTL has passed
    #[error("verification code expired")]
    Expired,

    /// Submitted code does not match
    #[error("verification code mismatch")]
    Mismatch,
}

/// Check the phone number shape accepted at registration: 11 digits.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 11 && phone.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    created_at: DateTime<Utc>,
}

/// In-memory verification code store.
///
/// One pending code per phone number; issuing again replaces the old code.
#[derive(Debug)]
pub struct CodeStore {
    codes: RwLock<HashMap<String, PendingCode>>,
    ttl: Duration,
}

impl Default for CodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(DEFAULT_CODE_TTL_MINUTES))
    }

    /// Create a store with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            codes: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Issue a six-digit code for a phone number, replacing any pending one.
    pub async fn issue(&self, phone: &str) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        let pending = PendingCode {
            code: code.clone(),
            created_at: Utc::now(),
        };

        let mut codes = self.codes.write().await;
        codes.insert(phone.to_string(), pending);

        // Stub delivery: surface the code in the log.
        info!(%phone, %code, "verification code issued");
        code
    }

    /// Verify a submitted code. A correct code is consumed; a mismatch leaves
    /// the pending code in place for another attempt.
    pub async fn verify(&self, phone: &str, code: &str) -> Result<(), CodeError> {
        let mut codes = self.codes.write().await;
        let pending = codes.get(phone).ok_or(CodeError::NotFound)?;

        if Utc::now() - pending.created_at > self.ttl {
            codes.remove(phone);
            return Err(CodeError::Expired);
        }

        if pending.code != code {
            return Err(CodeError::Mismatch);
        }

        codes.remove(phone);
        Ok(())
    }

    /// Drop expired codes. Called periodically by the server.
    pub async fn cleanup(&self) {
        let now = Utc::now();
        let mut codes = self.codes.write().await;
        codes.retain(|_, pending| now - pending.created_at <= self.ttl);
    }
}
