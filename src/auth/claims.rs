/// JWT Claims structure
///
/// Payload shared by access and refresh tokens. The two only differ in
/// lifetime; refresh tokens are additionally checked against the refresh
/// token store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (principal identifier, the account email)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token id, random per issuance
    pub jti: String,
}

impl Claims {
    /// Create claims for `subject` that expire `ttl_seconds` from now
    pub fn new(subject: &str, ttl_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: subject.to_string(),
            iat: now,
            exp: now + ttl_seconds,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// A token is expired once the clock reaches `exp`
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp <= now
    }
}
