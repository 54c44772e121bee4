/// Refresh Token Store
///
/// Keeps at most one live refresh token per principal under
/// `refresh_token:<identifier>`, with a TTL equal to the token lifetime.
/// Saving overwrites (rotates) the previous record, which is what makes an
/// otherwise self-describing token revocable.
///
/// Only the SHA-256 digest of the token is stored; matching a presented
/// token against its digest is equivalent to exact string comparison.

use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::error::StoreError;
use crate::store::KeyValueStore;

const KEY_PREFIX: &str = "refresh_token";

#[derive(Clone)]
pub struct RefreshTokenStore {
    store: Arc<dyn KeyValueStore>,
}

fn key(identifier: &str) -> String {
    format!("{}:{}", KEY_PREFIX, identifier)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl RefreshTokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Record `token` as the only valid refresh token for `identifier`
    ///
    /// # Errors
    /// Returns error if the store is unreachable
    pub async fn save(&self, identifier: &str, token: &str, ttl_seconds: i64) -> Result<(), StoreError> {
        let ttl = u64::try_from(ttl_seconds).unwrap_or(0);
        self.store.set_ex(&key(identifier), &hash_token(token), ttl).await?;

        tracing::debug!(user = %identifier, ttl_seconds = ttl, "Refresh token recorded");
        Ok(())
    }

    /// True iff a record exists for `identifier` and it was made from exactly `token`
    ///
    /// # Errors
    /// Store faults are returned, never reported as a match
    pub async fn is_valid(&self, identifier: &str, token: &str) -> Result<bool, StoreError> {
        let stored = self.store.get(&key(identifier)).await?;
        Ok(matches!(stored, Some(digest) if digest == hash_token(token)))
    }

    /// Remove the record for `identifier`; absent records are fine
    pub async fn delete(&self, identifier: &str) -> Result<(), StoreError> {
        self.store.delete(&key(identifier)).await?;

        tracing::debug!(user = %identifier, "Refresh token revoked");
        Ok(())
    }
}
