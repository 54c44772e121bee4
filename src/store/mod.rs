/// Key/Value Store
///
/// Narrow TTL-bound key/value port over the external store. The refresh
/// token adapter and email verification codes are built on top of it.

mod memory;
mod redis_store;

pub use self::memory::InMemoryStore;
pub use self::redis_store::RedisStore;

use crate::error::StoreError;

#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Unconditionally write `value` under `key`, replacing any previous
    /// value and resetting its TTL
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// Current value, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove `key`; removing an absent key is not an error
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
