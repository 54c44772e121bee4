use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::KeyValueStore;
use crate::configuration::RedisSettings;
use crate::error::StoreError;

pub struct RedisStore {
    conn: ConnectionManager,
    prefix: Option<String>,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, prefix: Option<String>) -> Self {
        RedisStore { conn, prefix }
    }

    /// Open a managed connection that reconnects on its own
    pub async fn connect(settings: &RedisSettings) -> Result<Self, StoreError> {
        let client = redis::Client::open(settings.url.as_str())?;
        let conn = client.get_connection_manager().await?;
        Ok(Self::new(conn, settings.key_prefix.clone()))
    }

    fn key(&self, key: &str) -> String {
        namespaced_key(self.prefix.as_deref(), key)
    }
}

/// `<prefix>:<key>` when a prefix is configured, `key` unchanged otherwise
fn namespaced_key(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, key),
        _ => key.to_string(),
    }
}

/// SETEX rejects a zero expiry; such a value is already dead and is
/// deleted instead
fn expiry(ttl_secs: u64) -> Option<u64> {
    (ttl_secs > 0).then_some(ttl_secs)
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();

        match expiry(ttl_secs) {
            Some(ttl) => {
                let _: () = conn.set_ex(&key, value, ttl).await?;
            }
            None => {
                let _: () = conn.del(&key).await?;
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(&key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let _: () = conn.del(&key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_without_prefix_is_unchanged() {
        assert_eq!(namespaced_key(None, "refresh_token:user@x.com"), "refresh_token:user@x.com");
        assert_eq!(namespaced_key(Some(""), "refresh_token:user@x.com"), "refresh_token:user@x.com");
    }

    #[test]
    fn test_prefix_namespaces_every_key() {
        assert_eq!(
            namespaced_key(Some("sentence"), "refresh_token:user@x.com"),
            "sentence:refresh_token:user@x.com"
        );
        assert_eq!(
            namespaced_key(Some("sentence"), "email_code:signup:user@x.com"),
            "sentence:email_code:signup:user@x.com"
        );
    }

    #[test]
    fn test_zero_ttl_deletes_instead_of_setting() {
        assert_eq!(expiry(0), None);
        assert_eq!(expiry(1), Some(1));
        assert_eq!(expiry(604800), Some(604800));
    }
}
