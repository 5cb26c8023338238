//! Redis-backed cache for sharing evaluations across processes.

use super::CacheBackend;
use crate::{Error, Result};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::time::Duration;

/// Namespace prepended to every key written by [`RedisCache`].
pub const DEFAULT_NAMESPACE: &str = "flag-engine:";

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 500;

/// Cache stored in Redis. Values are JSON-encoded and expiry is handled by
/// the server, so [`CacheBackend::clear_expired`] has nothing to do.
///
/// `clear` and `len` walk the namespace with `SCAN`, so they never block the
/// server but may observe keys written concurrently.
pub struct RedisCache<V> {
    conn: ConnectionManager,
    namespace: String,
    _marker: PhantomData<fn() -> V>,
}

impl<V> RedisCache<V> {
    /// Connect to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!(url, "connected to redis cache");
        Ok(Self {
            conn,
            namespace: DEFAULT_NAMESPACE.to_string(),
            _marker: PhantomData,
        })
    }

    /// Use a different key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// The key namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Walk every key in the namespace, one `SCAN` page at a time.
    async fn scan_namespace<F, Fut>(&self, mut on_page: F) -> Result<()>
    where
        F: FnMut(Vec<String>) -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        let pattern = match_pattern(&self.namespace);
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                on_page(keys).await?;
            }
            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }
}

/// Key under which `key` is stored in `namespace`.
fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{}{}", namespace, key)
}

/// `SCAN MATCH` pattern selecting exactly the keys of `namespace`.
fn match_pattern(namespace: &str) -> String {
    let mut pattern = String::with_capacity(namespace.len() + 1);
    for c in namespace.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

fn encode<V: Serialize>(value: &V) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode<V: DeserializeOwned>(raw: &str, key: &str) -> Result<V> {
    serde_json::from_str(raw)
        .map_err(|e| Error::cache_key(format!("corrupt cache entry: {}", e), key))
}

/// `EX` seconds for a TTL. Redis rejects zero.
fn expire_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl<V> CacheBackend<V> for RedisCache<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(namespaced_key(&self.namespace, key))
            .query_async(&mut conn)
            .await?;

        raw.map(|raw| decode(&raw, key)).transpose()
    }

    async fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(namespaced_key(&self.namespace, key))
            .arg(encode(&value)?);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(expire_secs(ttl));
        }

        let mut conn = self.conn.clone();
        cmd.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(namespaced_key(&self.namespace, key))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn clear_expired(&self) -> Result<()> {
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut removed = 0usize;
        self.scan_namespace(|keys| {
            removed += keys.len();
            let mut conn = self.conn.clone();
            async move {
                redis::cmd("DEL")
                    .arg(&keys)
                    .query_async::<_, ()>(&mut conn)
                    .await?;
                Ok(())
            }
        })
        .await?;

        tracing::debug!(removed, namespace = %self.namespace, "redis cache cleared");
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        // SCAN may return a key more than once.
        let mut seen = HashSet::new();
        self.scan_namespace(|keys| {
            seen.extend(keys);
            async { Ok(()) }
        })
        .await?;
        Ok(seen.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_key() {
        let key = crate::cache::derive_key("f", Some("u"), &[], &[]);
        assert_eq!(
            namespaced_key(DEFAULT_NAMESPACE, &key),
            format!("flag-engine:{}", key)
        );
        assert_eq!(namespaced_key("tenant-a:", "flag:1"), "tenant-a:flag:1");
    }

    #[test]
    fn test_match_pattern_escapes_glob_characters() {
        assert_eq!(match_pattern(DEFAULT_NAMESPACE), "flag-engine:*");
        assert_eq!(match_pattern("a*b?[c]\\:"), "a\\*b\\?\\[c\\]\\\\:*");
    }

    #[test]
    fn test_value_encoding() {
        assert_eq!(encode(&true).unwrap(), "true");
        assert!(!decode::<bool>("false", "flag:1").unwrap());
    }

    #[test]
    fn test_corrupt_value_is_cache_error() {
        match decode::<bool>("not-json", "flag:1") {
            Err(Error::Cache { key, .. }) => assert_eq!(key.as_deref(), Some("flag:1")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_expire_secs_never_zero() {
        assert_eq!(expire_secs(Duration::from_millis(50)), 1);
        assert_eq!(expire_secs(Duration::from_secs(300)), 300);
    }
}
