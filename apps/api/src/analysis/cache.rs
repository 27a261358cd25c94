//! Result cache keyed by a content hash of the request.
//!
//! Any backend error is reported as `CacheError`; the orchestrator treats it
//! as a miss and carries on without caching.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::models::request::{AnalysisDepth, AnalysisRequest, BusinessContext, ServiceTier, SubjectRecord};
use crate::models::result::AggregatedResult;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),

    #[error("cached value could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// SHA-256 hex digest of the canonical request content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

#[derive(Serialize)]
struct KeyMaterial<'a> {
    subject: &'a SubjectRecord,
    business_context: Option<&'a BusinessContext>,
    tier: ServiceTier,
    depth: AnalysisDepth,
}

impl CacheKey {
    /// Priority is not part of the key.
    pub fn for_request(request: &AnalysisRequest) -> Result<Self, serde_json::Error> {
        // Converting to a Value first sorts object keys (serde_json's Map is
        // BTreeMap-backed), so insertion order never changes the digest.
        let canonical = serde_json::to_value(KeyMaterial {
            subject: &request.subject,
            business_context: request.business_context.as_ref(),
            tier: request.tier,
            depth: request.depth,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<AggregatedResult>, CacheError>;

    async fn put(
        &self,
        key: &CacheKey,
        value: &AggregatedResult,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    async fn evict(&self, key: &CacheKey) -> Result<(), CacheError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct CacheEntry {
    value: AggregatedResult,
    expires_at: Instant,
}

/// Process-local cache. Expired entries are removed on the next `get`.
#[derive(Debug, Default)]
pub struct InMemoryResultCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl InMemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl ResultCache for InMemoryResultCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<AggregatedResult>, CacheError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if Instant::now() < entry.expires_at => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // re-check: another writer may have refreshed the entry in between
        if let Some(entry) = entries.get(key) {
            if Instant::now() < entry.expires_at {
                return Ok(Some(entry.value.clone()));
            }
            entries.remove(key);
            debug!(key = %key, "Evicted expired cache entry");
        }
        Ok(None)
    }

    async fn put(
        &self,
        key: &CacheKey,
        value: &AggregatedResult,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value: value.clone(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.clone(), entry);
        Ok(())
    }

    async fn evict(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis backend
// ────────────────────────────────────────────────────────────────────────────

const REDIS_KEY_PREFIX: &str = "analysis:result:";

/// Shared cache across service instances. Values are JSON with a Redis TTL.
///
/// Holds one multiplexed connection; each operation works on a cheap clone.
#[derive(Clone)]
pub struct RedisResultCache {
    conn: MultiplexedConnection,
}

impl RedisResultCache {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    pub async fn connect(client: &redis::Client) -> Result<Self, CacheError> {
        Ok(Self::new(client.get_multiplexed_async_connection().await?))
    }

    fn redis_key(key: &CacheKey) -> String {
        format!("{REDIS_KEY_PREFIX}{key}")
    }
}

#[async_trait]
impl ResultCache for RedisResultCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<AggregatedResult>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(Self::redis_key(key)).await?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(CacheError::from)
    }

    async fn put(
        &self,
        key: &CacheKey,
        value: &AggregatedResult,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(Self::redis_key(key), payload, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn evict(&self, key: &CacheKey) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(Self::redis_key(key)).await?;
        Ok(())
    }
}
