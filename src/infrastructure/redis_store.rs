//! Redis-backed store implementation.
//!
//! Provides the shared counter store, allowing admission state to be
//! consistent across any number of gate processes.
//!
//! ## Architecture
//!
//! - Bucket records: one hash per identity (`<prefix>bucket:<identity>`)
//!   with two numeric fields, `tokens` and `last_refill`.
//! - Policy record: one singleton hash (`<prefix>policy`) with `capacity`
//!   and `refill_rate` fields.
//! - TTL: every bucket write refreshes a per-key idle expiry.
//!
//! ## Atomicity
//!
//! The whole admission step (load, refill, decide, persist, refresh TTL)
//! runs as one Lua script, so Redis serializes concurrent calls for the
//! same identity. Splitting it into separate GET/compute/SET round trips
//! from the caller's process would reintroduce the check-then-act race
//! where a burst admits more than `capacity` requests.
//!
//! ## Degraded input
//!
//! A bucket hash with missing or non-numeric fields is reinitialized as if
//! absent. A policy hash with bad fields degrades to defaults per field.
//! Connection-level failures surface as [`StoreError`]; the store never
//! converts them into an allow or deny.

use crate::application::ports::{
    AdmitOutcome, BucketStore, StoreError, DEFAULT_IDLE_TTL,
};
use crate::domain::policy::BucketPolicy;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError, Script};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The admission step, executed server-side.
///
/// KEYS[1] = bucket key; ARGV = capacity, refill rate, now (ms), ttl (ms).
/// Returns `{allowed, tostring(tokens)}`; the token count travels back as a
/// string because Redis truncates Lua numbers to integers in replies.
const ADMIT_SCRIPT: &str = r#"
local capacity = tonumber(ARGV[1])
local refill_rate = tonumber(ARGV[2])
local now = tonumber(ARGV[3])
local ttl_ms = tonumber(ARGV[4])

local state = redis.call('HMGET', KEYS[1], 'tokens', 'last_refill')
local tokens = tonumber(state[1])
local last_refill = tonumber(state[2])
if tokens == nil or last_refill == nil then
    tokens = capacity
    last_refill = now
end

local elapsed = now - last_refill
if elapsed < 0 then
    elapsed = 0
end
tokens = tokens + (elapsed / 1000.0) * refill_rate
if tokens > capacity then
    tokens = capacity
end

local allowed = 0
if tokens >= 1 then
    tokens = tokens - 1
    allowed = 1
end

redis.call('HSET', KEYS[1], 'tokens', tokens, 'last_refill', now)
redis.call('PEXPIRE', KEYS[1], ttl_ms)
return {allowed, tostring(tokens)}
"#;

/// Configuration for the Redis store.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Idle TTL for bucket records (default: 24 hours)
    pub ttl: Duration,
    /// Key prefix for all records (default: "tollgate:")
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_IDLE_TTL,
            key_prefix: "tollgate:".to_string(),
        }
    }
}

/// Redis-backed shared store for distributed admission control.
///
/// Multiple gate instances pointed at the same Redis and prefix share one
/// set of buckets and one policy record.
pub struct RedisStore {
    connection: ConnectionManager,
    script: Arc<Script>,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Clone for RedisStore {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            script: Arc::clone(&self.script),
            config: self.config.clone(),
        }
    }
}

impl RedisStore {
    /// Connect with default configuration.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., "redis://127.0.0.1/")
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, RedisError> {
        Self::connect_with_config(url, RedisStoreConfig::default()).await
    }

    /// Connect with custom configuration.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub async fn connect_with_config(
        url: &str,
        config: RedisStoreConfig,
    ) -> Result<Self, RedisError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            connection,
            script: Arc::new(Script::new(ADMIT_SCRIPT)),
            config,
        })
    }

    fn bucket_key(&self, identity: &str) -> String {
        format!("{}bucket:{}", self.config.key_prefix, identity)
    }

    fn policy_key(&self) -> String {
        format!("{}policy", self.config.key_prefix)
    }

    /// Delete every record under this store's prefix.
    ///
    /// Scans the keyspace, so this is for tests and operational cleanup,
    /// not the hot path.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let pattern = format!("{}*", self.config.key_prefix);
        let mut conn = self.connection.clone();

        let mut cursor = 0u64;
        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let _: () = conn.del(&keys).await?;
            }

            if new_cursor == 0 {
                break;
            }
            cursor = new_cursor;
        }
        Ok(())
    }
}

impl From<RedisError> for StoreError {
    fn from(e: RedisError) -> Self {
        StoreError::unavailable(e.to_string())
    }
}

#[async_trait]
impl BucketStore for RedisStore {
    async fn admit(
        &self,
        identity: &str,
        policy: &BucketPolicy,
        now_ms: u64,
    ) -> Result<AdmitOutcome, StoreError> {
        let key = self.bucket_key(identity);
        let ttl_ms = self.config.ttl.as_millis() as u64;
        let mut conn = self.connection.clone();

        let (allowed, tokens): (i64, String) = self
            .script
            .key(&key)
            .arg(policy.capacity)
            .arg(policy.refill_rate)
            .arg(now_ms)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await?;

        let tokens: f64 = tokens
            .parse()
            .map_err(|_| StoreError::unavailable(format!("unexpected script reply: {tokens:?}")))?;

        Ok(AdmitOutcome {
            allowed: allowed == 1,
            tokens,
        })
    }

    async fn load_policy(&self) -> Result<BucketPolicy, StoreError> {
        let mut conn = self.connection.clone();

        let (capacity, refill_rate): (Option<String>, Option<String>) = conn
            .hget(self.policy_key(), &["capacity", "refill_rate"][..])
            .await?;

        Ok(BucketPolicy::from_stored(
            capacity.and_then(|s| s.parse().ok()),
            refill_rate.and_then(|s| s.parse().ok()),
        ))
    }

    async fn store_policy(&self, policy: &BucketPolicy) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();

        let _: () = conn
            .hset_multiple(
                self.policy_key(),
                &[
                    ("capacity", policy.capacity.to_string()),
                    ("refill_rate", policy.refill_rate.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn reset(&self, identity: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(self.bucket_key(identity)).await?;
        Ok(())
    }
}
