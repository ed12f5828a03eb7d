//! In-process store implementation.
//!
//! Keeps buckets in a concurrent sharded map. The map's per-key entry guard
//! makes each admission step atomic for its identity, which satisfies the
//! store contract as long as exactly one process fronts the traffic. Beyond
//! one process this store cannot coordinate anything; deployments with
//! multiple gate instances need the shared Redis store instead.
//!
//! Idle buckets expire lazily: an expired record is reinitialized on its
//! next admission, and [`MemoryStore::purge_expired`] sweeps the rest out
//! on demand.

use crate::application::ports::{
    AdmitOutcome, BucketStore, StoreError, DEFAULT_IDLE_TTL,
};
use crate::domain::bucket::TokenBucket;
use crate::domain::policy::BucketPolicy;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// A bucket record plus its expiry deadline.
#[derive(Debug, Clone, Copy)]
struct BucketRecord {
    bucket: TokenBucket,
    expires_at_ms: u64,
}

impl BucketRecord {
    fn fresh(policy: &BucketPolicy, now_ms: u64, ttl_ms: u64) -> Self {
        Self {
            bucket: TokenBucket::full(policy, now_ms),
            expires_at_ms: now_ms.saturating_add(ttl_ms),
        }
    }

    fn expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// In-process bucket store backed by DashMap.
///
/// Suitable for tests and for deployments that run exactly one gate
/// instance. All operations are infallible in practice; the fallible
/// signatures come from the store port.
#[derive(Debug)]
pub struct MemoryStore {
    buckets: DashMap<String, BucketRecord>,
    policy: RwLock<Option<BucketPolicy>>,
    ttl: Duration,
}

impl MemoryStore {
    /// Create a store with the default 24-hour idle TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_IDLE_TTL)
    }

    /// Create a store with a custom idle TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            policy: RwLock::new(None),
            ttl,
        }
    }

    /// Number of live bucket records, including ones past their TTL that
    /// have not been swept yet.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no bucket records exist.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop every record whose idle TTL has passed as of `now_ms`.
    ///
    /// Expiry is advisory cleanup; skipping this entirely only costs memory,
    /// never correctness, because `admit` reinitializes expired records it
    /// encounters.
    pub fn purge_expired(&self, now_ms: u64) {
        self.buckets.retain(|_, record| !record.expired(now_ms));
    }

    /// Drop all bucket records and the stored policy.
    pub fn clear(&self) {
        self.buckets.clear();
        if let Ok(mut policy) = self.policy.try_write() {
            *policy = None;
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BucketStore for MemoryStore {
    async fn admit(
        &self,
        identity: &str,
        policy: &BucketPolicy,
        now_ms: u64,
    ) -> Result<AdmitOutcome, StoreError> {
        let ttl_ms = self.ttl.as_millis() as u64;

        // The entry guard holds the shard lock for this key, so the whole
        // load-refill-decide-persist sequence is atomic per identity.
        let mut entry = self
            .buckets
            .entry(identity.to_owned())
            .or_insert_with(|| BucketRecord::fresh(policy, now_ms, ttl_ms));
        let record = entry.value_mut();

        if record.expired(now_ms) {
            *record = BucketRecord::fresh(policy, now_ms, ttl_ms);
        }

        let allowed = record.bucket.refill_and_consume(policy, now_ms);
        record.expires_at_ms = now_ms.saturating_add(ttl_ms);

        Ok(AdmitOutcome {
            allowed,
            tokens: record.bucket.tokens,
        })
    }

    async fn load_policy(&self) -> Result<BucketPolicy, StoreError> {
        Ok(self.policy.read().await.unwrap_or_default())
    }

    async fn store_policy(&self, policy: &BucketPolicy) -> Result<(), StoreError> {
        *self.policy.write().await = Some(*policy);
        Ok(())
    }

    async fn reset(&self, identity: &str) -> Result<(), StoreError> {
        self.buckets.remove(identity);
        Ok(())
    }
}
