//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the
//! application layer needs. Infrastructure adapters implement these ports.

use crate::domain::policy::BucketPolicy;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// How long an untouched bucket record survives before the store may drop it.
///
/// Expiry is advisory cleanup to bound storage growth, not a correctness
/// requirement: a bucket recreated after expiry behaves exactly like a
/// brand-new identity.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A shared-store operation failed.
///
/// This is a transient infrastructure fault, deliberately distinguishable
/// from an ordinary denial so the caller can choose a fail-open or
/// fail-closed policy instead of the gate silently picking one.
#[derive(Debug, Clone, Error)]
#[error("counter store unavailable: {reason}")]
pub struct StoreError {
    reason: String,
}

impl StoreError {
    /// Wrap a backend failure description.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Result of one atomic refill-and-consume step, as reported by a store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmitOutcome {
    /// Whether a token was consumed.
    pub allowed: bool,
    /// Tokens left in the bucket after the step.
    pub tokens: f64,
}

/// Port for obtaining current wall-clock time.
///
/// Bucket timestamps are persisted in a store shared across processes, so
/// this is calendar time in milliseconds since the Unix epoch rather than a
/// process-local monotonic reading. Infrastructure provides `SystemClock`
/// for production and `MockClock` for tests.
pub trait Clock: Send + Sync + Debug {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Port for the shared counter store.
///
/// The store is the sole source of truth for bucket state; the engine keeps
/// nothing between calls. The one non-negotiable contract is `admit`:
/// the whole load-refill-decide-persist-expire sequence must execute as a
/// single atomic unit per identity, so that two concurrent calls can never
/// both consume from the same pre-refill snapshot. Distinct identities are
/// independent and require no cross-key ordering.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Atomically run one admission step for `identity` under `policy` at
    /// time `now_ms`, persisting the updated bucket and refreshing its idle
    /// TTL.
    ///
    /// An absent (or expired) bucket is initialized full before the step.
    async fn admit(
        &self,
        identity: &str,
        policy: &BucketPolicy,
        now_ms: u64,
    ) -> Result<AdmitOutcome, StoreError>;

    /// Read the shared policy record, substituting defaults for missing or
    /// invalid fields. Returns the default policy when none was ever stored.
    async fn load_policy(&self) -> Result<BucketPolicy, StoreError>;

    /// Replace the shared policy record. Last writer wins; no atomicity with
    /// in-flight `admit` calls is promised or needed.
    async fn store_policy(&self, policy: &BucketPolicy) -> Result<(), StoreError>;

    /// Drop the bucket record for `identity`, if any. The next admission
    /// sees a brand-new identity.
    async fn reset(&self, identity: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> BucketStore for Arc<S>
where
    S: BucketStore + ?Sized,
{
    async fn admit(
        &self,
        identity: &str,
        policy: &BucketPolicy,
        now_ms: u64,
    ) -> Result<AdmitOutcome, StoreError> {
        (**self).admit(identity, policy, now_ms).await
    }

    async fn load_policy(&self) -> Result<BucketPolicy, StoreError> {
        (**self).load_policy().await
    }

    async fn store_policy(&self, policy: &BucketPolicy) -> Result<(), StoreError> {
        (**self).store_policy(policy).await
    }

    async fn reset(&self, identity: &str) -> Result<(), StoreError> {
        (**self).reset(identity).await
    }
}
