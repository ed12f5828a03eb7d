//! The admission gate.
//!
//! The gate is the engine callers talk to: it validates the identity, reads
//! the shared policy, delegates the atomic refill/consume step to the store,
//! and assembles the decision. It holds no bucket state of its own, so any
//! number of gate instances (in any number of processes) can front the same
//! store without coordination.

use crate::application::metrics::Metrics;
use crate::application::ports::{BucketStore, Clock, StoreError};
use crate::domain::bucket::TokenBucket;
use crate::domain::decision::Decision;
use crate::domain::policy::BucketPolicy;
use crate::infrastructure::clock::SystemClock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Error returned by admission operations.
#[derive(Debug, Error)]
pub enum AdmitError {
    /// The caller supplied an empty identity. Failed fast, before any store
    /// access.
    #[error("identity must be a non-empty string")]
    InvalidIdentity,

    /// The shared store could not complete the operation. Surfaced rather
    /// than mapped to allow or deny: either silent default would hide a real
    /// outage, so the caller decides whether to fail open or closed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Token-bucket admission engine over a shared counter store.
///
/// # Example
/// ```
/// use tollgate::{AdmissionGate, BucketPolicy, MemoryStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let gate = AdmissionGate::new(MemoryStore::new());
/// gate.set_policy(BucketPolicy::new(10, 2.0)?).await?;
///
/// let decision = gate.admit("203.0.113.7").await?;
/// assert!(decision.allowed);
/// assert_eq!(decision.tokens_remaining_floor(), 9);
/// # Ok(())
/// # }
/// ```
pub struct AdmissionGate<S>
where
    S: BucketStore,
{
    store: S,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl<S> AdmissionGate<S>
where
    S: BucketStore,
{
    /// Create a gate over `store` using the system clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock::new()))
    }

    /// Create a gate with an explicit clock (used by tests to control time).
    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            metrics: Metrics::new(),
        }
    }

    /// Check whether a request from `identity` may proceed, evaluated under
    /// the currently stored policy.
    ///
    /// Reads the shared policy first (defaults apply when none is stored or
    /// the record is invalid), then runs one atomic refill/consume step.
    ///
    /// # Errors
    /// [`AdmitError::InvalidIdentity`] for an empty identity;
    /// [`AdmitError::Store`] when the shared store is unreachable.
    pub async fn admit(&self, identity: &str) -> Result<Decision, AdmitError> {
        if identity.is_empty() {
            return Err(AdmitError::InvalidIdentity);
        }
        let policy = self.policy().await?;
        self.admit_with(identity, &policy).await
    }

    /// Check admission under a policy the caller already holds, skipping the
    /// policy read.
    ///
    /// A policy updated concurrently by `set_policy` may let at most this one
    /// request be evaluated against the stale values, which is acceptable for
    /// infrequent administrative changes.
    pub async fn admit_with(
        &self,
        identity: &str,
        policy: &BucketPolicy,
    ) -> Result<Decision, AdmitError> {
        if identity.is_empty() {
            return Err(AdmitError::InvalidIdentity);
        }
        let policy = policy.sanitized();
        let now_ms = self.clock.now_millis();

        trace!(identity, %policy, "checking admission");

        let outcome = match self.store.admit(identity, &policy, now_ms).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics.record_store_failure();
                warn!(identity, error = %e, "admission check failed on the counter store");
                return Err(e.into());
            }
        };

        let retry_after_secs = if outcome.allowed {
            self.metrics.record_admitted();
            0
        } else {
            self.metrics.record_denied();
            let bucket = TokenBucket {
                tokens: outcome.tokens,
                last_refill_ms: now_ms,
            };
            let retry = bucket.secs_until_next_token(policy.refill_rate);
            debug!(
                identity,
                tokens = outcome.tokens,
                retry_after_secs = retry,
                "request denied"
            );
            retry
        };

        Ok(Decision::new(
            outcome.allowed,
            outcome.tokens,
            &policy,
            retry_after_secs,
        ))
    }

    /// Read the shared policy. Returns defaults when none has been stored.
    pub async fn policy(&self) -> Result<BucketPolicy, AdmitError> {
        let policy = self.store.load_policy().await.map_err(|e| {
            self.metrics.record_store_failure();
            e
        })?;
        Ok(policy.sanitized())
    }

    /// Replace the shared policy. Invalid fields are replaced by defaults so
    /// a bad update degrades the gate to known-good values instead of
    /// closing it.
    pub async fn set_policy(&self, policy: BucketPolicy) -> Result<(), AdmitError> {
        let sanitized = policy.sanitized();
        if sanitized != policy {
            warn!(requested = %policy, applied = %sanitized, "policy had invalid fields, defaults substituted");
        }
        self.store.store_policy(&sanitized).await?;
        debug!(policy = %sanitized, "policy updated");
        Ok(())
    }

    /// Forget `identity`'s bucket. Its next request is treated as a
    /// first-time caller with a full bucket.
    pub async fn reset(&self, identity: &str) -> Result<(), AdmitError> {
        if identity.is_empty() {
            return Err(AdmitError::InvalidIdentity);
        }
        self.store.reset(identity).await?;
        debug!(identity, "bucket reset");
        Ok(())
    }

    /// Counters describing gate activity since construction.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
