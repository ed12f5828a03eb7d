//! # tollgate
//!
//! Distributed token-bucket admission control backed by a shared counter
//! store.
//!
//! `tollgate` decides, per caller identity, whether an incoming request may
//! proceed. Each identity gets a bucket of admission tokens: one token is
//! consumed per allowed request, tokens flow back at a configurable rate,
//! and the bucket's size bounds the burst a caller can ever land. Bucket
//! state lives in a shared store, so the decision is consistent no matter
//! how many processes are checking concurrently.
//!
//! ## Quick Start
//!
//! ```rust
//! use tollgate::{AdmissionGate, BucketPolicy, MemoryStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gate = AdmissionGate::new(MemoryStore::new());
//!
//! // 10-request burst, 2 requests/second sustained
//! gate.set_policy(BucketPolicy::new(10, 2.0)?).await?;
//!
//! let decision = gate.admit("203.0.113.7").await?;
//! if decision.allowed {
//!     // handle the request; surface decision.tokens_remaining_floor()
//!     // and decision.capacity as rate-limit response metadata
//! } else {
//!     // reject with a hint: retry after decision.retry_after_secs
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Choosing a store
//!
//! - [`MemoryStore`] keeps buckets in-process. Correct only while exactly
//!   one gate instance fronts the traffic; ideal for tests and single-node
//!   deployments.
//! - `RedisStore` (feature `redis-store`) keeps buckets in Redis and runs
//!   the whole refill/consume step as one server-side script, so any number
//!   of instances share exact limits:
//!
//! ```rust,ignore
//! use tollgate::{AdmissionGate, RedisStore};
//!
//! let store = RedisStore::connect("redis://127.0.0.1/").await?;
//! let gate = AdmissionGate::new(store);
//! ```
//!
//! Either way the gate itself is stateless between calls: buckets are
//! created lazily on first sight of an identity, mutated only by admission
//! checks, and dropped by the store after an idle TTL (24 hours by
//! default). An identity recreated after expiry is indistinguishable from a
//! brand-new one.
//!
//! ## Semantics worth knowing
//!
//! - **Refill is lazy.** There is no timer per identity; elapsed wall-clock
//!   time is converted to tokens at the moment of a check.
//! - **Denials advance the refill clock.** A flood of rejected requests
//!   cannot inflate the apparent elapsed time of the next check.
//! - **Policy changes clamp, not reset.** Shrinking capacity clamps
//!   existing buckets to the new cap on their next check; accumulated
//!   tokens below the cap are untouched.
//! - **Store outages are errors.** An unreachable store surfaces as
//!   [`AdmitError::Store`], never as a silent allow or deny; the calling
//!   layer picks its own fail-open or fail-closed stance.
//! - **Misconfiguration fails open.** A missing or invalid stored policy
//!   degrades to the defaults (10 tokens, 2/second) per field.
//!
//! ## Observability
//!
//! ```rust
//! # use tollgate::{AdmissionGate, MemoryStore};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! # let gate = AdmissionGate::new(MemoryStore::new());
//! # let _ = gate.admit("a").await;
//! let snapshot = gate.metrics().snapshot();
//! println!("admitted: {}", snapshot.admitted);
//! println!("denied:   {}", snapshot.denied);
//! println!("denial rate: {:.2}%", snapshot.denial_rate() * 100.0);
//! # }
//! ```
//!
//! The gate also emits `tracing` events: `trace!` per check, `debug!` on
//! denials and policy updates, `warn!` on store faults.
//!
//! ## Feature flags
//!
//! - `redis-store`: the Redis adapter ([`RedisStore`], `RedisStoreConfig`).
//! - `test-helpers`: controllable mocks (`MockClock`, `FailingStore`) for
//!   integration tests.
//!
//! [`RedisStore`]: infrastructure/redis_store/struct.RedisStore.html
//! [`AdmitError::Store`]: AdmitError

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    bucket::TokenBucket,
    decision::Decision,
    policy::{BucketPolicy, PolicyError},
};

pub use application::{
    gate::{AdmissionGate, AdmitError},
    metrics::{Metrics, MetricsSnapshot},
    ports::{AdmitOutcome, BucketStore, Clock, StoreError, DEFAULT_IDLE_TTL},
};

pub use infrastructure::{clock::SystemClock, memory::MemoryStore};

#[cfg(feature = "redis-store")]
pub use infrastructure::redis_store::{RedisStore, RedisStoreConfig};
