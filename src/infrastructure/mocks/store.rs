//! Mock store that always fails.

use crate::application::ports::{AdmitOutcome, BucketStore, StoreError};
use crate::domain::policy::BucketPolicy;
use async_trait::async_trait;

/// A store whose every operation fails with [`StoreError`].
///
/// Used to test that gate callers see store outages as errors rather than
/// as allow/deny decisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

impl FailingStore {
    /// Create a new failing store.
    pub fn new() -> Self {
        Self
    }

    fn error() -> StoreError {
        StoreError::unavailable("mock store configured to fail")
    }
}

#[async_trait]
impl BucketStore for FailingStore {
    async fn admit(
        &self,
        _identity: &str,
        _policy: &BucketPolicy,
        _now_ms: u64,
    ) -> Result<AdmitOutcome, StoreError> {
        Err(Self::error())
    }

    async fn load_policy(&self) -> Result<BucketPolicy, StoreError> {
        Err(Self::error())
    }

    async fn store_policy(&self, _policy: &BucketPolicy) -> Result<(), StoreError> {
        Err(Self::error())
    }

    async fn reset(&self, _identity: &str) -> Result<(), StoreError> {
        Err(Self::error())
    }
}
