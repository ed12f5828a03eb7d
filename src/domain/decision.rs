//! Admission decisions.

use crate::domain::policy::BucketPolicy;
use serde::{Deserialize, Serialize};

/// The outcome of an admission check, with the diagnostic counters a
/// transport layer typically maps to response metadata (limit, remaining,
/// retry-after).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Tokens left in the bucket after this check (post-consume on allow).
    pub tokens_remaining: f64,
    /// Bucket capacity under the policy this check was evaluated against.
    pub capacity: u32,
    /// Refill rate under the policy this check was evaluated against.
    pub refill_rate: f64,
    /// Seconds until a retry can succeed: 0 when allowed, at least 1 when
    /// denied.
    pub retry_after_secs: u64,
}

impl Decision {
    /// Build a decision from the post-check bucket token count.
    pub(crate) fn new(allowed: bool, tokens: f64, policy: &BucketPolicy, retry_after_secs: u64) -> Self {
        Self {
            allowed,
            tokens_remaining: tokens,
            capacity: policy.capacity,
            refill_rate: policy.refill_rate,
            retry_after_secs,
        }
    }

    /// Whole tokens remaining, the form usually surfaced to clients.
    pub fn tokens_remaining_floor(&self) -> u64 {
        self.tokens_remaining.max(0.0).floor() as u64
    }
}
