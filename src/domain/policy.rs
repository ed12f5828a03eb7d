//! Bucket policies for admission control.
//!
//! A policy describes how generous a bucket is: how many tokens it can hold
//! (burst allowance) and how quickly tokens come back (sustained rate).
//! The policy is shared across all identities and may be changed at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned when a policy is constructed from invalid values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// Capacity must be at least one token.
    #[error("capacity must be a positive integer, got {0}")]
    InvalidCapacity(u32),
    /// Refill rate must be a positive, finite number of tokens per second.
    #[error("refill rate must be positive and finite, got {0}")]
    InvalidRefillRate(f64),
}

/// Configuration for a token bucket.
///
/// `capacity` is the maximum number of tokens a bucket can hold, and the
/// burst a fresh identity is granted. `refill_rate` is how many tokens are
/// restored per second, independent of request arrivals.
///
/// # Example
/// ```
/// use tollgate::BucketPolicy;
///
/// // 10-request burst, 2 requests/second sustained
/// let policy = BucketPolicy::new(10, 2.0).unwrap();
/// assert_eq!(policy.capacity, 10);
///
/// // Invalid values are rejected
/// assert!(BucketPolicy::new(0, 2.0).is_err());
/// assert!(BucketPolicy::new(10, -1.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketPolicy {
    /// Maximum tokens a bucket can hold.
    pub capacity: u32,
    /// Tokens restored per second.
    pub refill_rate: f64,
}

impl BucketPolicy {
    /// Capacity applied when no policy has been stored.
    pub const DEFAULT_CAPACITY: u32 = 10;
    /// Refill rate applied when no policy has been stored.
    pub const DEFAULT_REFILL_RATE: f64 = 2.0;

    /// Create a validated policy.
    ///
    /// # Errors
    /// Returns `PolicyError` if `capacity` is zero or `refill_rate` is not a
    /// positive finite number.
    pub fn new(capacity: u32, refill_rate: f64) -> Result<Self, PolicyError> {
        if capacity == 0 {
            return Err(PolicyError::InvalidCapacity(capacity));
        }
        if !refill_rate.is_finite() || refill_rate <= 0.0 {
            return Err(PolicyError::InvalidRefillRate(refill_rate));
        }
        Ok(Self {
            capacity,
            refill_rate,
        })
    }

    /// Reconstruct a policy from fields read out of the shared store.
    ///
    /// Each field that is missing or invalid falls back to its default
    /// independently, so a half-written or garbled policy record degrades
    /// to known-good values instead of closing the gate.
    pub fn from_stored(capacity: Option<f64>, refill_rate: Option<f64>) -> Self {
        let capacity = capacity
            .filter(|c| c.is_finite() && *c >= 1.0)
            .map(|c| c as u32)
            .unwrap_or(Self::DEFAULT_CAPACITY);
        let refill_rate = refill_rate
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(Self::DEFAULT_REFILL_RATE);
        Self {
            capacity,
            refill_rate,
        }
    }

    /// Whether both fields hold values `new` would accept.
    pub fn is_valid(&self) -> bool {
        self.capacity > 0 && self.refill_rate.is_finite() && self.refill_rate > 0.0
    }

    /// Return a copy with any invalid field replaced by its default.
    pub fn sanitized(self) -> Self {
        Self::from_stored(Some(self.capacity as f64), Some(self.refill_rate))
    }
}

impl Default for BucketPolicy {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            refill_rate: Self::DEFAULT_REFILL_RATE,
        }
    }
}

impl fmt::Display for BucketPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tokens @ {}/s", self.capacity, self.refill_rate)
    }
}
