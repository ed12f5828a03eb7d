//! End-to-end admission scenarios over the in-process store.
//!
//! Time is driven by `MockClock` so every refill amount is exact and the
//! tests are fully deterministic.

use std::sync::Arc;
use std::time::Duration;
use tollgate::infrastructure::mocks::{FailingStore, MockClock};
use tollgate::{AdmissionGate, AdmitError, BucketPolicy, MemoryStore};

const T0: u64 = 1_700_000_000_000;

fn gate() -> (AdmissionGate<MemoryStore>, Arc<MockClock>) {
    let clock = Arc::new(MockClock::new(T0));
    let gate = AdmissionGate::with_clock(MemoryStore::new(), clock.clone());
    (gate, clock)
}

#[tokio::test]
async fn test_cold_start_always_admits() {
    let (gate, _clock) = gate();

    let decision = gate.admit("198.51.100.1").await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.tokens_remaining, 9.0);
    assert_eq!(decision.capacity, 10);
    assert_eq!(decision.retry_after_secs, 0);
}

#[tokio::test]
async fn test_burst_drains_then_denies() {
    // capacity=10, refill=2/s, 11 calls back-to-back: the first 10 are
    // admitted with descending counts, the 11th is denied with a retry hint.
    let (gate, _clock) = gate();
    gate.set_policy(BucketPolicy::new(10, 2.0).unwrap())
        .await
        .unwrap();

    for expected_remaining in (0..10).rev() {
        let decision = gate.admit("198.51.100.1").await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.tokens_remaining, expected_remaining as f64);
    }

    let denied = gate.admit("198.51.100.1").await.unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.tokens_remaining, 0.0);
    assert!(denied.retry_after_secs >= 1);
}

#[tokio::test]
async fn test_recovery_after_denial() {
    // After a drained bucket is denied, 3 seconds at 2 tokens/s refill 6
    // tokens; one is consumed by the successful retry.
    let (gate, clock) = gate();
    gate.set_policy(BucketPolicy::new(10, 2.0).unwrap())
        .await
        .unwrap();

    for _ in 0..10 {
        assert!(gate.admit("a").await.unwrap().allowed);
    }
    assert!(!gate.admit("a").await.unwrap().allowed);

    clock.advance(Duration::from_secs(3));
    let decision = gate.admit("a").await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.tokens_remaining, 5.0);
}

#[tokio::test]
async fn test_denial_advances_refill_clock() {
    // Two denials 250ms apart must each earn 250ms of refill, not let the
    // second one double-count the full 500ms since the last admission.
    let (gate, clock) = gate();
    gate.set_policy(BucketPolicy::new(10, 2.0).unwrap())
        .await
        .unwrap();

    for _ in 0..10 {
        assert!(gate.admit("a").await.unwrap().allowed);
    }

    clock.advance(Duration::from_millis(250));
    let denied = gate.admit("a").await.unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.tokens_remaining, 0.5);

    clock.advance(Duration::from_millis(250));
    let decision = gate.admit("a").await.unwrap();
    assert!(decision.allowed);
    // 0.5 carried + 0.5 earned - 1 consumed; a double-counted elapsed time
    // would have left 0.5 here
    assert_eq!(decision.tokens_remaining, 0.0);
}

#[tokio::test]
async fn test_policy_shrink_clamps_existing_buckets() {
    // An identity holding 8 tokens under capacity 10 is clamped to the new
    // capacity 5 on its next check, not reset outright.
    let (gate, _clock) = gate();
    gate.set_policy(BucketPolicy::new(10, 2.0).unwrap())
        .await
        .unwrap();

    assert_eq!(gate.admit("a").await.unwrap().tokens_remaining, 9.0);
    assert_eq!(gate.admit("a").await.unwrap().tokens_remaining, 8.0);

    gate.set_policy(BucketPolicy::new(5, 1.0).unwrap())
        .await
        .unwrap();

    let decision = gate.admit("a").await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.capacity, 5);
    // min(8, 5) = 5, minus the consumed token
    assert_eq!(decision.tokens_remaining, 4.0);
}

#[tokio::test]
async fn test_refill_bounded_throughput() {
    // Over any window with no policy change, admissions cannot exceed
    // floor(t0) + floor(rate * T) + 1.
    let (gate, clock) = gate();
    gate.set_policy(BucketPolicy::new(10, 2.0).unwrap())
        .await
        .unwrap();

    let mut admitted = 0;
    for _ in 0..=50 {
        let decision = gate.admit("a").await.unwrap();
        assert!(decision.tokens_remaining >= 0.0);
        assert!(decision.tokens_remaining <= 10.0);
        if decision.allowed {
            admitted += 1;
        }
        clock.advance(Duration::from_millis(100));
    }

    // t0 = 10 tokens, T = 5s at 2/s
    assert!(admitted <= 10 + 10 + 1, "admitted {admitted} in a 5s window");
    assert!(admitted >= 18, "throughput collapsed to {admitted}");
}

#[tokio::test]
async fn test_idle_bucket_expires_and_recreates() {
    let clock = Arc::new(MockClock::new(T0));
    let store = MemoryStore::with_ttl(Duration::from_secs(3600));
    let gate = AdmissionGate::with_clock(store, clock.clone());
    gate.set_policy(BucketPolicy::new(3, 0.001).unwrap())
        .await
        .unwrap();

    for _ in 0..3 {
        assert!(gate.admit("a").await.unwrap().allowed);
    }
    assert!(!gate.admit("a").await.unwrap().allowed);

    // Past the idle TTL the identity is indistinguishable from a new one
    clock.advance(Duration::from_secs(3601));
    let decision = gate.admit("a").await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.tokens_remaining, 2.0);
}

#[tokio::test]
async fn test_fractional_refill_rate() {
    let (gate, clock) = gate();
    gate.set_policy(BucketPolicy::new(1, 0.25).unwrap())
        .await
        .unwrap();

    assert!(gate.admit("a").await.unwrap().allowed);

    let denied = gate.admit("a").await.unwrap();
    assert!(!denied.allowed);
    // 1 missing token at 0.25/s
    assert_eq!(denied.retry_after_secs, 4);

    clock.advance(Duration::from_secs(2));
    assert!(!gate.admit("a").await.unwrap().allowed);

    clock.advance(Duration::from_secs(2));
    assert!(gate.admit("a").await.unwrap().allowed);
}

#[tokio::test]
async fn test_gates_share_state_through_one_store() {
    // Two engine instances fronting the same store behave like one gate,
    // the way replicated services behind a load balancer share Redis.
    let clock = Arc::new(MockClock::new(T0));
    let store = Arc::new(MemoryStore::new());
    let gate_a = AdmissionGate::with_clock(Arc::clone(&store), clock.clone());
    let gate_b = AdmissionGate::with_clock(Arc::clone(&store), clock.clone());

    gate_a
        .set_policy(BucketPolicy::new(4, 1.0).unwrap())
        .await
        .unwrap();

    assert!(gate_a.admit("a").await.unwrap().allowed);
    assert!(gate_b.admit("a").await.unwrap().allowed);
    assert!(gate_a.admit("a").await.unwrap().allowed);
    assert!(gate_b.admit("a").await.unwrap().allowed);

    // The shared bucket is drained for both instances
    assert!(!gate_a.admit("a").await.unwrap().allowed);
    assert!(!gate_b.admit("a").await.unwrap().allowed);
}

#[tokio::test]
async fn test_store_outage_surfaces_as_error() {
    let gate = AdmissionGate::new(FailingStore::new());

    match gate.admit("a").await {
        Err(AdmitError::Store(_)) => {}
        other => panic!("expected a store error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_identity_rejected() {
    let (gate, _clock) = gate();
    assert!(matches!(
        gate.admit("").await,
        Err(AdmitError::InvalidIdentity)
    ));
}

#[tokio::test]
async fn test_default_policy_applies_when_none_stored() {
    let (gate, _clock) = gate();

    let policy = gate.policy().await.unwrap();
    assert_eq!(policy, BucketPolicy::default());

    let decision = gate.admit("a").await.unwrap();
    assert_eq!(decision.capacity, 10);
    assert_eq!(decision.refill_rate, 2.0);
}
