//! Basic example demonstrating token-bucket admission over the in-process
//! store.
//!
//! A small burst is allowed through immediately, then requests are denied
//! until the refill rate restores tokens.

use std::time::Duration;
use tollgate::{AdmissionGate, BucketPolicy, MemoryStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tollgate=debug".into()),
        )
        .init();

    let gate = AdmissionGate::new(MemoryStore::new());

    // 5-request burst, 1 request/second sustained
    gate.set_policy(BucketPolicy::new(5, 1.0)?).await?;

    println!("=== Token Bucket Admission Example ===\n");
    println!("Policy: {}\n", gate.policy().await?);

    let identity = "203.0.113.7";

    println!("Firing 8 requests back-to-back:");
    for i in 1..=8 {
        let decision = gate.admit(identity).await?;
        if decision.allowed {
            println!(
                "  request {i}: allowed ({} tokens left)",
                decision.tokens_remaining_floor()
            );
        } else {
            println!(
                "  request {i}: DENIED (retry in {}s)",
                decision.retry_after_secs
            );
        }
    }

    println!("\nWaiting 2 seconds for the bucket to refill...");
    tokio::time::sleep(Duration::from_secs(2)).await;

    let decision = gate.admit(identity).await?;
    println!(
        "after the wait: allowed={} ({} tokens left)",
        decision.allowed,
        decision.tokens_remaining_floor()
    );

    let snapshot = gate.metrics().snapshot();
    println!(
        "\ntotals: {} admitted, {} denied ({:.0}% denial rate)",
        snapshot.admitted,
        snapshot.denied,
        snapshot.denial_rate() * 100.0
    );

    Ok(())
}
