//! Example demonstrating the Redis-backed store for distributed admission
//! control.
//!
//! This example shows how to share bucket state across multiple processes.
//! This is useful for:
//!
//! - Services that need consistent limits across replicas behind a load
//!   balancer
//! - Horizontal scaling scenarios where in-process state isn't sufficient
//!
//! # Quick Start
//!
//! 1. Start Redis:
//!    ```bash
//!    docker run -p 6379:6379 redis:7-alpine
//!    ```
//!
//! 2. Run the example:
//!    ```bash
//!    cargo run --example redis --features redis-store
//!    ```
//!
//! # Testing Distributed Admission
//!
//! Run multiple instances in different terminals at the same time:
//! ```bash
//! # Terminal 1
//! cargo run --example redis --features redis-store
//!
//! # Terminal 2
//! cargo run --example redis --features redis-store
//! ```
//!
//! Both instances drain the same buckets via Redis: the total number of
//! admitted requests is split across the processes instead of doubling.

use std::time::Duration;
use tollgate::{AdmissionGate, BucketPolicy, RedisStore, RedisStoreConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tollgate=debug".into()),
        )
        .init();

    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

    let config = RedisStoreConfig {
        key_prefix: "tollgate-demo:".to_string(),
        ttl: Duration::from_secs(300),
    };
    let store = RedisStore::connect_with_config(&url, config).await?;
    let gate = AdmissionGate::new(store);

    // 10-request burst shared by every process, 2 requests/second sustained
    gate.set_policy(BucketPolicy::new(10, 2.0)?).await?;

    println!("=== Distributed Admission Example ===");
    println!("Redis: {url}");
    println!("Policy: {}\n", gate.policy().await?);

    let identity = format!("demo-client-{}", std::process::id() % 4);

    for round in 1..=5 {
        println!("round {round}:");
        for _ in 0..4 {
            let decision = gate.admit(&identity).await?;
            if decision.allowed {
                println!(
                    "  {identity}: allowed ({} tokens left)",
                    decision.tokens_remaining_floor()
                );
            } else {
                println!(
                    "  {identity}: DENIED (retry in {}s)",
                    decision.retry_after_secs
                );
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    let snapshot = gate.metrics().snapshot();
    println!(
        "\nthis process: {} admitted, {} denied",
        snapshot.admitted, snapshot.denied
    );

    Ok(())
}
