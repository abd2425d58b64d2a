//! Tests for the worker pool: bounded parallelism, FIFO intake and shutdown.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use order_dispatch::config::PoolConfig;
use order_dispatch::order::{Dish, JobId, Quantity};
use order_dispatch::worker::{PoolError, WorkerPool};

/// A pool with no jitter, so every order of `dish()` takes exactly 60ms.
fn fixed_pool(workers: usize) -> WorkerPool {
    let config = PoolConfig {
        workers,
        time_scale: 1.0,
        jitter_min: Duration::ZERO,
        jitter_max: Duration::ZERO,
    };
    WorkerPool::new(&config)
}

fn dish() -> Dish {
    Dish::new("test-dish", Duration::from_millis(60))
}

fn one() -> Quantity {
    Quantity::try_from(1i64).unwrap()
}

#[tokio::test]
async fn test_submitted_job_completes() {
    let pool = fixed_pool(2);
    let handle = pool
        .submit(JobId::from_sequence(1), &dish(), Quantity::try_from(2i64).unwrap())
        .unwrap();

    assert!(!handle.is_done());
    let result = handle.await_result().await.unwrap();

    assert!(handle.is_done());
    assert!(result.worker.starts_with("worker-"));
    assert!(result.duration >= Duration::from_millis(120));
    assert_eq!(handle.result(), Some(result));
}

#[tokio::test]
async fn test_cloned_handles_see_same_result() {
    let pool = fixed_pool(1);
    let handle = pool.submit(JobId::from_sequence(1), &dish(), one()).unwrap();
    let other = handle.clone();

    let a = handle.await_result().await.unwrap();
    let b = other.await_result().await.unwrap();
    assert_eq!(a, b);
}

/// Test that submitting more jobs than there are workers queues the excess
/// and every job still completes on a worker within the pool.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_more_jobs_than_workers_all_complete() {
    let pool = fixed_pool(2);
    let handles: Vec<_> = (1..=6)
        .map(|n| pool.submit(JobId::from_sequence(n), &dish(), one()).unwrap())
        .collect();

    let mut workers = HashSet::new();
    for handle in handles {
        let result = tokio::time::timeout(Duration::from_secs(5), handle.await_result())
            .await
            .expect("job should complete")
            .unwrap();
        workers.insert(result.worker);
    }

    let allowed: HashSet<String> = ["worker-1", "worker-2"].iter().map(|s| s.to_string()).collect();
    assert!(workers.is_subset(&allowed), "unexpected workers: {:?}", workers);
}

/// Test that no more than `workers` jobs run at once: three 60ms jobs on a
/// single worker take at least 180ms, and finish in submission order.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_worker_runs_jobs_sequentially() {
    let pool = fixed_pool(1);
    let started = Instant::now();
    let handles: Vec<_> = (1..=3)
        .map(|n| pool.submit(JobId::from_sequence(n), &dish(), one()).unwrap())
        .collect();

    let mut results = Vec::new();
    for handle in &handles {
        results.push(handle.await_result().await.unwrap());
    }

    assert!(started.elapsed() >= Duration::from_millis(180));
    assert!(results[0].completed_at <= results[1].completed_at);
    assert!(results[1].completed_at <= results[2].completed_at);
    assert!(results.iter().all(|r| r.worker == "worker-1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_workers_run_in_parallel() {
    let pool = fixed_pool(3);
    let started = Instant::now();
    let slow = Dish::new("slow", Duration::from_millis(200));
    let handles: Vec<_> = (1..=3)
        .map(|n| pool.submit(JobId::from_sequence(n), &slow, one()).unwrap())
        .collect();

    for handle in &handles {
        handle.await_result().await.unwrap();
    }

    // Sequential execution would take 600ms.
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_submit_after_shutdown_is_rejected() {
    let pool = fixed_pool(2);
    pool.shutdown().await;

    let err = pool
        .submit(JobId::from_sequence(1), &dish(), one())
        .unwrap_err();
    assert_eq!(err, PoolError::Closed);
}

/// Test that shutdown lets workers finish everything already queued.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_finishes_queued_jobs() {
    let pool = fixed_pool(1);
    let handles: Vec<_> = (1..=3)
        .map(|n| pool.submit(JobId::from_sequence(n), &dish(), one()).unwrap())
        .collect();

    tokio::time::timeout(Duration::from_secs(5), pool.shutdown())
        .await
        .expect("shutdown should finish");

    assert!(handles.iter().all(|h| h.is_done()));

    // A second shutdown has nothing left to do.
    pool.shutdown().await;
}

#[tokio::test]
async fn test_capacity_reports_worker_count() {
    let pool = fixed_pool(3);
    assert_eq!(pool.capacity(), 3);
}

/// Test that an absurd time scale only makes orders slow: the worker keeps
/// running and the pool keeps accepting work.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_extreme_time_scale_does_not_kill_workers() {
    let config = PoolConfig {
        workers: 1,
        time_scale: 1e300,
        jitter_min: Duration::ZERO,
        jitter_max: Duration::ZERO,
    };
    let pool = WorkerPool::new(&config);

    let first = pool.submit(JobId::from_sequence(1), &dish(), one()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!first.is_done());
    assert!(pool.submit(JobId::from_sequence(2), &dish(), one()).is_ok());
}
