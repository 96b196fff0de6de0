//! Work queue semantics under concurrency

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::executor::block_on;
use proptest::prelude::*;

use ingress_operator::WorkQueue;

fn queue() -> Arc<WorkQueue<String>> {
    Arc::new(WorkQueue::new(
        Duration::from_millis(1),
        Duration::from_secs(1),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_deliver_once() {
    let q = queue();

    let adders: Vec<_> = (0..10)
        .map(|_| {
            let q = q.clone();
            tokio::spawn(async move { q.add("hot-key".to_string()) })
        })
        .collect();
    for adder in adders {
        adder.await.unwrap();
    }

    assert_eq!(q.len(), 1);
    assert_eq!(q.get().await.as_deref(), Some("hot-key"));
    q.done(&"hot-key".to_string());

    q.shut_down();
    assert_eq!(q.get().await, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_key_never_processed_concurrently() {
    let q = queue();
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let processed = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..3)
        .map(|_| {
            let q = q.clone();
            let active = active.clone();
            let max_active = max_active.clone();
            let processed = processed.clone();
            tokio::spawn(async move {
                while let Some(key) = q.get().await {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_active.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    processed.fetch_add(1, Ordering::SeqCst);
                    q.done(&key);
                }
            })
        })
        .collect();

    // Hammer one key so some adds land while it is in flight
    for _ in 0..5 {
        q.add("contended".to_string());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    q.shut_down();
    for worker in workers {
        worker.await.unwrap();
    }

    assert_eq!(max_active.load(Ordering::SeqCst), 1);
    assert!(processed.load(Ordering::SeqCst) >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_keys_process_in_parallel_workers() {
    let q = queue();
    let processed = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let q = q.clone();
            let processed = processed.clone();
            tokio::spawn(async move {
                while let Some(key) = q.get().await {
                    processed.fetch_add(1, Ordering::SeqCst);
                    q.done(&key);
                }
            })
        })
        .collect();

    for i in 0..20 {
        q.add(format!("key-{i}"));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    q.shut_down();
    for worker in workers {
        worker.await.unwrap();
    }

    assert_eq!(processed.load(Ordering::SeqCst), 20);
}

proptest! {
    /// Any burst of adds delivers each distinct key exactly once.
    #[test]
    fn delivers_each_distinct_key_exactly_once(keys in prop::collection::vec(0u8..8, 1..64)) {
        let q = queue();
        for key in &keys {
            q.add(format!("key-{key}"));
        }
        q.shut_down();

        let mut delivered = HashSet::new();
        while let Some(key) = block_on(q.get()) {
            prop_assert!(delivered.insert(key.clone()), "duplicate delivery of {key}");
            q.done(&key);
        }

        let expected: HashSet<String> = keys.iter().map(|k| format!("key-{k}")).collect();
        prop_assert_eq!(delivered, expected);
    }
}
