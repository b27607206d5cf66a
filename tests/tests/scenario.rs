use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vigil::prelude::*;

#[tokio::test]
#[ntest::timeout(10_000)]
async fn follows_the_stage_ramp() {
    let seen = Arc::new(Mutex::new(vec![]));
    let record = seen.clone();

    let stats = Scenario::new("ramp", move |vu: VirtualUser| {
        let record = record.clone();
        async move {
            record.lock().unwrap().push(vu);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .stages(vec![
        Stage::new(Duration::from_millis(300), 4),
        Stage::new(Duration::from_millis(300), 4),
        Stage::new(Duration::from_millis(200), 0),
    ])
    .await;

    assert_eq!(stats.max_workers, 4);
    assert!(stats.elapsed >= Duration::from_millis(800));

    let seen = seen.lock().unwrap();
    assert_eq!(stats.iterations, seen.len() as u64);

    let workers: HashSet<_> = seen.iter().map(|vu| vu.worker).collect();
    assert_eq!(workers, HashSet::from([1, 2, 3, 4]));

    let firsts = seen.iter().filter(|vu| vu.iteration == 0).count();
    assert_eq!(firsts, 4);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn zero_target_runs_nothing() {
    let calls = Arc::new(AtomicU64::new(0));
    let counter = calls.clone();
    let stats = Scenario::new("idle", move |_vu: VirtualUser| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    })
    .stages(vec![Stage::new(Duration::from_millis(200), 0)])
    .await;

    assert_eq!(stats.max_workers, 0);
    assert_eq!(stats.iterations, 0);
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn stuck_iterations_are_aborted_after_graceful_stop() {
    let stats = Scenario::new("stuck", |_vu: VirtualUser| async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    })
    .stages(vec![
        Stage::new(Duration::from_millis(200), 2),
        Stage::new(Duration::from_millis(200), 2),
    ])
    .graceful_stop(Duration::from_millis(50))
    .await;

    assert_eq!(stats.max_workers, 2);
    assert_eq!(stats.iterations, 0);
    assert!(stats.elapsed < Duration::from_secs(2));
}
