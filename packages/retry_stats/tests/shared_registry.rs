//! Exercises a registry set up in shared mode from many worker threads, through the
//! public API only.

#![allow(clippy::arithmetic_side_effects, reason = "small test values, no overflow")]

use std::fmt;
use std::sync::Barrier;
use std::thread;

use retry_stats::{
    GenericRetry, RecordStats, StatsMode, StatsRegistry, StatsReport, report_stats,
    retry_with_stats,
};

const WORKER_COUNT: u32 = 8;
const OPERATIONS_PER_WORKER: u32 = 25;

#[derive(Debug)]
struct Transient;

impl fmt::Display for Transient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transient failure")
    }
}

/// Each worker retries every operation once before it succeeds, except for every fifth
/// operation, which never succeeds.
fn run_worker(recorder: &impl RecordStats) {
    let executor = GenericRetry::new(|_: &Transient| true, 2);

    for operation in 0..OPERATIONS_PER_WORKER {
        let mut calls = 0;

        let result = retry_with_stats(recorder, "work", &executor, || {
            calls += 1;

            if operation % 5 == 0 || calls == 1 {
                Err(Transient)
            } else {
                Ok(operation)
            }
        });

        assert_eq!(result.is_ok(), operation % 5 != 0);
    }
}

#[test]
fn entries_from_all_workers_are_aggregated() {
    let registry = StatsRegistry::new();
    registry.setup_shared().unwrap();
    assert_eq!(registry.mode(), Some(StatsMode::Shared));

    let start = Barrier::new(WORKER_COUNT as usize);

    thread::scope(|s| {
        for _ in 0..WORKER_COUNT {
            let handle = registry.handle().unwrap();
            let start = &start;

            s.spawn(move || {
                start.wait();
                run_worker(&handle);
            });
        }
    });

    let failing_per_worker = OPERATIONS_PER_WORKER / 5;
    let succeeding_per_worker = OPERATIONS_PER_WORKER - failing_per_worker;

    let stats = registry.category_stats("work");
    assert_eq!(
        stats.success(),
        u64::from(WORKER_COUNT * succeeding_per_worker)
    );
    assert_eq!(stats.failure(), u64::from(WORKER_COUNT * failing_per_worker));
    assert_eq!(stats.total(), u64::from(WORKER_COUNT * OPERATIONS_PER_WORKER));

    // One retry per succeeding operation, two per failing one.
    assert_eq!(
        stats.retry(),
        u64::from(WORKER_COUNT * (succeeding_per_worker + 2 * failing_per_worker))
    );
}

#[test]
fn registry_and_handles_record_into_same_collection() {
    let registry = StatsRegistry::shared();

    thread::scope(|s| {
        let handle = registry.handle().unwrap();
        s.spawn(move || run_worker(&handle));

        // Recording directly into a shared registry is also allowed.
        run_worker(&registry);
    });

    assert_eq!(
        registry.category_stats("work").total(),
        u64::from(2 * OPERATIONS_PER_WORKER)
    );
    assert_eq!(
        registry.entries().len(),
        2 * OPERATIONS_PER_WORKER as usize
    );
}

#[test]
fn local_registry_is_shareable_by_reference() {
    let registry = StatsRegistry::local();

    thread::scope(|s| {
        for _ in 0..WORKER_COUNT {
            s.spawn(|| run_worker(&registry));
        }
    });

    assert_eq!(
        registry.category_stats("work").total(),
        u64::from(WORKER_COUNT * OPERATIONS_PER_WORKER)
    );
}

#[test]
fn reports_cover_worker_entries() {
    let registry = StatsRegistry::shared();

    thread::scope(|s| {
        let handle = registry.handle().unwrap();
        s.spawn(move || run_worker(&handle));
    });

    let mut out = Vec::new();
    report_stats(&mut out, &registry).unwrap();
    let summary = String::from_utf8(out).unwrap();

    assert!(summary.contains("** Performance Statistics for work\n"));
    assert!(summary.contains("** Success: 20\n"));
    assert!(summary.contains("** Failure: 5\n"));
    assert!(summary.contains("** Retries: 30\n"));
    assert!(summary.contains("** Total: 25\n"));

    let report = StatsReport::collect(&registry);
    let work = report.category("work").unwrap();

    // 20 operations with 2 attempts and 5 operations with 3 attempts.
    assert_eq!(work.attempt_millis().count(), 55);
    assert_eq!(work.stats(), registry.category_stats("work"));
}
