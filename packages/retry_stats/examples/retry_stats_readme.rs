//! Retries a few simulated flaky operations on worker threads and prints the collected
//! statistics, both as summary blocks and as a full report with attempt durations.
//!
//! Run with: `cargo run --example retry_stats_readme`.
#![expect(
    clippy::arithmetic_side_effects,
    reason = "this is example code that does not need production-level safety"
)]

use std::io;
use std::thread;
use std::time::Duration;

use retry_stats::{
    GenericRetry, StatsHandle, StatsRegistry, StatsReport, report_stats, retry_with_stats,
};
use tracing::Level;

#[derive(Debug)]
enum FetchError {
    Unavailable,
    NotFound,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "service temporarily unavailable"),
            Self::NotFound => write!(f, "no such object"),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_writer(io::stderr)
        .init();

    let registry = StatsRegistry::new();

    // Workers need handles, so the registry must be shared before they start.
    registry
        .setup_shared()
        .expect("registry is set up exactly once");

    let workers = (0..3_u32)
        .map(|worker_index| {
            let handle = registry
                .handle()
                .expect("registry was set up in shared mode");

            thread::spawn(move || fetch_objects(&handle, worker_index))
        })
        .collect::<Vec<_>>();

    for worker in workers {
        worker.join().unwrap();
    }

    println!("=== Summary ===");
    report_stats(&mut io::stdout(), &registry).unwrap();

    println!();
    println!("=== Full report ===");
    println!("{}", StatsReport::collect(&registry));
}

fn fetch_objects(handle: &StatsHandle, worker_index: u32) {
    let executor = GenericRetry::builder(|e: &FetchError| matches!(e, FetchError::Unavailable))
        .max_retry(4)
        .sleep(Duration::from_millis(2))
        .backoff_factor(2)
        .sleep_cap(Duration::from_millis(20))
        .build();

    for object in 0..5_u32 {
        let mut calls = 0_u32;

        let result = retry_with_stats(handle, "fetch_object", &executor, || {
            calls += 1;
            thread::sleep(Duration::from_millis(u64::from(object + 1)));

            match (object + worker_index) % 5 {
                // Never exists, so it fails on the first attempt without retrying.
                0 => Err(FetchError::NotFound),
                // Needs a couple of retries.
                n if calls <= n => Err(FetchError::Unavailable),
                _ => Ok(object),
            }
        });

        if let Err(e) = result {
            println!("worker {worker_index} could not fetch object {object}: {e}");
        }
    }

    // Always succeeds.
    let executor = GenericRetry::new(|_: &FetchError| true, 1);
    retry_with_stats(handle, "list_objects", &executor, || Ok::<_, FetchError>(5)).unwrap();
}
