//! Buckets a set of simulated request latencies and prints the resulting histogram.
//!
//! Run with: `cargo run --example distribution_readme`.
#![expect(
    clippy::arithmetic_side_effects,
    reason = "this is example code that does not need production-level safety"
)]

use std::sync::Arc;

use distribution::{Bucketer, Distribution};

fn main() {
    println!("=== Distribution README Example ===");

    // Bounds at 1, 2, 4, 8, ... milliseconds.
    let bucketer = Arc::new(
        Bucketer::builder()
            .growth_factor(2.0)
            .num_finite_buckets(12)
            .build()
            .expect("static configuration is valid"),
    );

    let mut latency_millis = Distribution::new(Arc::clone(&bucketer));

    for i in 0_u32..1000 {
        // A long-tailed spread of values, most of them small.
        let value = f64::from(i % 37) * f64::from(i % 5 + 1) / 3.0;
        latency_millis.add(value);
    }

    // A few outliers end up in the overflow bucket.
    latency_millis.add_batch(60_000, 3);

    println!("{latency_millis}");

    let (lower, upper) = bucketer
        .bucket_boundaries(bucketer.overflow_bucket())
        .expect("overflow bucket always exists");
    println!("overflow bucket covers [{lower}, {upper})");
}
