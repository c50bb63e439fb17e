//! Example demonstrating single-flight artifact computation.
//!
//! Run with: cargo run --example basic_single_flight

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use derivekit::builder::FlightBuilder;
use derivekit::ds::StackText;

fn main() {
    println!("=== SingleFlight Examples ===\n");

    // Example 1: compute once, then hit
    println!("1. Compute once, then hit");
    let flight = FlightBuilder::new()
        .registry_capacity(16)
        .try_build_memory::<u64, String>(100)
        .expect("capacity is non-zero");

    let first = flight
        .get_or_compute(&796, |key| Ok::<_, Infallible>(format!("A{key:06} expansion")))
        .unwrap();
    let second = flight
        .get_or_compute(&796, |_| -> Result<String, Infallible> { unreachable!() })
        .unwrap();
    println!("   first:  {first}");
    println!("   second: {second} (same allocation? {})", Arc::ptr_eq(&first, &second));
    println!("   metrics: {:?}", flight.metrics());
    println!();

    // Example 2: concurrent callers share one computation
    println!("2. Eight threads, one computation");
    let flight = Arc::new(
        FlightBuilder::new()
            .try_build_memory::<u64, String>(100)
            .expect("capacity is non-zero"),
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let flight = flight.clone();
            let calls = calls.clone();
            thread::spawn(move || {
                flight
                    .get_or_compute(&1113, |key| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        let mut text = StackText::new();
                        text.append_fmt(&format_args!("A{key:06} = 2.875236"))
                            .map(|()| text.to_string())
                    })
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    println!("   compute calls: {}", calls.load(Ordering::SeqCst));
    println!("   metrics: {:?}", flight.metrics());
    println!();

    // Example 3: failures are not cached
    println!("3. Failed computations are retried");
    let flight = FlightBuilder::new()
        .try_build_memory::<u64, u64>(100)
        .expect("capacity is non-zero");
    let failed = flight.get_or_compute(&7, |_| Err("source offline"));
    println!("   first attempt: {:?}", failed.map_err(|err| err.into_compute()));
    let retried = flight.get_or_compute(&7, |key| Ok::<_, &str>(key * 6));
    println!("   second attempt: {:?}", retried.map(|value| *value));
}
