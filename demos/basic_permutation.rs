//! Example demonstrating the Lehmer permutation codec.
//!
//! Run with: cargo run --example basic_permutation

use derivekit::ds::Permutation;

fn main() {
    println!("=== Permutation Examples ===\n");

    // Example 1: enumerate base 4 at offset 0
    println!("1. Base 4, offset 0");
    let max = Permutation::max_number(4).unwrap();
    for number in 1..=max {
        let p = Permutation::create(4, number, 0).unwrap();
        println!("   #{number}: {p}");
    }
    println!();

    // Example 2: derived operations
    println!("2. Derived operations on #4 at offset 1");
    let p = Permutation::create(4, 4, 1).unwrap();
    println!("   original:  {p} (#{})", p.number());
    println!("   reverse:   {} (#{})", p.reverse(), p.reverse().number());
    println!("   reflect:   {} (#{})", p.reflect(), p.reflect().number());
    println!("   invert:    {} (#{})", p.invert(), p.invert().number());
    let shifted = p.with_offset(0).unwrap();
    println!("   offset 0:  {shifted} (#{})", shifted.number());
    println!();

    // Example 3: decode an explicit sequence
    println!("3. Decode a sequence");
    match Permutation::from_sequence(&[2, 0, 3, 1]) {
        Ok(p) => println!("   [2, 0, 3, 1] -> #{} offset {}", p.number(), p.offset()),
        Err(err) => println!("   rejected: {err}"),
    }
    match Permutation::from_sequence(&[0, 1, 1]) {
        Ok(p) => println!("   [0, 1, 1] -> #{}", p.number()),
        Err(err) => println!("   [0, 1, 1] rejected: {err}"),
    }
}
