#![no_main]

use derivekit::ds::{MAX_BASE, Permutation};
use libfuzzer_sys::fuzz_target;

// Fuzz arbitrary byte strings as candidate sequences.
//
// Anything the decoder accepts must re-encode to the same sequence, and the
// derived operations must keep producing decodable permutations.
fuzz_target!(|data: &[u8]| {
    let Ok(p) = Permutation::from_sequence(data) else {
        return;
    };

    assert!((2..=MAX_BASE).contains(&p.base()));
    assert!(p.number() >= 1);
    assert!(p.number() <= Permutation::max_number(p.base()).unwrap());

    let encoded = Permutation::create(p.base(), p.number(), p.offset()).unwrap();
    assert_eq!(encoded.sequence(), data);

    for derived in [p.reverse(), p.reflect(), p.invert()] {
        let decoded = Permutation::from_sequence(derived.sequence()).unwrap();
        assert_eq!(decoded, derived);
    }
});
