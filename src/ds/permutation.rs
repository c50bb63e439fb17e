//! Lehmer-code permutation codec.
//!
//! Maps a dense one-based permutation number onto an explicit digit sequence
//! over a base, and back. The first digit of a sequence is its *offset*; the
//! number encodes the arrangement of the remaining `base - 1` digits relative
//! to that offset.
//!
//! ## Architecture
//!
//! ```text
//!   create(base = 4, number = 4, offset = 1)
//!
//!   number - 1 = 3  ──►  factorial digits  [3 / 2!, 1 / 1!] = [1, 1]
//!
//!   digit bag          lehmer   take      shifted by offset (mod 4)
//!   [1, 2, 3]            1       2        (2 + 1) % 4 = 3
//!   [1, 3]               1       3        (3 + 1) % 4 = 0
//!   [1]                  -       1        (1 + 1) % 4 = 2
//!
//!   sequence = [1, 3, 0, 2]
//! ```
//!
//! Encoding and decoding share the same [`DigitBag`] and factorial table, so
//! ascending bag order and remove-by-index semantics cannot drift apart.
//!
//! ## Numeric Domain
//!
//! Numbers are `u64`. `max_number(base) = (base - 1)!` and `20!` is the
//! largest factorial that fits, so [`MAX_BASE`] is 21.
//!
//! ## Example Usage
//!
//! ```
//! use derivekit::ds::Permutation;
//!
//! let p = Permutation::create(3, 2, 0).unwrap();
//! assert_eq!(p.sequence(), &[0, 2, 1]);
//! assert_eq!(Permutation::from_sequence(p.sequence()).unwrap(), p);
//! assert_eq!(p.reflect().number(), 1);
//! ```
//!
//! ## Thread Safety
//!
//! `Permutation` is immutable; every operation returns a new value.

use std::fmt;
use std::hash::{Hash, Hasher};

use rand::Rng;

use crate::error::InvalidArgument;

/// Largest supported base; `(MAX_BASE - 1)!` is the largest factorial in `u64`.
pub const MAX_BASE: usize = 21;

/// `FACTORIALS[i] == i!` for `i` in `0..MAX_BASE`.
const FACTORIALS: [u64; MAX_BASE] = {
    let mut table = [1u64; MAX_BASE];
    let mut i = 1;
    while i < MAX_BASE {
        table[i] = table[i - 1] * i as u64;
        i += 1;
    }
    table
};

/// Working set of not-yet-placed relative digits `1..base`, ascending.
#[derive(Debug, Clone)]
struct DigitBag {
    digits: [u8; MAX_BASE],
    len: usize,
}

impl DigitBag {
    fn new(base: usize) -> Self {
        let mut digits = [0u8; MAX_BASE];
        for (slot, digit) in digits.iter_mut().zip(1..base as u8) {
            *slot = digit;
        }
        Self {
            digits,
            len: base - 1,
        }
    }

    /// Removes and returns the digit at `index`, preserving ascending order.
    fn take(&mut self, index: usize) -> u8 {
        let digit = self.digits[index];
        self.digits.copy_within(index + 1..self.len, index);
        self.len -= 1;
        digit
    }

    fn position(&self, digit: u8) -> Option<usize> {
        self.digits[..self.len].iter().position(|&d| d == digit)
    }
}

/// Weight of Lehmer position `i` for `base`: `(base - 2 - i)!`.
#[inline]
fn weight(base: usize, i: usize) -> u64 {
    FACTORIALS[base - 2 - i]
}

/// Immutable permutation of `0..base` with its one-based Lehmer number.
///
/// Equality and hashing consider `(base, number, offset)`, which fully
/// determine the sequence.
#[derive(Clone)]
pub struct Permutation {
    number: u64,
    sequence: Box<[u8]>,
}

impl Permutation {
    fn validate_base(base: usize) -> Result<(), InvalidArgument> {
        if !(2..=MAX_BASE).contains(&base) {
            return Err(InvalidArgument::Base {
                base,
                max: MAX_BASE,
            });
        }
        Ok(())
    }

    fn validate_offset(base: usize, offset: u8) -> Result<(), InvalidArgument> {
        if usize::from(offset) >= base {
            return Err(InvalidArgument::Offset { offset, base });
        }
        Ok(())
    }

    /// Number of distinct permutations for a fixed offset: `(base - 1)!`.
    pub fn max_number(base: usize) -> Result<u64, InvalidArgument> {
        Self::validate_base(base)?;
        Ok(FACTORIALS[base - 1])
    }

    /// Builds the permutation with the given one-based `number` and `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `base` is outside `[2, MAX_BASE]`,
    /// `offset` is outside `[0, base - 1]`, or `number` is outside
    /// `[1, max_number(base)]`.
    pub fn create(base: usize, number: u64, offset: u8) -> Result<Self, InvalidArgument> {
        let max = Self::max_number(base)?;
        Self::validate_offset(base, offset)?;
        if !(1..=max).contains(&number) {
            return Err(InvalidArgument::Number { number, max });
        }
        Ok(Self::encode(base, number, offset))
    }

    /// Builds a uniformly random permutation using the thread RNG.
    pub fn create_random(base: usize) -> Result<Self, InvalidArgument> {
        Self::create_random_with(&mut rand::rng(), base)
    }

    /// Builds a uniformly random permutation from `rng`.
    pub fn create_random_with<R: Rng + ?Sized>(
        rng: &mut R,
        base: usize,
    ) -> Result<Self, InvalidArgument> {
        let max = Self::max_number(base)?;
        let number = rng.random_range(1..=max);
        let offset = rng.random_range(0..base as u8);
        Ok(Self::encode(base, number, offset))
    }

    /// Recovers a permutation from an explicit sequence.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] unless `sequence` is a permutation of
    /// `0..len` with `len` in `[2, MAX_BASE]`.
    pub fn from_sequence(sequence: &[u8]) -> Result<Self, InvalidArgument> {
        let base = sequence.len();
        Self::validate_base(base)?;

        let mut seen = 0u32;
        for &digit in sequence {
            if usize::from(digit) >= base {
                return Err(InvalidArgument::Sequence {
                    base,
                    reason: "digit out of range",
                });
            }
            let bit = 1u32 << digit;
            if seen & bit != 0 {
                return Err(InvalidArgument::Sequence {
                    base,
                    reason: "duplicate digit",
                });
            }
            seen |= bit;
        }

        Ok(Self::decode(sequence.into()))
    }

    /// Factorial-base decode of `number - 1` into a sequence.
    fn encode(base: usize, number: u64, offset: u8) -> Self {
        let modulus = base as u8;
        let mut bag = DigitBag::new(base);
        let mut sequence = Vec::with_capacity(base);
        sequence.push(offset);

        let mut remaining = number - 1;
        for i in 0..base - 2 {
            let w = weight(base, i);
            let index = (remaining / w) as usize;
            remaining %= w;
            sequence.push((bag.take(index) + offset) % modulus);
        }
        sequence.push((bag.take(0) + offset) % modulus);

        Self {
            number,
            sequence: sequence.into_boxed_slice(),
        }
    }

    /// Inverse of [`encode`](Self::encode); `sequence` must already be valid.
    fn decode(sequence: Box<[u8]>) -> Self {
        let base = sequence.len();
        let modulus = base as u8;
        let offset = sequence[0];
        let mut bag = DigitBag::new(base);

        let mut number = 1u64;
        for i in 0..base - 2 {
            let relative = (modulus + sequence[i + 1] - offset) % modulus;
            let index = bag
                .position(relative)
                .expect("digit bag out of sync with sequence");
            number += index as u64 * weight(base, i);
            bag.take(index);
        }

        Self { number, sequence }
    }

    /// One-based permutation number in `[1, max_number(base)]`.
    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// The digit sequence, a permutation of `0..base`.
    #[inline]
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    #[inline]
    pub fn base(&self) -> usize {
        self.sequence.len()
    }

    /// First digit of the sequence.
    #[inline]
    pub fn offset(&self) -> u8 {
        self.sequence[0]
    }

    /// Reverses the sequence and re-derives its number.
    pub fn reverse(&self) -> Self {
        let mut reversed = self.sequence.clone();
        reversed.reverse();
        Self::decode(reversed)
    }

    /// Negates every digit modulo the base.
    ///
    /// Negation reverses the order of the relative digits, which mirrors the
    /// Lehmer enumeration: `number' = max + 1 - number`.
    pub fn reflect(&self) -> Self {
        let base = self.base();
        let modulus = base as u8;
        let sequence = self
            .sequence
            .iter()
            .map(|&d| if d == 0 { 0 } else { modulus - d })
            .collect();
        Self {
            number: FACTORIALS[base - 1] + 1 - self.number,
            sequence,
        }
    }

    /// Functional inverse: `inverse[sequence[i]] = i`.
    pub fn invert(&self) -> Self {
        let mut inverse = vec![0u8; self.base()].into_boxed_slice();
        for (i, &d) in self.sequence.iter().enumerate() {
            inverse[usize::from(d)] = i as u8;
        }
        Self::decode(inverse)
    }

    /// Shifts every digit so the sequence starts at `offset`.
    ///
    /// The number is unchanged; only the uniform shift differs.
    pub fn with_offset(&self, offset: u8) -> Result<Self, InvalidArgument> {
        let base = self.base();
        Self::validate_offset(base, offset)?;

        let modulus = base as u8;
        let delta = (modulus + offset - self.offset()) % modulus;
        let sequence = self
            .sequence
            .iter()
            .map(|&d| (d + delta) % modulus)
            .collect();
        Ok(Self {
            number: self.number,
            sequence,
        })
    }
}

impl PartialEq for Permutation {
    fn eq(&self, other: &Self) -> bool {
        self.base() == other.base()
            && self.number == other.number
            && self.offset() == other.offset()
    }
}

impl Eq for Permutation {}

impl Hash for Permutation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base().hash(state);
        self.number.hash(state);
        self.offset().hash(state);
    }
}

impl fmt::Debug for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permutation")
            .field("base", &self.base())
            .field("number", &self.number)
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl fmt::Display for Permutation {
    /// Renders the sequence as base-36 digits, e.g. `0a3b...`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;

        for &d in self.sequence.iter() {
            let c = char::from_digit(u32::from(d), 36).ok_or(fmt::Error)?;
            f.write_char(c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn factorial_table_matches_max_number() {
        let mut expected = 1u64;
        for base in 2..=MAX_BASE {
            expected *= (base - 1) as u64;
            assert_eq!(Permutation::max_number(base), Ok(expected));
        }
        assert_eq!(FACTORIALS[MAX_BASE - 1], 2_432_902_008_176_640_000);
    }

    #[test]
    fn base_three_enumeration() {
        assert_eq!(Permutation::max_number(3), Ok(2));
        let first = Permutation::create(3, 1, 0).unwrap();
        let second = Permutation::create(3, 2, 0).unwrap();
        assert_eq!(first.sequence(), &[0, 1, 2]);
        assert_eq!(second.sequence(), &[0, 2, 1]);
        assert_eq!(first.reflect().number(), 2);
        assert_eq!(first.reflect(), second);
    }

    #[test]
    fn encode_matches_worked_example() {
        let p = Permutation::create(4, 4, 1).unwrap();
        assert_eq!(p.sequence(), &[1, 3, 0, 2]);
        assert_eq!(p.base(), 4);
        assert_eq!(p.offset(), 1);
        assert_eq!(p.to_string(), "1302");
    }

    #[test]
    fn base_two_has_single_arrangement_per_offset() {
        assert_eq!(Permutation::max_number(2), Ok(1));
        assert_eq!(Permutation::create(2, 1, 0).unwrap().sequence(), &[0, 1]);
        assert_eq!(Permutation::create(2, 1, 1).unwrap().sequence(), &[1, 0]);
        assert_eq!(Permutation::from_sequence(&[1, 0]).unwrap().number(), 1);
    }

    #[test]
    fn every_base_four_permutation_round_trips() {
        let max = Permutation::max_number(4).unwrap();
        for offset in 0..4 {
            for number in 1..=max {
                let p = Permutation::create(4, number, offset).unwrap();
                let back = Permutation::from_sequence(p.sequence()).unwrap();
                assert_eq!(back.number(), number);
                assert_eq!(back.offset(), offset);
                assert_eq!(back.sequence(), p.sequence());
            }
        }
    }

    #[test]
    fn numbers_are_lexicographic_for_zero_offset() {
        let max = Permutation::max_number(5).unwrap();
        let sequences: Vec<Vec<u8>> = (1..=max)
            .map(|n| Permutation::create(5, n, 0).unwrap().sequence().to_vec())
            .collect();
        let mut sorted = sequences.clone();
        sorted.sort();
        assert_eq!(sequences, sorted);
    }

    #[test]
    fn largest_base_extremes() {
        let max = Permutation::max_number(MAX_BASE).unwrap();
        let last = Permutation::create(MAX_BASE, max, 0).unwrap();
        let expected: Vec<u8> = std::iter::once(0).chain((1..MAX_BASE as u8).rev()).collect();
        assert_eq!(last.sequence(), expected.as_slice());
        assert_eq!(Permutation::from_sequence(last.sequence()).unwrap().number(), max);
    }

    #[test]
    fn validation_rejects_out_of_range_inputs() {
        assert_eq!(
            Permutation::create(1, 1, 0),
            Err(InvalidArgument::Base { base: 1, max: MAX_BASE })
        );
        assert!(matches!(
            Permutation::create(MAX_BASE + 1, 1, 0),
            Err(InvalidArgument::Base { .. })
        ));
        assert_eq!(
            Permutation::create(3, 1, 3),
            Err(InvalidArgument::Offset { offset: 3, base: 3 })
        );
        assert_eq!(
            Permutation::create(3, 0, 0),
            Err(InvalidArgument::Number { number: 0, max: 2 })
        );
        assert_eq!(
            Permutation::create(3, 3, 0),
            Err(InvalidArgument::Number { number: 3, max: 2 })
        );
        assert!(Permutation::create_random(0).is_err());
    }

    #[test]
    fn from_sequence_rejects_non_permutations() {
        assert!(matches!(
            Permutation::from_sequence(&[0]),
            Err(InvalidArgument::Base { base: 1, .. })
        ));
        assert!(matches!(
            Permutation::from_sequence(&[0, 1, 1]),
            Err(InvalidArgument::Sequence { reason: "duplicate digit", .. })
        ));
        assert!(matches!(
            Permutation::from_sequence(&[0, 1, 3]),
            Err(InvalidArgument::Sequence { reason: "digit out of range", .. })
        ));
    }

    #[test]
    fn derived_operations_on_known_value() {
        let p = Permutation::create(4, 4, 1).unwrap();

        let reversed = p.reverse();
        assert_eq!(reversed.sequence(), &[2, 0, 3, 1]);
        assert_eq!(reversed, Permutation::from_sequence(&[2, 0, 3, 1]).unwrap());

        let reflected = p.reflect();
        assert_eq!(reflected.sequence(), &[3, 1, 0, 2]);
        assert_eq!(reflected.number(), 6 + 1 - 4);
        assert_eq!(reflected, Permutation::from_sequence(&[3, 1, 0, 2]).unwrap());

        let inverted = p.invert();
        assert_eq!(inverted.sequence(), &[2, 0, 3, 1]);

        let shifted = p.with_offset(0).unwrap();
        assert_eq!(shifted.sequence(), &[0, 2, 3, 1]);
        assert_eq!(shifted.number(), p.number());
        assert!(p.with_offset(4).is_err());
    }

    #[test]
    fn equality_is_base_number_and_offset() {
        let a = Permutation::create(6, 17, 2).unwrap();
        let b = Permutation::from_sequence(a.sequence()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, a.with_offset(3).unwrap());
        assert_ne!(a, Permutation::create(6, 18, 2).unwrap());
        assert_ne!(
            Permutation::create(3, 1, 0).unwrap(),
            Permutation::create(4, 1, 0).unwrap()
        );
    }

    #[test]
    fn seeded_random_is_valid_and_reproducible() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut again = SmallRng::seed_from_u64(42);
        for base in 2..=MAX_BASE {
            let p = Permutation::create_random_with(&mut rng, base).unwrap();
            let q = Permutation::create_random_with(&mut again, base).unwrap();
            assert_eq!(p, q);
            assert_eq!(p.base(), base);
            assert_eq!(Permutation::from_sequence(p.sequence()).unwrap(), p);
        }
    }
}
