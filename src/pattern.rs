//! # Register Pattern
//!
//! The payload of the register checks: `PATTERN_WORDS` machine words
//! derived from a seed, written and read back through volatile accesses
//! so the compiler can neither fold the check away nor keep a private
//! copy in spare registers.
//!
//! Every word keeps `0xA5A5 ^ index` in its low half, so no word can be
//! all-zero or all-one regardless of the seed; a stuck bit in either
//! direction shows up.

use core::ptr;

use crate::config::PATTERN_WORDS;

/// Deterministic word `index` of the pattern for `seed`.
#[inline]
pub const fn pattern_word(seed: u32, index: usize) -> u32 {
    let high = seed.rotate_left((index as u32) * 4) & 0xFFFF_0000;
    high | (0xA5A5 ^ index as u32)
}

/// A private working set holding one copy of the pattern.
#[derive(Debug, Clone)]
pub struct RegisterPattern {
    seed: u32,
    words: [u32; PATTERN_WORDS],
}

impl RegisterPattern {
    /// Create a pattern seeded with `seed`. The working set starts
    /// cleared; call [`load`](Self::load) before verifying.
    pub const fn new(seed: u32) -> Self {
        Self {
            seed,
            words: [0; PATTERN_WORDS],
        }
    }

    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// Write the full pattern into the working set.
    pub fn load(&mut self) {
        for i in 0..PATTERN_WORDS {
            // SAFETY: `i` is in bounds, the pointer comes from a live
            // mutable borrow.
            unsafe { ptr::write_volatile(&mut self.words[i], pattern_word(self.seed, i)) };
        }
    }

    /// Re-read the working set; true iff every word is bit-exact.
    pub fn verify(&self) -> bool {
        let mut intact = true;
        for i in 0..PATTERN_WORDS {
            // SAFETY: `i` is in bounds, the pointer comes from a live
            // shared borrow.
            let word = unsafe { ptr::read_volatile(&self.words[i]) };
            intact &= word == pattern_word(self.seed, i);
        }
        intact
    }

    /// Flip one bit of the working set. Used to prove that corruption
    /// between `load` and `verify` is caught.
    pub fn flip_bit(&mut self, word: usize, bit: u32) {
        let index = word % PATTERN_WORDS;
        // SAFETY: `index` is reduced into bounds.
        unsafe {
            let current = ptr::read_volatile(&self.words[index]);
            ptr::write_volatile(&mut self.words[index], current ^ (1 << (bit % 32)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{REG_TEST_1_PARAMETER, REG_TEST_2_PARAMETER};

    #[test]
    fn test_load_then_verify() {
        let mut pattern = RegisterPattern::new(REG_TEST_1_PARAMETER);
        pattern.load();
        assert!(pattern.verify());
        // Idempotent: nothing between passes disturbs it.
        pattern.load();
        assert!(pattern.verify());
        assert!(pattern.verify());
    }

    #[test]
    fn test_unloaded_pattern_fails() {
        let pattern = RegisterPattern::new(REG_TEST_2_PARAMETER);
        assert!(!pattern.verify());
    }

    #[test]
    fn test_single_bit_flip_detected() {
        for word in 0..PATTERN_WORDS {
            for bit in [0, 7, 16, 31] {
                let mut pattern = RegisterPattern::new(REG_TEST_1_PARAMETER);
                pattern.load();
                pattern.flip_bit(word, bit);
                assert!(!pattern.verify(), "flip of word {} bit {} missed", word, bit);
            }
        }
    }

    #[test]
    fn test_words_are_never_trivial() {
        for seed in [0, u32::MAX, REG_TEST_1_PARAMETER, REG_TEST_2_PARAMETER] {
            for i in 0..PATTERN_WORDS {
                let word = pattern_word(seed, i);
                assert_ne!(word, 0);
                assert_ne!(word, u32::MAX);
            }
        }
    }

    #[test]
    fn test_instances_hold_different_values() {
        let differ = (0..PATTERN_WORDS)
            .any(|i| pattern_word(REG_TEST_1_PARAMETER, i) != pattern_word(REG_TEST_2_PARAMETER, i));
        assert!(differ);
    }
}
