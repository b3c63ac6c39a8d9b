//! # Liveness Counters
//!
//! One counter per supervised probe. The owning probe is the only
//! writer; the supervisory check only samples.

use core::sync::atomic::{AtomicU32, Ordering};

/// Monotone wrapping counter, bumped once per successful probe pass.
#[derive(Debug)]
pub struct LivenessCounter {
    value: AtomicU32,
}

impl LivenessCounter {
    pub const fn new() -> Self {
        Self {
            value: AtomicU32::new(0),
        }
    }

    /// Record one successful pass.
    ///
    /// Single writer, so a load/store pair is enough and works on cores
    /// without read-modify-write atomics.
    #[inline]
    pub fn increment(&self) {
        let next = self.value.load(Ordering::Relaxed).wrapping_add(1);
        self.value.store(next, Ordering::Release);
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }

    /// True if `now` is strictly ahead of `prev`, modulo wraparound.
    ///
    /// A forward distance of more than half the range reads as going
    /// backwards.
    #[inline]
    pub const fn progressed(prev: u32, now: u32) -> bool {
        let delta = now.wrapping_sub(prev);
        delta != 0 && delta <= i32::MAX as u32
    }
}

impl Default for LivenessCounter {
    fn default() -> Self {
        Self::new()
    }
}
