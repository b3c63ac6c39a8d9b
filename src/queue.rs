//! # Sequence Queue
//!
//! Queue-test state for the nesting harness. A fixed-capacity ring of
//! sequence numbers: every push stores the next number, every pop checks
//! that it got exactly the number it expected. If a nested interrupt
//! corrupts the ring or a handler's registers on the way in or out, the
//! sequence breaks and the pop reports it.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::NestingFault;
use crate::platform::QueueProbe;
use crate::sync::{self, Mutex};

struct Ring<const N: usize> {
    items: [u32; N],
    head: usize,
    len: usize,
    next_push: u32,
    next_pop: u32,
}

impl<const N: usize> Ring<N> {
    const fn new() -> Self {
        Self {
            items: [0; N],
            head: 0,
            len: 0,
            next_push: 0,
            next_pop: 0,
        }
    }
}

/// Bounded queue of sequence numbers, safe to use from nested handlers.
pub struct SequenceQueue<const N: usize> {
    ring: Mutex<RefCell<Ring<N>>>,
    pushed: AtomicU32,
    popped: AtomicU32,
}

impl<const N: usize> SequenceQueue<N> {
    pub const fn new() -> Self {
        Self {
            ring: Mutex::new(RefCell::new(Ring::new())),
            pushed: AtomicU32::new(0),
            popped: AtomicU32::new(0),
        }
    }

    /// Items pushed since creation.
    pub fn pushed(&self) -> u32 {
        self.pushed.load(Ordering::Acquire)
    }

    /// Items popped and validated since creation.
    pub fn popped(&self) -> u32 {
        self.popped.load(Ordering::Acquire)
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        sync::critical_section(|cs| self.ring.borrow_ref(cs).len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> Default for SequenceQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> QueueProbe for SequenceQueue<N> {
    fn push_from_isr(&self) -> Result<(), NestingFault> {
        sync::critical_section(|cs| {
            let mut ring = self.ring.borrow_ref_mut(cs);
            if ring.len == N {
                return Err(NestingFault::Overflow);
            }
            let slot = (ring.head + ring.len) % N;
            ring.items[slot] = ring.next_push;
            ring.next_push = ring.next_push.wrapping_add(1);
            ring.len += 1;
            Ok(())
        })?;
        self.pushed.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn pop_and_validate_from_isr(&self) -> Result<bool, NestingFault> {
        let popped = sync::critical_section(|cs| {
            let mut ring = self.ring.borrow_ref_mut(cs);
            if ring.len == 0 {
                return Ok(false);
            }
            let item = ring.items[ring.head];
            ring.head = (ring.head + 1) % N;
            ring.len -= 1;
            if item != ring.next_pop {
                return Err(NestingFault::SequenceMismatch);
            }
            ring.next_pop = ring.next_pop.wrapping_add(1);
            Ok(true)
        })?;
        if popped {
            self.popped.fetch_add(1, Ordering::AcqRel);
        }
        Ok(popped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_sequence() {
        let queue: SequenceQueue<4> = SequenceQueue::new();
        for _ in 0..3 {
            queue.push_from_isr().unwrap();
        }
        assert_eq!(queue.len(), 3);
        for _ in 0..3 {
            assert_eq!(queue.pop_and_validate_from_isr(), Ok(true));
        }
        assert!(queue.is_empty());
        assert_eq!(queue.pushed(), 3);
        assert_eq!(queue.popped(), 3);
    }

    #[test]
    fn test_pop_on_empty_is_not_an_error() {
        let queue: SequenceQueue<4> = SequenceQueue::new();
        assert_eq!(queue.pop_and_validate_from_isr(), Ok(false));
        assert_eq!(queue.popped(), 0);
    }

    #[test]
    fn test_overflow_reported() {
        let queue: SequenceQueue<2> = SequenceQueue::new();
        queue.push_from_isr().unwrap();
        queue.push_from_isr().unwrap();
        assert_eq!(queue.push_from_isr(), Err(NestingFault::Overflow));
        assert_eq!(queue.pushed(), 2);
    }

    #[test]
    fn test_ring_wraps_in_sequence() {
        let queue: SequenceQueue<3> = SequenceQueue::new();
        for _ in 0..50 {
            queue.push_from_isr().unwrap();
            queue.push_from_isr().unwrap();
            assert_eq!(queue.pop_and_validate_from_isr(), Ok(true));
            assert_eq!(queue.pop_and_validate_from_isr(), Ok(true));
        }
        assert_eq!(queue.pushed(), 100);
        assert_eq!(queue.popped(), 100);
    }

    #[test]
    fn test_corrupted_slot_detected() {
        let queue: SequenceQueue<4> = SequenceQueue::new();
        queue.push_from_isr().unwrap();
        queue.push_from_isr().unwrap();
        sync::critical_section(|cs| {
            let mut ring = queue.ring.borrow_ref_mut(cs);
            let head = ring.head;
            ring.items[head] ^= 0x10;
        });
        assert_eq!(
            queue.pop_and_validate_from_isr(),
            Err(NestingFault::SequenceMismatch)
        );
    }
}
