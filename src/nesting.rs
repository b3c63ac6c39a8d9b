//! # Interrupt Nesting Harness
//!
//! Runs queue traffic from two timer interrupts at different levels and
//! rates so that the secondary handler keeps landing in the middle of the
//! tick handler. Each handler does one bounded unit of work per interrupt
//! (push one item, pop and validate one item); a broken save/restore on
//! nested entry or exit shows up as a sequence error in the queue.
//!
//! ```text
//!   level
//!     ^        secondary (tick + 17 Hz)
//!     |          ┌──┐         ┌──┐          ┌──┐
//!     |          │  │         │  │          │  │
//!     |  ┌───────┘  └──┐  ┌───┘  └───┐  ┌───┘  └──┐
//!     |  │ tick handler│  │          │  │         │   primary (tick)
//!     +──┴─────────────┴──┴──────────┴──┴─────────┴──────────► time
//! ```
//!
//! Both handlers return immediately until the initialization gate opens.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::counter::LivenessCounter;
use crate::error::{Fault, ProbeError};
use crate::gate::InitializationGate;
use crate::platform::{QueueProbe, TimerPort};
use crate::status::StatusLatch;
use crate::timer::{NestingPlan, TimerChannel};

/// What the harness ended up exercising after setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessMode {
    /// Both handlers run; the secondary nests into the tick.
    Nesting,
    /// No secondary timer on this platform; only the tick handler runs.
    TickOnly,
}

/// Dual-timer harness over the queue-test state `Q`.
pub struct NestingHarness<Q> {
    queue: Q,
    gate: InitializationGate,
    secondary_enabled: AtomicBool,
    failed: AtomicBool,
    primary_serviced: LivenessCounter,
    secondary_serviced: LivenessCounter,
}

impl<Q: QueueProbe> NestingHarness<Q> {
    pub const fn new(queue: Q) -> Self {
        Self {
            queue,
            gate: InitializationGate::new(),
            secondary_enabled: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            primary_serviced: LivenessCounter::new(),
            secondary_serviced: LivenessCounter::new(),
        }
    }

    /// Configure the secondary timer from `plan` and open the gate.
    ///
    /// A missing secondary timer is not an error: the harness falls back
    /// to [`HarnessMode::TickOnly`].
    pub fn setup<P: TimerPort>(
        &self,
        port: &mut P,
        plan: &NestingPlan,
    ) -> Result<HarnessMode, ProbeError> {
        let mode = match self.start_secondary(port, &plan.secondary) {
            Ok(()) => HarnessMode::Nesting,
            Err(ProbeError::ResourceUnavailable { channel }) => {
                log::warn!(
                    "timer channel {} unavailable, interrupt nesting not exercised",
                    channel
                );
                HarnessMode::TickOnly
            }
            Err(err) => return Err(err),
        };

        // The queue is built before the timers start; from here on the
        // handlers may touch it.
        self.gate.open();
        log::debug!(
            "nesting harness up: tick {} Hz, secondary {} Hz at level {}, {:?}",
            plan.primary.frequency_hz,
            plan.secondary.frequency_hz,
            plan.secondary.level.get(),
            mode
        );
        Ok(mode)
    }

    fn start_secondary<P: TimerPort>(
        &self,
        port: &mut P,
        channel: &TimerChannel,
    ) -> Result<(), ProbeError> {
        if !port.channel_available(channel.index) {
            return Err(ProbeError::ResourceUnavailable {
                channel: channel.index,
            });
        }
        port.configure(channel)?;
        self.secondary_enabled.store(true, Ordering::Release);
        port.enable(channel.index);
        Ok(())
    }

    /// Tick-rate handler work. Called from the scheduler's tick hook.
    pub fn on_primary_tick(&self, status: &StatusLatch) {
        self.run_unit(&self.primary_serviced, status);
    }

    /// Offset-rate handler work. Called from the secondary timer interrupt.
    pub fn on_secondary_tick(&self, status: &StatusLatch) {
        if !self.secondary_enabled.load(Ordering::Acquire) {
            return;
        }
        self.run_unit(&self.secondary_serviced, status);
    }

    fn run_unit(&self, serviced: &LivenessCounter, status: &StatusLatch) {
        if !self.gate.is_open() || self.failed.load(Ordering::Acquire) {
            return;
        }
        let result = self
            .queue
            .push_from_isr()
            .and_then(|()| self.queue.pop_and_validate_from_isr());
        match result {
            Ok(_) => serviced.increment(),
            Err(fault) => {
                self.failed.store(true, Ordering::Release);
                status.latch(Fault::NestingAssertion(fault));
            }
        }
    }

    pub fn mode(&self) -> HarnessMode {
        if self.secondary_enabled.load(Ordering::Acquire) {
            HarnessMode::Nesting
        } else {
            HarnessMode::TickOnly
        }
    }

    /// Counter the supervisory check watches: the secondary handler's
    /// when nesting runs, the tick handler's otherwise.
    pub fn liveness(&self) -> &LivenessCounter {
        match self.mode() {
            HarnessMode::Nesting => &self.secondary_serviced,
            HarnessMode::TickOnly => &self.primary_serviced,
        }
    }

    pub fn primary_serviced(&self) -> u32 {
        self.primary_serviced.value()
    }

    pub fn secondary_serviced(&self) -> u32 {
        self.secondary_serviced.value()
    }

    pub fn gate(&self) -> &InitializationGate {
        &self.gate
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{INT_QUEUE_LENGTH, SYSTEM_CLOCK_HZ, TICK_HZ};
    use crate::error::NestingFault;
    use crate::queue::SequenceQueue;
    use std::sync::Arc;
    use std::thread;
    use std::vec::Vec;

    struct MockPort {
        available: bool,
        configured: Vec<TimerChannel>,
        enabled: Vec<u8>,
    }

    impl MockPort {
        fn new(available: bool) -> Self {
            Self {
                available,
                configured: Vec::new(),
                enabled: Vec::new(),
            }
        }
    }

    impl TimerPort for MockPort {
        fn channel_available(&self, _index: u8) -> bool {
            self.available
        }

        fn configure(&mut self, channel: &TimerChannel) -> Result<(), ProbeError> {
            self.configured.push(*channel);
            Ok(())
        }

        fn enable(&mut self, index: u8) {
            self.enabled.push(index);
        }
    }

    fn plan() -> NestingPlan {
        NestingPlan::for_clock(SYSTEM_CLOCK_HZ, TICK_HZ).unwrap()
    }

    #[test]
    fn test_setup_configures_secondary_and_opens_gate() {
        let harness = NestingHarness::new(SequenceQueue::<INT_QUEUE_LENGTH>::new());
        let mut port = MockPort::new(true);
        let plan = plan();

        assert_eq!(harness.setup(&mut port, &plan).unwrap(), HarnessMode::Nesting);
        assert_eq!(port.configured, [plan.secondary]);
        assert_eq!(port.enabled, [plan.secondary.index]);
        assert!(harness.gate().is_open());
        assert_eq!(harness.mode(), HarnessMode::Nesting);
    }

    #[test]
    fn test_missing_secondary_timer_degrades_silently() {
        let harness = NestingHarness::new(SequenceQueue::<INT_QUEUE_LENGTH>::new());
        let status = StatusLatch::new();
        let mut port = MockPort::new(false);

        assert_eq!(harness.setup(&mut port, &plan()).unwrap(), HarnessMode::TickOnly);
        assert!(port.configured.is_empty());
        assert!(port.enabled.is_empty());

        harness.on_secondary_tick(&status);
        assert_eq!(harness.secondary_serviced(), 0);
        assert_eq!(harness.queue().pushed(), 0);

        harness.on_primary_tick(&status);
        assert_eq!(harness.primary_serviced(), 1);
        assert!(status.is_ok());
    }

    #[test]
    fn test_handlers_idle_until_gate_opens() {
        let harness = NestingHarness::new(SequenceQueue::<INT_QUEUE_LENGTH>::new());
        let status = StatusLatch::new();
        // Timer running, gate still closed: the startup race.
        harness.secondary_enabled.store(true, Ordering::Release);

        for _ in 0..10 {
            harness.on_secondary_tick(&status);
            harness.on_primary_tick(&status);
        }
        assert_eq!(harness.queue().pushed(), 0);
        assert_eq!(harness.queue().popped(), 0);
        assert_eq!(harness.primary_serviced(), 0);
        assert_eq!(harness.secondary_serviced(), 0);
        assert!(status.is_ok());
    }

    #[test]
    fn test_overlapping_handlers_keep_queue_consistent() {
        const CYCLES: u32 = 20_000;
        let harness = Arc::new(NestingHarness::new(SequenceQueue::<INT_QUEUE_LENGTH>::new()));
        let status = Arc::new(StatusLatch::new());
        harness.setup(&mut MockPort::new(true), &plan()).unwrap();

        let primary = {
            let (harness, status) = (Arc::clone(&harness), Arc::clone(&status));
            thread::spawn(move || {
                for _ in 0..CYCLES {
                    harness.on_primary_tick(&status);
                }
            })
        };
        let secondary = {
            let (harness, status) = (Arc::clone(&harness), Arc::clone(&status));
            thread::spawn(move || {
                for _ in 0..CYCLES {
                    harness.on_secondary_tick(&status);
                }
            })
        };
        primary.join().unwrap();
        secondary.join().unwrap();

        assert!(status.is_ok(), "{}", status.message());
        assert_eq!(harness.queue().pushed(), 2 * CYCLES);
        assert_eq!(harness.queue().popped(), 2 * CYCLES);
        assert!(harness.queue().is_empty());
        assert_eq!(harness.primary_serviced(), CYCLES);
        assert_eq!(harness.secondary_serviced(), CYCLES);
    }

    /// Queue that fires the secondary handler from inside the tick
    /// handler's push, the way a nested interrupt would.
    struct NestingQueue {
        inner: SequenceQueue<INT_QUEUE_LENGTH>,
        depth: AtomicBool,
    }

    impl QueueProbe for NestingQueue {
        fn push_from_isr(&self) -> Result<(), NestingFault> {
            self.inner.push_from_isr()?;
            if !self.depth.swap(true, Ordering::AcqRel) {
                NESTED.on_secondary_tick(&NESTED_STATUS);
                self.depth.store(false, Ordering::Release);
            }
            Ok(())
        }

        fn pop_and_validate_from_isr(&self) -> Result<bool, NestingFault> {
            self.inner.pop_and_validate_from_isr()
        }
    }

    static NESTED: NestingHarness<NestingQueue> = NestingHarness::new(NestingQueue {
        inner: SequenceQueue::new(),
        depth: AtomicBool::new(false),
    });
    static NESTED_STATUS: StatusLatch = StatusLatch::new();

    #[test]
    fn test_secondary_nested_inside_tick_handler() {
        NESTED.setup(&mut MockPort::new(true), &plan()).unwrap();

        for _ in 0..100 {
            NESTED.on_primary_tick(&NESTED_STATUS);
        }

        assert!(NESTED_STATUS.is_ok(), "{}", NESTED_STATUS.message());
        assert_eq!(NESTED.primary_serviced(), 100);
        assert_eq!(NESTED.secondary_serviced(), 100);
        assert_eq!(NESTED.queue().inner.pushed(), 200);
        assert_eq!(NESTED.queue().inner.popped(), 200);
    }

    struct BrokenQueue;

    impl QueueProbe for BrokenQueue {
        fn push_from_isr(&self) -> Result<(), NestingFault> {
            Ok(())
        }

        fn pop_and_validate_from_isr(&self) -> Result<bool, NestingFault> {
            Err(NestingFault::SequenceMismatch)
        }
    }

    #[test]
    fn test_assertion_failure_is_latched_and_stops_progress() {
        let harness = NestingHarness::new(BrokenQueue);
        let status = StatusLatch::new();
        harness.setup(&mut MockPort::new(true), &plan()).unwrap();

        harness.on_secondary_tick(&status);
        assert_eq!(
            status.fault(),
            Some(Fault::NestingAssertion(NestingFault::SequenceMismatch))
        );
        for _ in 0..10 {
            harness.on_primary_tick(&status);
            harness.on_secondary_tick(&status);
        }
        assert_eq!(harness.primary_serviced(), 0);
        assert_eq!(harness.secondary_serviced(), 0);
    }
}
