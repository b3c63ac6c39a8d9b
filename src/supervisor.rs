//! # Supervisory Check
//!
//! Wakes every few seconds at high priority, samples every watched
//! liveness counter and requires each to have moved since the last
//! sample. The first counter found standing still is latched as a stall;
//! the latch is never cleared by a later good cycle.
//!
//! Each cycle emits one status line plus tick and heap diagnostics. The
//! diagnostics are informational and never affect the verdict.

use core::fmt;

use crate::counter::LivenessCounter;
use crate::error::{Fault, Probe};
use crate::platform::Kernel;
use crate::status::{StatusLatch, StatusMessage};

/// Kernel introspection attached to each report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Diagnostics {
    pub tick_count: u64,
    pub free_heap: usize,
    pub min_free_heap: usize,
}

impl Diagnostics {
    pub fn sample<K: Kernel>() -> Self {
        Self {
            tick_count: K::tick_count(),
            free_heap: K::free_heap(),
            min_free_heap: K::min_free_heap(),
        }
    }
}

/// Output of one supervisory cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub status: StatusMessage,
    pub diagnostics: Diagnostics,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - tick count {} - free heap {} - min free heap {}",
            self.status,
            self.diagnostics.tick_count,
            self.diagnostics.free_heap,
            self.diagnostics.min_free_heap
        )
    }
}

struct Watch<'a> {
    probe: Probe,
    counter: &'a LivenessCounter,
    last: u32,
}

/// Samples `N` liveness counters against the previous cycle.
pub struct Supervisor<'a, const N: usize> {
    watches: [Watch<'a>; N],
    status: &'a StatusLatch,
    cycles: u32,
}

impl<'a, const N: usize> Supervisor<'a, N> {
    /// Start supervising. The first snapshot is taken now.
    pub fn new(watched: [(Probe, &'a LivenessCounter); N], status: &'a StatusLatch) -> Self {
        Self {
            watches: watched.map(|(probe, counter)| Watch {
                probe,
                counter,
                last: counter.value(),
            }),
            status,
            cycles: 0,
        }
    }

    /// Run one cycle: compare counters, latch the first stall, report.
    pub fn check(&mut self, diagnostics: Diagnostics) -> Report {
        for watch in self.watches.iter_mut() {
            let now = watch.counter.value();
            if !LivenessCounter::progressed(watch.last, now) {
                self.status.latch(Fault::Stall { probe: watch.probe });
            }
            watch.last = now;
        }
        self.cycles = self.cycles.wrapping_add(1);

        let report = Report {
            status: self.status.message(),
            diagnostics,
        };
        match report.status {
            StatusMessage::NoErrors => log::info!("{}", report),
            StatusMessage::Failed(_) => log::error!("{}", report),
        }
        report
    }

    /// Completed cycles.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }
}
