//! # Self-Test Configuration
//!
//! Compile-time constants governing the self-test probes.
//! All limits are fixed at compile time and nothing is allocated.

use crate::timer::InterruptLevel;

/// Default scheduler tick frequency in Hz (`Kernel::TICK_HZ`). The
/// primary timer channel runs at this rate and drives the tick.
pub const TICK_HZ: u32 = 1000;

/// Default CPU clock in Hz (`Kernel::CPU_CLOCK_HZ`): STM32F4 on the
/// 16 MHz HSI.
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Default number of task priority levels (`Kernel::MAX_PRIORITIES`).
pub const MAX_PRIORITIES: u8 = 8;

/// Default idle task priority (`Kernel::IDLE_PRIORITY`). The register
/// checks run here so that everything else may preempt them.
pub const IDLE_PRIORITY: u8 = 0;

/// Index of the timer channel used as the secondary interrupt source.
/// Channel 0 drives the scheduler tick.
pub const SECOND_TIMER_INDEX: u8 = 1;

/// Frequency offset of the secondary timer relative to `TICK_HZ`.
///
/// Any small non-zero offset that keeps the secondary rate from being a
/// multiple of the tick rate works; the overlap of the two handlers then
/// drifts through every phase.
pub const SECOND_TIMER_OFFSET_HZ: u32 = 17;

/// Interrupt level of the tick interrupt (lowest).
pub const TICK_INTERRUPT_LEVEL: InterruptLevel = InterruptLevel::new(0);

/// Interrupt level of the secondary timer. Must be strictly above
/// `TICK_INTERRUPT_LEVEL` so that it nests into the tick handler.
pub const SECOND_TIMER_INTERRUPT_LEVEL: InterruptLevel = InterruptLevel::new(1);

/// Highest level an interrupt may have and still be masked by kernel
/// critical sections. Handlers above this level are never nested in a
/// controlled way, so the secondary timer must stay at or below it.
pub const MAX_NESTABLE_LEVEL: InterruptLevel = InterruptLevel::new(10);

/// Period of the supervisory check in milliseconds. Converted to ticks
/// with the kernel's tick rate.
pub const CHECK_PERIOD_MS: u32 = 5000;

/// Parameter passed to the first register check task. Also seeds its
/// pattern.
pub const REG_TEST_1_PARAMETER: u32 = 0x1234_5678;

/// Parameter passed to the second register check task.
pub const REG_TEST_2_PARAMETER: u32 = 0x8765_4321;

/// Words in a register pattern: one per callee-saved core register
/// (r4–r11) on the Cortex-M4.
pub const PATTERN_WORDS: usize = 8;

/// Capacity of the queue exercised by the nesting handlers.
pub const INT_QUEUE_LENGTH: usize = 8;

/// Which group of probes a build runs.
///
/// The interrupt-nesting probes keep the tick handler busy with queue
/// traffic and disturb the timing of everything else, so a build runs
/// one group or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeSet {
    /// Both register check tasks plus the supervisory check.
    RegisterChecks,
    /// The dual-timer nesting harness plus the supervisory check.
    InterruptNesting,
}

/// Probe group selected by the `int-queue-tests` cargo feature.
pub const PROBE_SET: ProbeSet = if cfg!(feature = "int-queue-tests") {
    ProbeSet::InterruptNesting
} else {
    ProbeSet::RegisterChecks
};
