//! # Platform Boundary
//!
//! The probes test a scheduler and interrupt layer they do not own. These
//! traits are everything they consume from it:
//!
//! - [`Kernel`]: task creation, delays and introspection from the RTOS.
//! - [`TimerPort`]: the hardware timers behind the two interrupt sources.
//! - [`QueueProbe`]: the queue-test state the nesting handlers exercise.
//!
//! `Kernel` uses associated functions rather than methods so that task
//! entry points can be plain `fn(usize) -> !` items generic over the
//! kernel, with no captured state.

use crate::config;
use crate::error::{NestingFault, ProbeError};
use crate::timer::TimerChannel;

/// Entry point of a task. The argument is the task parameter.
pub type TaskEntry = fn(usize) -> !;

/// Scheduler services used by the probes.
///
/// The associated constants default to the values in [`config`]; a port
/// overrides only what its scheduler configures differently.
pub trait Kernel: 'static {
    /// Tick rate the scheduler runs at.
    const TICK_HZ: u32 = config::TICK_HZ;
    /// CPU clock feeding the timers.
    const CPU_CLOCK_HZ: u32 = config::SYSTEM_CLOCK_HZ;
    /// Number of task priority levels.
    const MAX_PRIORITIES: u8 = config::MAX_PRIORITIES;
    /// Priority of the idle task.
    const IDLE_PRIORITY: u8 = config::IDLE_PRIORITY;

    /// Create a task that starts at `entry(arg)`.
    fn create_task(
        entry: TaskEntry,
        name: &'static str,
        priority: u8,
        arg: usize,
    ) -> Result<(), ProbeError>;

    /// Hand the CPU to the scheduler. Does not return.
    fn start_scheduler() -> !;

    /// Block the calling task for `ticks` ticks.
    fn delay(ticks: u32);

    /// Offer the CPU to other ready tasks of the same priority.
    fn yield_now();

    /// Ticks since the scheduler started.
    fn tick_count() -> u64;

    /// Bytes currently free in the kernel heap.
    fn free_heap() -> usize;

    /// Lowest `free_heap` seen since start.
    fn min_free_heap() -> usize;
}

/// Hardware timers available to the nesting harness.
pub trait TimerPort {
    /// True if `index` names a distinct interrupt source the harness may
    /// drive.
    fn channel_available(&self, index: u8) -> bool;

    /// Program rate and interrupt level of `channel`. Leaves it disabled.
    fn configure(&mut self, channel: &TimerChannel) -> Result<(), ProbeError>;

    /// Start `index` firing.
    fn enable(&mut self, index: u8);
}

/// Queue-test state touched from interrupt context.
///
/// Both operations run inside interrupt handlers and must never block.
pub trait QueueProbe: Sync {
    /// Push one test item.
    fn push_from_isr(&self) -> Result<(), NestingFault>;

    /// Pop one item and check it. `Ok(false)` means the queue was empty,
    /// which is not an error: the other handler may have taken the item.
    fn pop_and_validate_from_isr(&self) -> Result<bool, NestingFault>;
}
