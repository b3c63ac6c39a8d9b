//! # EqOS Self-Test
//!
//! Scheduler-correctness probes for ARM Cortex-M4 RTOS ports. They run
//! alongside the application and prove, continuously and in the field,
//! that context switches and nested interrupts preserve state.
//!
//! ## Overview
//!
//! Two probe groups, selected at build time:
//!
//! - **Register checks**: two idle-priority tasks load a known pattern
//!   into a working set of machine words (and, on target, into r4–r11),
//!   let themselves be preempted, and verify it. Each clean pass bumps a
//!   liveness counter; a corrupted word latches a fault and freezes the
//!   counter for good.
//! - **Interrupt nesting**: a second hardware timer runs 17 Hz off the
//!   tick rate at a higher interrupt level, so its handler keeps landing
//!   inside the tick handler. Both push and pop sequence-numbered items on
//!   a shared queue; a save/restore bug on nested entry or exit breaks the
//!   sequence.
//!
//! A high-priority supervisory task samples the liveness counters every
//! five seconds and reports a single latched status line.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │           External RTOS (platform::Kernel)             │
//! │   create_task · delay · tick hook · heap introspection │
//! ├────────────────────────────────────────────────────────┤
//! │               Wiring (selftest.rs)                     │
//! │   SELF_TEST · launch() · tick_hook() · secondary ISR   │
//! ├──────────────┬───────────────────┬─────────────────────┤
//! │ Register     │ Nesting harness   │ Supervisory check   │
//! │ checks       │ nesting.rs        │ supervisor.rs       │
//! │ regtest.rs   │ timer.rs queue.rs │                     │
//! │ pattern.rs   │ gate.rs           │                     │
//! ├──────────────┴───────────────────┴─────────────────────┤
//! │   counter.rs · status.rs · error.rs · sync.rs          │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)               │
//! │   r4–r11 pattern window · TIM2 · NVIC priorities       │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: all probe state lives in the `SELF_TEST` static
//! - **Single writer** per liveness counter; the supervisor only reads
//! - **Critical sections** (`critical-section`) guard the queue shared
//!   by the two handlers; nothing blocks in interrupt context

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod counter;
pub mod status;
pub mod pattern;
pub mod regtest;
pub mod gate;
pub mod timer;
pub mod platform;
pub mod queue;
pub mod nesting;
pub mod supervisor;
pub mod selftest;
pub mod arch;
pub mod sync;
