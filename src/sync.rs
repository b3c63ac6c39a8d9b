//! # Synchronization Primitives
//!
//! Interrupt-safe critical section for state shared between the two
//! nesting handlers. On the Cortex-M4 the `critical-section` provider is
//! `cortex-m`'s single-core implementation (interrupts masked for the
//! duration); hosted test builds use the `std` provider.
//!
//! Never a task-level mutex: the callers are interrupt handlers and must
//! not block.

pub use ::critical_section::{CriticalSection, Mutex};

/// Execute a closure within a critical section.
///
/// # Usage
/// ```ignore
/// sync::critical_section(|cs| {
///     // Access shared state safely
/// });
/// ```
///
/// Keep critical sections as short as possible: while one is held the
/// secondary timer cannot nest into the tick handler, which is exactly
/// the window the harness wants open.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    ::critical_section::with(f)
}
