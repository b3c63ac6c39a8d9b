//! # Initialization Gate
//!
//! Set-once flag telling the nesting handlers that the state they feed
//! has been constructed. Interrupts fire from the moment the timers are
//! enabled, which can be before setup finishes; until the gate opens the
//! handlers do nothing.

use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub struct InitializationGate {
    open: AtomicBool,
}

impl InitializationGate {
    pub const fn new() -> Self {
        Self {
            open: AtomicBool::new(false),
        }
    }

    /// Open the gate. Everything written before this call is visible to
    /// a handler that observes the gate open.
    #[inline]
    pub fn open(&self) {
        self.open.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl Default for InitializationGate {
    fn default() -> Self {
        Self::new()
    }
}
