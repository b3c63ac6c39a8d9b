//! # Architecture Abstraction Layer
//!
//! Hardware-specific parts of the probes. Currently implements the
//! Cortex-M4 port; hosted builds get portable stand-ins.

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use cortex_m4::register_window;

/// Register-file check for targets without an assembly port.
///
/// Hosted builds have no register set to pin; the volatile working set
/// in [`crate::pattern`] carries the check alone.
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
#[inline]
pub fn register_window(_seed: u32) -> bool {
    true
}
