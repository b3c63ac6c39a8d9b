//! # Status Latch
//!
//! The single user-visible verdict of the self-test. Starts as
//! "No errors"; the first fault to arrive is latched and never cleared.
//! Writers may be tasks or interrupt handlers, so the latch is one
//! atomic word.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Fault, NestingFault, Probe};

/// Code meaning no fault has been latched.
const NO_FAULT: u32 = 0;

/// Latched status shared by every probe.
#[derive(Debug)]
pub struct StatusLatch {
    code: AtomicU32,
}

impl StatusLatch {
    pub const fn new() -> Self {
        Self {
            code: AtomicU32::new(NO_FAULT),
        }
    }

    /// Latch `fault` unless a fault is already latched.
    ///
    /// Returns true if this call set the status.
    pub fn latch(&self, fault: Fault) -> bool {
        let latched = self
            .code
            .compare_exchange(NO_FAULT, encode(fault), Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        // Reached from interrupt context: the installed logger must not
        // block or take locks a task may hold.
        if latched {
            log::error!("{}", fault);
        }
        latched
    }

    /// The latched fault, if any.
    pub fn fault(&self) -> Option<Fault> {
        decode(self.code.load(Ordering::Acquire))
    }

    pub fn is_ok(&self) -> bool {
        self.fault().is_none()
    }

    pub fn message(&self) -> StatusMessage {
        match self.fault() {
            Some(fault) => StatusMessage::Failed(fault),
            None => StatusMessage::NoErrors,
        }
    }
}

impl Default for StatusLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// What the supervisory check reports each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMessage {
    NoErrors,
    Failed(Fault),
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::NoErrors => f.write_str("No errors"),
            StatusMessage::Failed(fault) => fmt::Display::fmt(fault, f),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding: bits [15:8] fault kind, bits [7:0] payload
// ---------------------------------------------------------------------------

const KIND_REGISTER: u32 = 1;
const KIND_PARAMETER: u32 = 2;
const KIND_NESTING: u32 = 3;
const KIND_STALL: u32 = 4;

fn encode(fault: Fault) -> u32 {
    let (kind, payload) = match fault {
        Fault::RegisterCorruption(probe) => (KIND_REGISTER, probe_code(probe)),
        Fault::ParameterMismatch(probe) => (KIND_PARAMETER, probe_code(probe)),
        Fault::NestingAssertion(NestingFault::SequenceMismatch) => (KIND_NESTING, 0),
        Fault::NestingAssertion(NestingFault::Overflow) => (KIND_NESTING, 1),
        Fault::Stall { probe } => (KIND_STALL, probe_code(probe)),
    };
    (kind << 8) | payload
}

fn decode(code: u32) -> Option<Fault> {
    let payload = code & 0xFF;
    match code >> 8 {
        KIND_REGISTER => Some(Fault::RegisterCorruption(probe_from(payload)?)),
        KIND_PARAMETER => Some(Fault::ParameterMismatch(probe_from(payload)?)),
        KIND_NESTING => Some(Fault::NestingAssertion(if payload == 0 {
            NestingFault::SequenceMismatch
        } else {
            NestingFault::Overflow
        })),
        KIND_STALL => Some(Fault::Stall {
            probe: probe_from(payload)?,
        }),
        _ => None,
    }
}

fn probe_code(probe: Probe) -> u32 {
    match probe {
        Probe::RegTest1 => 0,
        Probe::RegTest2 => 1,
        Probe::IntQueue => 2,
    }
}

fn probe_from(code: u32) -> Option<Probe> {
    match code {
        0 => Some(Probe::RegTest1),
        1 => Some(Probe::RegTest2),
        2 => Some(Probe::IntQueue),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status() {
        let status = StatusLatch::new();
        assert!(status.is_ok());
        assert_eq!(status.message(), StatusMessage::NoErrors);
        assert_eq!(status.message().to_string(), "No errors");
    }

    #[test]
    fn test_first_fault_wins() {
        let status = StatusLatch::new();
        assert!(status.latch(Fault::RegisterCorruption(Probe::RegTest2)));
        assert!(!status.latch(Fault::Stall { probe: Probe::RegTest1 }));
        assert_eq!(
            status.fault(),
            Some(Fault::RegisterCorruption(Probe::RegTest2))
        );
        assert_eq!(
            status.message().to_string(),
            "Error: RegTest2 register corruption"
        );
    }

    #[test]
    fn test_every_fault_survives_the_latch() {
        let faults = [
            Fault::RegisterCorruption(Probe::RegTest1),
            Fault::ParameterMismatch(Probe::RegTest2),
            Fault::NestingAssertion(NestingFault::SequenceMismatch),
            Fault::NestingAssertion(NestingFault::Overflow),
            Fault::Stall { probe: Probe::IntQueue },
        ];
        for fault in faults {
            let status = StatusLatch::new();
            status.latch(fault);
            assert_eq!(status.fault(), Some(fault));
        }
    }
}
