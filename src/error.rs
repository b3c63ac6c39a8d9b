//! # Probe Errors
//!
//! Two layers: [`Fault`] is a detected correctness failure and is latched
//! into the status for the life of the process; [`ProbeError`] is what
//! fallible setup code returns.

use core::fmt;

use thiserror::Error;

/// Identifies a probe whose liveness is supervised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    RegTest1,
    RegTest2,
    IntQueue,
}

impl Probe {
    /// The primitive failure suspected when this probe stops making
    /// progress.
    pub const fn suspect(self) -> &'static str {
        match self {
            Probe::RegTest1 | Probe::RegTest2 => "context switch register corruption",
            Probe::IntQueue => "nested interrupt entry/exit",
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Probe::RegTest1 => "RegTest1",
            Probe::RegTest2 => "RegTest2",
            Probe::IntQueue => "IntQueue",
        })
    }
}

/// Inconsistency observed by the nesting handlers in the queue-test state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NestingFault {
    /// An item came out of the queue out of sequence.
    #[error("sequence mismatch")]
    SequenceMismatch,
    /// A push found the queue full; the handlers never leave more than
    /// one item each in flight, so a full queue means lost pops.
    #[error("queue overflow")]
    Overflow,
}

/// A correctness failure. Always fatal, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    /// The register pattern did not survive a verify pass.
    #[error("Error: {0} register corruption")]
    RegisterCorruption(Probe),
    /// A register check task was started with the wrong parameter.
    #[error("Error: {0} task parameter mismatch")]
    ParameterMismatch(Probe),
    /// A nesting handler found the queue-test state inconsistent.
    #[error("Error: IntQueue nesting assertion ({0})")]
    NestingAssertion(NestingFault),
    /// A liveness counter stopped advancing between two supervisory
    /// samples.
    #[error("Error: {probe} stalled (suspect {})", .probe.suspect())]
    Stall { probe: Probe },
}

/// Errors returned by probe setup.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Fault(#[from] Fault),
    /// The platform has no usable secondary timer. Not a failure; the
    /// nesting harness disables itself.
    #[error("timer channel {channel} unavailable")]
    ResourceUnavailable { channel: u8 },
    /// The nesting plan violates a timer invariant.
    #[error("invalid timer configuration: {0}")]
    InvalidTimerConfig(&'static str),
    /// The scheduler refused to create a task.
    #[error("failed to create task {0}")]
    TaskCreation(&'static str),
}
