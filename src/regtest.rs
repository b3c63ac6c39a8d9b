//! # Register Check Task
//!
//! Each instance loops loading its register pattern and verifying it.
//! Everything else in the system is allowed (and encouraged) to preempt
//! it in between; if a context switch or nested interrupt fails to save
//! and restore the full register set, the verify pass catches it.
//!
//! ```text
//!   ┌──────┐   load()   ┌────────┐  intact   ┌───────────────┐
//!   │ Load │ ─────────► │ Verify │ ────────► │ counter += 1  │ ──┐
//!   └──────┘            └────────┘           └───────────────┘   │
//!      ▲                    │ corrupted                          │
//!      │                    ▼                                    │
//!      │               ┌────────┐                                │
//!      │               │ Failed │  (latched, permanent)          │
//!      │               └────────┘                                │
//!      └─────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no retry. A corrupted register is a scheduler bug, never a
//! transient condition.

use crate::arch;
use crate::config::{REG_TEST_1_PARAMETER, REG_TEST_2_PARAMETER};
use crate::counter::LivenessCounter;
use crate::error::{Fault, Probe};
use crate::pattern::RegisterPattern;
use crate::status::StatusLatch;

/// Which of the two register check instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegTestId {
    One,
    Two,
}

impl RegTestId {
    /// Parameter the instance is created with; also its pattern seed.
    pub const fn parameter(self) -> u32 {
        match self {
            RegTestId::One => REG_TEST_1_PARAMETER,
            RegTestId::Two => REG_TEST_2_PARAMETER,
        }
    }

    pub const fn probe(self) -> Probe {
        match self {
            RegTestId::One => Probe::RegTest1,
            RegTestId::Two => Probe::RegTest2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            RegTestId::One => "RegTest1",
            RegTestId::Two => "RegTest2",
        }
    }

    pub const fn index(self) -> usize {
        match self {
            RegTestId::One => 0,
            RegTestId::Two => 1,
        }
    }
}

/// State of a register check instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// About to write the pattern.
    Load,
    /// Pattern written; the next step reads it back.
    Verify,
    /// Corruption seen. Terminal.
    Failed,
}

/// One register check instance.
///
/// Owns its pattern; shares only its counter (write side) and the status
/// latch.
pub struct RegisterCheck<'a> {
    id: RegTestId,
    pattern: RegisterPattern,
    counter: &'a LivenessCounter,
    status: &'a StatusLatch,
    state: CheckState,
}

impl<'a> RegisterCheck<'a> {
    pub fn new(id: RegTestId, counter: &'a LivenessCounter, status: &'a StatusLatch) -> Self {
        Self {
            id,
            pattern: RegisterPattern::new(id.parameter()),
            counter,
            status,
            state: CheckState::Load,
        }
    }

    /// Build the instance for a task started with `parameter`.
    ///
    /// A parameter that does not match the instance's own means the
    /// scheduler passed task arguments incorrectly; that is latched and
    /// the instance starts out failed.
    pub fn with_parameter(
        id: RegTestId,
        parameter: usize,
        counter: &'a LivenessCounter,
        status: &'a StatusLatch,
    ) -> Self {
        let mut check = Self::new(id, counter, status);
        if parameter != id.parameter() as usize {
            status.latch(Fault::ParameterMismatch(id.probe()));
            check.state = CheckState::Failed;
        }
        check
    }

    pub fn id(&self) -> RegTestId {
        self.id
    }

    pub fn state(&self) -> CheckState {
        self.state
    }

    /// Working set, for fault injection between `Load` and `Verify`.
    pub fn pattern_mut(&mut self) -> &mut RegisterPattern {
        &mut self.pattern
    }

    /// Advance the state machine by one transition.
    pub fn step(&mut self) -> CheckState {
        self.state = match self.state {
            CheckState::Load => {
                self.pattern.load();
                CheckState::Verify
            }
            CheckState::Verify => {
                let intact =
                    self.pattern.verify() && arch::register_window(self.pattern.seed());
                if intact {
                    self.counter.increment();
                    CheckState::Load
                } else {
                    self.status.latch(Fault::RegisterCorruption(self.id.probe()));
                    CheckState::Failed
                }
            }
            CheckState::Failed => CheckState::Failed,
        };
        self.state
    }

    /// One full `Load -> Verify` pass. False once the instance has failed.
    pub fn cycle(&mut self) -> bool {
        if self.state == CheckState::Load {
            self.step();
        }
        self.step() == CheckState::Load
    }
}
