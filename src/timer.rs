//! # Timer Channels
//!
//! Describes the two periodic interrupt sources used by the nesting
//! harness and checks the invariants that make nesting happen:
//!
//! - the secondary channel sits at a strictly higher interrupt level than
//!   the tick, so it can interrupt the tick handler;
//! - it stays at or below `MAX_NESTABLE_LEVEL`, so it nests through the
//!   regular interrupt entry/exit path instead of bypassing it;
//! - it runs at a different, non-harmonic frequency, so the two handlers
//!   overlap at every phase over time instead of at a fixed point.

use crate::config::{
    MAX_NESTABLE_LEVEL, SECOND_TIMER_INDEX, SECOND_TIMER_INTERRUPT_LEVEL,
    SECOND_TIMER_OFFSET_HZ, TICK_INTERRUPT_LEVEL,
};
use crate::error::ProbeError;

/// Logical interrupt level. Higher values are more urgent; the arch port
/// maps levels onto hardware priority encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InterruptLevel(u8);

impl InterruptLevel {
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

/// A periodic hardware interrupt source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerChannel {
    /// Hardware channel index. 0 drives the scheduler tick.
    pub index: u8,
    /// Interrupt level of the channel's handler.
    pub level: InterruptLevel,
    /// Target interrupt rate.
    pub frequency_hz: u32,
    /// Clock divisor producing `frequency_hz` from the CPU clock.
    pub divisor: u32,
    /// Whether the channel is firing.
    pub enabled: bool,
}

impl TimerChannel {
    /// Build a disabled channel running at `frequency_hz` off `clock_hz`.
    pub fn new(
        index: u8,
        level: InterruptLevel,
        clock_hz: u32,
        frequency_hz: u32,
    ) -> Result<Self, ProbeError> {
        if frequency_hz == 0 {
            return Err(ProbeError::InvalidTimerConfig("zero frequency"));
        }
        let divisor = clock_hz / frequency_hz;
        if divisor == 0 {
            return Err(ProbeError::InvalidTimerConfig("frequency above clock"));
        }
        Ok(Self {
            index,
            level,
            frequency_hz,
            divisor,
            enabled: false,
        })
    }
}

/// The pair of channels the nesting harness runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestingPlan {
    pub primary: TimerChannel,
    pub secondary: TimerChannel,
}

impl NestingPlan {
    /// Plan for the configured tick and offset.
    pub fn for_clock(clock_hz: u32, tick_hz: u32) -> Result<Self, ProbeError> {
        Self::new(
            clock_hz,
            tick_hz,
            SECOND_TIMER_OFFSET_HZ,
            TICK_INTERRUPT_LEVEL,
            SECOND_TIMER_INTERRUPT_LEVEL,
        )
    }

    /// Build and validate a plan.
    pub fn new(
        clock_hz: u32,
        tick_hz: u32,
        offset_hz: u32,
        tick_level: InterruptLevel,
        secondary_level: InterruptLevel,
    ) -> Result<Self, ProbeError> {
        if offset_hz == 0 {
            return Err(ProbeError::InvalidTimerConfig("zero frequency offset"));
        }
        let secondary_hz = tick_hz
            .checked_add(offset_hz)
            .ok_or(ProbeError::InvalidTimerConfig("frequency overflow"))?;
        if tick_hz == 0 || secondary_hz % tick_hz == 0 {
            return Err(ProbeError::InvalidTimerConfig("harmonic frequencies"));
        }
        if secondary_level <= tick_level {
            return Err(ProbeError::InvalidTimerConfig(
                "secondary level not above tick level",
            ));
        }
        if secondary_level > MAX_NESTABLE_LEVEL {
            return Err(ProbeError::InvalidTimerConfig(
                "secondary level above nestable range",
            ));
        }

        let primary = TimerChannel::new(0, tick_level, clock_hz, tick_hz)?;
        let secondary = TimerChannel::new(SECOND_TIMER_INDEX, secondary_level, clock_hz, secondary_hz)?;
        Ok(Self { primary, secondary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};

    #[test]
    fn test_default_plan() {
        let plan = NestingPlan::for_clock(SYSTEM_CLOCK_HZ, TICK_HZ).unwrap();
        assert_eq!(plan.primary.frequency_hz, TICK_HZ);
        assert_eq!(plan.secondary.frequency_hz, TICK_HZ + 17);
        assert_eq!(
            plan.secondary.frequency_hz - plan.primary.frequency_hz,
            SECOND_TIMER_OFFSET_HZ
        );
        assert_eq!(plan.secondary.divisor, SYSTEM_CLOCK_HZ / (TICK_HZ + 17));
        assert_eq!(plan.primary.divisor, SYSTEM_CLOCK_HZ / TICK_HZ);
        assert!(plan.secondary.level > plan.primary.level);
        assert!(plan.secondary.level <= MAX_NESTABLE_LEVEL);
        assert_eq!(plan.secondary.index, SECOND_TIMER_INDEX);
        assert!(!plan.secondary.enabled);
    }

    #[test]
    fn test_offset_holds_for_other_tick_rates() {
        for tick_hz in [100, 250, 500, 1000] {
            let plan = NestingPlan::for_clock(SYSTEM_CLOCK_HZ, tick_hz).unwrap();
            assert_eq!(plan.secondary.frequency_hz, tick_hz + SECOND_TIMER_OFFSET_HZ);
            assert!(plan.secondary.level > plan.primary.level);
        }
    }

    #[test]
    fn test_zero_offset_rejected() {
        let err = NestingPlan::new(
            SYSTEM_CLOCK_HZ,
            TICK_HZ,
            0,
            TICK_INTERRUPT_LEVEL,
            SECOND_TIMER_INTERRUPT_LEVEL,
        );
        assert!(matches!(err, Err(ProbeError::InvalidTimerConfig(_))));
    }

    #[test]
    fn test_harmonic_offset_rejected() {
        let err = NestingPlan::new(
            SYSTEM_CLOCK_HZ,
            100,
            100,
            TICK_INTERRUPT_LEVEL,
            SECOND_TIMER_INTERRUPT_LEVEL,
        );
        assert!(matches!(err, Err(ProbeError::InvalidTimerConfig(_))));
    }

    #[test]
    fn test_level_ordering_enforced() {
        let same = NestingPlan::new(
            SYSTEM_CLOCK_HZ,
            TICK_HZ,
            17,
            InterruptLevel::new(2),
            InterruptLevel::new(2),
        );
        assert!(matches!(same, Err(ProbeError::InvalidTimerConfig(_))));

        let too_high = NestingPlan::new(
            SYSTEM_CLOCK_HZ,
            TICK_HZ,
            17,
            TICK_INTERRUPT_LEVEL,
            InterruptLevel::new(MAX_NESTABLE_LEVEL.get() + 1),
        );
        assert!(matches!(too_high, Err(ProbeError::InvalidTimerConfig(_))));
    }

    #[test]
    fn test_frequency_above_clock_rejected() {
        let err = NestingPlan::new(
            1000,
            TICK_HZ,
            17,
            TICK_INTERRUPT_LEVEL,
            SECOND_TIMER_INTERRUPT_LEVEL,
        );
        assert!(matches!(err, Err(ProbeError::InvalidTimerConfig(_))));
    }
}
