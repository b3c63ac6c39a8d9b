//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2):
//!
//! - the register-file half of the register check, in inline assembly;
//! - a [`TimerPort`] driving TIM2 (STM32F4) as the secondary interrupt
//!   source next to the scheduler's SysTick;
//! - [`tim2_interrupt`], the body of the TIM2 handler. The firmware binds
//!   it from its own vector table, or enables the `default-handler`
//!   feature to have this crate define `DefaultHandler`.
//!
//! ## Interrupt Priorities
//!
//! The NVIC encodes urgency inversely: 0x00 is the most urgent, 0xF0 the
//! least with four implemented priority bits. SysTick sits at the bottom
//! (0xF0) where the scheduler port puts it. Logical level `n` maps to
//! `(15 - n) << 4`, so TIM2 at level 1 lands at 0xE0: above SysTick,
//! inside the range kernel critical sections mask.

use core::arch::asm;
use core::ptr;

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;

use crate::config::SECOND_TIMER_INDEX;
use crate::error::ProbeError;
use crate::platform::TimerPort;
use crate::timer::{InterruptLevel, TimerChannel};

/// Implemented NVIC priority bits (STM32F4).
pub const NVIC_PRIO_BITS: u8 = 4;

/// Map a logical level onto the NVIC priority byte.
pub const fn nvic_priority(level: InterruptLevel) -> u8 {
    let max = (1u8 << NVIC_PRIO_BITS) - 1;
    let level = if level.get() > max { max } else { level.get() };
    (max - level) << (8 - NVIC_PRIO_BITS)
}

// ---------------------------------------------------------------------------
// Register-file check
// ---------------------------------------------------------------------------

/// Load `seed + i` into r4–r11, spin through a preemption window, then
/// compare every register against its expected value.
///
/// r4–r11 are the registers a context switch saves in software (the
/// hardware stacks r0–r3, r12, LR, PC and xPSR); a port that drops or
/// swaps any of them fails here.
pub fn register_window(seed: u32) -> bool {
    let intact: u32;
    // SAFETY: r4–r11 are pushed on entry and popped before the block
    // ends; only the declared r0–r2 and the flags change.
    unsafe {
        asm!(
            "push {{r4-r11}}",
            "mov r4, r0",
            "add r5, r0, #1",
            "add r6, r0, #2",
            "add r7, r0, #3",
            "add r8, r0, #4",
            "add r9, r0, #5",
            "add r10, r0, #6",
            "add r11, r0, #7",
            // Preemption window.
            "movs r1, #64",
            "2:",
            "subs r1, r1, #1",
            "bne 2b",
            // Verify; first mismatch leaves r2 = 0.
            "movs r2, #0",
            "cmp r4, r0",
            "bne 3f",
            "add r1, r0, #1",
            "cmp r5, r1",
            "bne 3f",
            "add r1, r0, #2",
            "cmp r6, r1",
            "bne 3f",
            "add r1, r0, #3",
            "cmp r7, r1",
            "bne 3f",
            "add r1, r0, #4",
            "cmp r8, r1",
            "bne 3f",
            "add r1, r0, #5",
            "cmp r9, r1",
            "bne 3f",
            "add r1, r0, #6",
            "cmp r10, r1",
            "bne 3f",
            "add r1, r0, #7",
            "cmp r11, r1",
            "bne 3f",
            "movs r2, #1",
            "3:",
            "pop {{r4-r11}}",
            in("r0") seed,
            out("r1") _,
            out("r2") intact,
        );
    }
    intact == 1
}

// ---------------------------------------------------------------------------
// TIM2 secondary timer
// ---------------------------------------------------------------------------

/// TIM2 global interrupt on the STM32F4.
const TIM2_IRQ: u16 = 28;

const RCC_APB1ENR: *mut u32 = 0x4002_3840 as *mut u32;
const RCC_APB1ENR_TIM2EN: u32 = 1 << 0;

const TIM2_BASE: usize = 0x4000_0000;
const TIM_CR1: usize = 0x00;
const TIM_DIER: usize = 0x0C;
const TIM_SR: usize = 0x10;
const TIM_EGR: usize = 0x14;
const TIM_PSC: usize = 0x28;
const TIM_ARR: usize = 0x2C;

const TIM_CR1_CEN: u32 = 1 << 0;
const TIM_DIER_UIE: u32 = 1 << 0;
const TIM_SR_UIF: u32 = 1 << 0;
const TIM_EGR_UG: u32 = 1 << 0;

#[derive(Debug, Clone, Copy)]
struct Tim2Interrupt;

// SAFETY: 28 is the TIM2 line in the STM32F4 vector table.
unsafe impl InterruptNumber for Tim2Interrupt {
    fn number(self) -> u16 {
        TIM2_IRQ
    }
}

#[inline]
fn tim2(offset: usize) -> *mut u32 {
    (TIM2_BASE + offset) as *mut u32
}

/// Timer port for STM32F4 parts: SysTick belongs to the scheduler, TIM2
/// is the secondary channel.
pub struct CortexM4Timers {
    nvic: NVIC,
}

impl CortexM4Timers {
    pub fn new(nvic: NVIC) -> Self {
        Self { nvic }
    }
}

impl TimerPort for CortexM4Timers {
    fn channel_available(&self, index: u8) -> bool {
        index == SECOND_TIMER_INDEX
    }

    fn configure(&mut self, channel: &TimerChannel) -> Result<(), ProbeError> {
        if channel.index != SECOND_TIMER_INDEX {
            return Err(ProbeError::ResourceUnavailable {
                channel: channel.index,
            });
        }
        // TIM2 is clocked from APB1 at the core clock with no prescaler,
        // so the divisor is the auto-reload period.
        if channel.divisor == 0 {
            return Err(ProbeError::InvalidTimerConfig("zero divisor"));
        }
        // SAFETY: fixed STM32F4 register addresses; TIM2 is stopped while
        // it is being programmed.
        unsafe {
            let enr = ptr::read_volatile(RCC_APB1ENR);
            ptr::write_volatile(RCC_APB1ENR, enr | RCC_APB1ENR_TIM2EN);

            ptr::write_volatile(tim2(TIM_CR1), 0);
            ptr::write_volatile(tim2(TIM_PSC), 0);
            ptr::write_volatile(tim2(TIM_ARR), channel.divisor - 1);
            ptr::write_volatile(tim2(TIM_EGR), TIM_EGR_UG);
            ptr::write_volatile(tim2(TIM_SR), 0);
            ptr::write_volatile(tim2(TIM_DIER), TIM_DIER_UIE);

            self.nvic.set_priority(Tim2Interrupt, nvic_priority(channel.level));
        }
        Ok(())
    }

    fn enable(&mut self, index: u8) {
        if index != SECOND_TIMER_INDEX {
            return;
        }
        // SAFETY: the handler only touches harness state behind the
        // initialization gate, so unmasking early is harmless.
        unsafe {
            let cr1 = ptr::read_volatile(tim2(TIM_CR1));
            ptr::write_volatile(tim2(TIM_CR1), cr1 | TIM_CR1_CEN);
            NVIC::unmask(Tim2Interrupt);
        }
    }
}

// ---------------------------------------------------------------------------
// Interrupt dispatch
// ---------------------------------------------------------------------------

/// TIM2 interrupt body: acknowledge the update event and run the
/// secondary nesting handler. Call from the firmware's TIM2 vector.
#[inline]
pub fn tim2_interrupt() {
    // SAFETY: TIM2_SR is rc_w0; writing 0 clears UIF, writing 1 to the
    // other bits leaves their flags alone.
    unsafe {
        ptr::write_volatile(tim2(TIM_SR), !TIM_SR_UIF);
    }
    crate::selftest::secondary_timer_isr();
}

/// Device interrupts without a PAC vector table land here. TIM2 goes to
/// the nesting harness; anything else is unexpected and ignored.
#[cfg(feature = "default-handler")]
#[cortex_m_rt::exception]
unsafe fn DefaultHandler(irqn: i16) {
    if irqn == TIM2_IRQ as i16 {
        tim2_interrupt();
    }
}
