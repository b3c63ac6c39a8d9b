//! # Self-Test Wiring
//!
//! Process-wide probe state and the glue between the probes and the
//! external scheduler: task entry points, the tick hook and the
//! secondary timer ISR.
//!
//! ## Startup Sequence
//!
//! ```text
//! application main()
//!   └─► selftest::launch::<Kernel, Timers>(&mut timers)
//!         ├─► RegisterChecks:   create RegTest1, RegTest2 (idle priority)
//!         ├─► InterruptNesting: plan timers, configure secondary, open gate
//!         ├─► create Check task (MAX_PRIORITIES - 2)
//!         └─► Kernel::start_scheduler()          ← does not return
//!
//! scheduler tick hook ──► selftest::tick_hook()
//! secondary timer IRQ ──► selftest::secondary_timer_isr()
//! ```

use crate::config::{
    ProbeSet, CHECK_PERIOD_MS, INT_QUEUE_LENGTH, PROBE_SET, REG_TEST_1_PARAMETER,
    REG_TEST_2_PARAMETER,
};
use crate::counter::LivenessCounter;
use crate::error::{Probe, ProbeError};
use crate::nesting::NestingHarness;
use crate::platform::{Kernel, TimerPort};
use crate::queue::SequenceQueue;
use crate::regtest::{RegTestId, RegisterCheck};
use crate::status::StatusLatch;
use crate::supervisor::{Diagnostics, Supervisor};
use crate::timer::NestingPlan;

/// Harness type used by the self-test.
pub type IntQueueHarness = NestingHarness<SequenceQueue<INT_QUEUE_LENGTH>>;

/// All state shared between the probes.
///
/// Each counter has exactly one writer (its task or handler); the
/// supervisory check only reads. Lives for the whole process.
pub struct SelfTest {
    status: StatusLatch,
    reg_test_counters: [LivenessCounter; 2],
    harness: IntQueueHarness,
}

impl SelfTest {
    pub const fn new() -> Self {
        Self {
            status: StatusLatch::new(),
            reg_test_counters: [LivenessCounter::new(), LivenessCounter::new()],
            harness: NestingHarness::new(SequenceQueue::new()),
        }
    }

    pub fn status(&self) -> &StatusLatch {
        &self.status
    }

    pub fn reg_test_counter(&self, id: RegTestId) -> &LivenessCounter {
        &self.reg_test_counters[id.index()]
    }

    pub fn harness(&self) -> &IntQueueHarness {
        &self.harness
    }

    /// Register check instance bound to this state.
    pub fn register_check(&self, id: RegTestId, parameter: usize) -> RegisterCheck<'_> {
        RegisterCheck::with_parameter(id, parameter, self.reg_test_counter(id), &self.status)
    }

    /// Supervisor watching both register check counters.
    pub fn reg_test_supervisor(&self) -> Supervisor<'_, 2> {
        Supervisor::new(
            [
                (Probe::RegTest1, self.reg_test_counter(RegTestId::One)),
                (Probe::RegTest2, self.reg_test_counter(RegTestId::Two)),
            ],
            &self.status,
        )
    }

    /// Supervisor watching the nesting harness.
    pub fn nesting_supervisor(&self) -> Supervisor<'_, 1> {
        Supervisor::new([(Probe::IntQueue, self.harness.liveness())], &self.status)
    }
}

impl Default for SelfTest {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide self-test state.
pub static SELF_TEST: SelfTest = SelfTest::new();

// ---------------------------------------------------------------------------
// Interrupt glue
// ---------------------------------------------------------------------------

/// Call from the scheduler's tick hook (primary timer interrupt).
#[inline]
pub fn tick_hook() {
    SELF_TEST.harness.on_primary_tick(&SELF_TEST.status);
}

/// Call from the secondary timer's interrupt handler.
#[inline]
pub fn secondary_timer_isr() {
    SELF_TEST.harness.on_secondary_tick(&SELF_TEST.status);
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Create the supervisory check, then the tasks for `probe_set` and, for
/// the nesting probes, the secondary timer.
///
/// The check task comes first: if a probe cannot be brought up, its
/// counter never moves and the supervisor reports the stall instead of
/// "No errors".
pub fn create_probes<K: Kernel, P: TimerPort>(
    probe_set: ProbeSet,
    port: &mut P,
) -> Result<(), ProbeError> {
    K::create_task(
        check_task::<K>,
        "Check",
        check_task_priority::<K>(),
        probe_set_arg(probe_set),
    )?;

    match probe_set {
        ProbeSet::RegisterChecks => {
            K::create_task(
                reg_test_1_task::<K>,
                RegTestId::One.name(),
                K::IDLE_PRIORITY,
                REG_TEST_1_PARAMETER as usize,
            )?;
            K::create_task(
                reg_test_2_task::<K>,
                RegTestId::Two.name(),
                K::IDLE_PRIORITY,
                REG_TEST_2_PARAMETER as usize,
            )?;
        }
        ProbeSet::InterruptNesting => {
            let plan = NestingPlan::for_clock(K::CPU_CLOCK_HZ, K::TICK_HZ)?;
            SELF_TEST.harness.setup(port, &plan)?;
        }
    }
    Ok(())
}

/// Create the probes selected at build time and start the scheduler.
/// Does not return.
pub fn launch<K: Kernel, P: TimerPort>(port: &mut P) -> ! {
    if let Err(err) = create_probes::<K, P>(PROBE_SET, port) {
        log::error!("self-test setup failed: {}", err);
    }
    K::start_scheduler()
}

/// High enough to preempt everything but the timer service.
pub fn check_task_priority<K: Kernel>() -> u8 {
    K::MAX_PRIORITIES.saturating_sub(2)
}

/// Supervisory period converted to the kernel's ticks.
pub fn check_period_ticks<K: Kernel>() -> u32 {
    let ticks = (u64::from(CHECK_PERIOD_MS) * u64::from(K::TICK_HZ) / 1000).max(1);
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

fn probe_set_arg(probe_set: ProbeSet) -> usize {
    match probe_set {
        ProbeSet::RegisterChecks => 0,
        ProbeSet::InterruptNesting => 1,
    }
}

fn probe_set_from_arg(arg: usize) -> ProbeSet {
    if arg == 1 {
        ProbeSet::InterruptNesting
    } else {
        ProbeSet::RegisterChecks
    }
}

// ---------------------------------------------------------------------------
// Task entry points
// ---------------------------------------------------------------------------

fn reg_test_1_task<K: Kernel>(arg: usize) -> ! {
    run_register_check::<K>(RegTestId::One, arg)
}

fn reg_test_2_task<K: Kernel>(arg: usize) -> ! {
    run_register_check::<K>(RegTestId::Two, arg)
}

fn run_register_check<K: Kernel>(id: RegTestId, arg: usize) -> ! {
    let mut check = SELF_TEST.register_check(id, arg);
    while check.cycle() {
        K::yield_now();
    }
    // Failed: the counter stays frozen for the supervisor to see. Park
    // instead of spinning.
    loop {
        K::delay(check_period_ticks::<K>());
    }
}

fn check_task<K: Kernel>(arg: usize) -> ! {
    match probe_set_from_arg(arg) {
        ProbeSet::RegisterChecks => supervise::<K, 2>(SELF_TEST.reg_test_supervisor()),
        ProbeSet::InterruptNesting => supervise::<K, 1>(SELF_TEST.nesting_supervisor()),
    }
}

fn supervise<K: Kernel, const N: usize>(mut supervisor: Supervisor<'static, N>) -> ! {
    let period = check_period_ticks::<K>();
    loop {
        K::delay(period);
        supervisor.check(Diagnostics::sample::<K>());
    }
}
