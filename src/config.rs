//! # Ring OS Configuration
//!
//! Compile-time constants governing the kernel, plus the runtime
//! [`KernelConfig`] that selects which scheduling and semaphore variant a
//! firmware image runs with. All limits are fixed at compile time; the kernel
//! never allocates.

/// Number of main threads registered by the firmware image. This sizes the
/// global TCB ring and its stack arena. Each thread costs `STACK_WORDS * 4`
/// bytes of RAM.
pub const NUM_THREADS: usize = 8;

/// Per-thread stack size in 32-bit words. Must hold the deepest call chain
/// plus the 16-word saved register image.
pub const STACK_WORDS: usize = 100;

/// Words occupied by a saved register image: R4–R11 pushed by the
/// trampoline, then R0–R3, R12, LR, PC and xPSR stacked by the hardware.
pub const FRAME_WORDS: usize = 16;

/// Size of the periodic event table.
pub const NUM_PERIODIC: usize = 2;

/// Size of the semaphore pool. The two highest slots are reserved for the
/// kernel FIFO and mailbox; application code may declare the rest.
pub const MAX_SEMAPHORES: usize = 16;

/// Semaphore slots available to application code.
pub const USER_SEMAPHORES: usize = MAX_SEMAPHORES - 2;

/// Pool slot gating the kernel FIFO's occupancy.
pub const FIFO_SEMAPHORE: u8 = (MAX_SEMAPHORES - 1) as u8;

/// Pool slot gating the kernel mailbox.
pub const MAILBOX_SEMAPHORE: u8 = (MAX_SEMAPHORES - 2) as u8;

/// Capacity of the kernel FIFO in words.
pub const FIFO_SIZE: usize = 10;

/// Frequency of the time base that decrements sleep counters and dispatches
/// periodic events, in Hz. One time-base interrupt is one kernel tick.
pub const TICK_HZ: u32 = 1000;

/// NVIC priority of the time-base timer (0 highest, 7 lowest).
pub const TIME_BASE_PRIORITY: u8 = 6;

/// SysTick priority. Lowest usable level so the slice switch never
/// preempts a device ISR.
pub const SYSTICK_PRIORITY: u8 = 7;

/// System clock frequency in Hz (TM4C123 precision internal oscillator).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// SysTick is a 24-bit down-counter: a slice may span at most this many
/// core-clock cycles.
pub const MAX_TICK_PERIOD: u32 = 1 << 24;

/// Warm-up lead, in ticks, before the first periodic dispatch when the
/// priority preset is used. Lets every main thread run once before event
/// signalling starts.
pub const PERIODIC_LEAD_TICKS: u32 = 10;

// ---------------------------------------------------------------------------
// Runtime variant selection
// ---------------------------------------------------------------------------

/// How the scheduler picks the next thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// Advance to `next` unconditionally.
    RoundRobin,
    /// Advance to `next`, skipping blocked and sleeping threads.
    RoundRobinSkip,
    /// Lowest priority value among runnable threads, round-robin within a band.
    Priority,
}

/// How `wait` behaves when no signal is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemaphoreMode {
    /// Busy-loop with interrupts periodically re-enabled.
    Spin,
    /// Record the caller as blocked and suspend it.
    Blocking,
}

/// Variant selection, fixed once before the scheduler starts.
///
/// Built only from the presets below. Plain round-robin would hand the CPU
/// back to a thread blocked on a semaphore, so the policy and semaphore mode
/// are never set independently; only the event knobs can be adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    policy: SchedulePolicy,
    semaphores: SemaphoreMode,
    periodic_lead: u32,
    suspend_on_event: bool,
}

impl KernelConfig {
    /// Plain round-robin with spin-lock semaphores.
    pub const SPIN: Self = Self {
        policy: SchedulePolicy::RoundRobin,
        semaphores: SemaphoreMode::Spin,
        periodic_lead: 0,
        suspend_on_event: false,
    };

    /// Round-robin that skips blocked/sleeping threads, blocking semaphores.
    pub const BLOCKING: Self = Self {
        policy: SchedulePolicy::RoundRobinSkip,
        semaphores: SemaphoreMode::Blocking,
        periodic_lead: 0,
        suspend_on_event: false,
    };

    /// Static priorities, blocking semaphores, event-driven dispatch.
    pub const PRIORITY: Self = Self {
        policy: SchedulePolicy::Priority,
        semaphores: SemaphoreMode::Blocking,
        periodic_lead: PERIODIC_LEAD_TICKS,
        suspend_on_event: true,
    };

    #[inline]
    pub const fn policy(&self) -> SchedulePolicy {
        self.policy
    }

    #[inline]
    pub const fn semaphores(&self) -> SemaphoreMode {
        self.semaphores
    }

    /// Ticks of negative lead time before periodic counters start advancing.
    #[inline]
    pub const fn periodic_lead(&self) -> u32 {
        self.periodic_lead
    }

    /// Whether a firing periodic event forces an immediate reschedule.
    #[inline]
    pub const fn suspend_on_event(&self) -> bool {
        self.suspend_on_event
    }

    pub const fn with_periodic_lead(mut self, ticks: u32) -> Self {
        self.periodic_lead = ticks;
        self
    }

    pub const fn with_suspend_on_event(mut self, suspend: bool) -> Self {
        self.suspend_on_event = suspend;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::PRIORITY
    }
}
