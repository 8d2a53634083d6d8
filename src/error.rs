//! # Kernel Errors
//!
//! Setup and channel failures reported through `Result`. Logic defects in the
//! kernel's own bookkeeping are not represented here; they panic.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A thread slot was handed no entry function. Nothing was registered.
    NullEntry { slot: usize },
    /// The thread ring has already been built.
    AlreadyRegistered,
    /// An operation needing the thread ring ran before registration.
    NotRegistered,
    /// Tick period outside `1..=MAX_TICK_PERIOD` core-clock cycles.
    InvalidTickPeriod(u32),
    /// Every periodic event slot is taken.
    PeriodicTableFull,
    /// A periodic event was registered with a period of zero ticks.
    ZeroPeriod,
    /// Semaphore identifier outside the pool, or reserved for the kernel.
    InvalidSemaphore(u8),
    /// FIFO put on a full buffer; the datum was dropped.
    FifoFull,
    /// Edge trigger restarted before it was configured.
    EdgeNotConfigured,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullEntry { slot } => write!(f, "thread slot {} has no entry function", slot),
            Self::AlreadyRegistered => f.write_str("threads already registered"),
            Self::NotRegistered => f.write_str("no threads registered"),
            Self::InvalidTickPeriod(cycles) => write!(f, "invalid tick period: {} cycles", cycles),
            Self::PeriodicTableFull => f.write_str("periodic event table full"),
            Self::ZeroPeriod => f.write_str("periodic event period must be non-zero"),
            Self::InvalidSemaphore(id) => write!(f, "invalid semaphore id {}", id),
            Self::FifoFull => f.write_str("fifo full, data lost"),
            Self::EdgeNotConfigured => f.write_str("edge trigger not configured"),
        }
    }
}
