//! # Synchronization Primitives
//!
//! Interrupt-safe critical sections for the single-core kernel. Every
//! mutation of shared kernel state (TCB fields, semaphore counters, FIFO
//! indices, the mailbox slot) happens inside one of these.
//!
//! On target the `critical-section` implementation comes from `cortex-m`
//! (`critical-section-single-core`): entry saves PRIMASK and disables
//! interrupts, exit restores the saved PRIMASK rather than unconditionally
//! re-enabling. Nested sections therefore leave interrupts masked until the
//! outermost one exits.

use core::cell::RefCell;

pub use critical_section::CriticalSection;
use critical_section::Mutex;

/// Execute a closure within a critical section (interrupts disabled).
///
/// # Usage
/// ```ignore
/// sync::critical_section(|cs| {
///     // Access shared state safely
/// });
/// ```
///
/// Keep critical sections short: they are the kernel's interrupt latency.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}

/// Statically allocated kernel state, reachable only inside a critical section.
pub struct KernelCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> KernelCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` with exclusive access to the value.
    ///
    /// # Panics
    /// If called re-entrantly from within `f` for the same cell. ISR paths
    /// must release the cell before invoking application callbacks.
    #[inline]
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_sections_restore() {
        let value = critical_section(|_outer| {
            let inner = critical_section(|_inner| 41);
            inner + 1
        });
        assert_eq!(value, 42);

        // A fresh section after nesting must still be enterable.
        assert!(critical_section(|_| true));
    }

    #[test]
    fn test_kernel_cell_mutation() {
        static CELL: KernelCell<u32> = KernelCell::new(0);
        CELL.lock(|v| *v += 5);
        CELL.lock(|v| *v *= 2);
        assert_eq!(CELL.lock(|v| *v), 10);
    }
}
