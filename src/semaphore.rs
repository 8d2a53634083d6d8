//! # Counting Semaphores
//!
//! Semaphores are slots in a fixed pool inside the scheduler, named by
//! [`SemaphoreId`]. A blocked thread records the *identity* of the semaphore
//! it waits on, so two semaphores that happen to hold the same count are never
//! confused by the wake-up scan.
//!
//! The counter is a signed integer. Non-negative: that many signals are
//! available. Negative (blocking mode only): its magnitude is the number of
//! threads blocked on it. A signal on a counter already at `i32::MAX` is
//! dropped.
//!
//! These methods are the state transitions only. Suspending the caller when
//! `wait` reports [`WaitStatus::Blocked`], or retrying on
//! [`WaitStatus::Busy`], is the job of the [`kernel`](crate::kernel) layer,
//! which also wraps every call in a critical section.

use crate::config::{SemaphoreMode, MAX_SEMAPHORES};
use crate::scheduler::Scheduler;
use crate::task::TaskId;

/// Identity of a semaphore: its slot in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaphoreId(u8);

impl SemaphoreId {
    /// Name pool slot `slot`. Usable in `const` declarations; an out-of-range
    /// slot fails at compile time there.
    pub const fn new(slot: u8) -> Self {
        assert!((slot as usize) < MAX_SEMAPHORES, "semaphore slot out of range");
        Self(slot)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Outcome of a `wait` state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// The counter was decremented and the caller may proceed.
    Acquired,
    /// Blocking mode: the caller is now recorded as blocked and must suspend.
    /// When it next runs, the matching `signal` has already happened.
    Blocked,
    /// Spin mode: nothing available, counter untouched. Leave the critical
    /// section so pending interrupts run, then try again.
    Busy,
}

impl<const N: usize> Scheduler<N> {
    /// Set a semaphore's counter: 0 = nothing available / mutex held,
    /// 1 = mutex free, n = n resources.
    pub fn init_semaphore(&mut self, sem: SemaphoreId, value: i32) {
        self.semaphores[sem.index()] = value;
    }

    #[inline]
    pub fn semaphore_value(&self, sem: SemaphoreId) -> i32 {
        self.semaphores[sem.index()]
    }

    /// Decrement on behalf of the running thread.
    pub fn wait(&mut self, sem: SemaphoreId) -> WaitStatus {
        let count = &mut self.semaphores[sem.index()];
        match self.config.semaphores() {
            SemaphoreMode::Spin => {
                if *count > 0 {
                    *count -= 1;
                    WaitStatus::Acquired
                } else {
                    WaitStatus::Busy
                }
            }
            SemaphoreMode::Blocking => {
                *count = count.saturating_sub(1);
                if *count >= 0 {
                    return WaitStatus::Acquired;
                }
                let run = self.run;
                self.tcbs[run.index()].blocked_on = Some(sem);
                self.reschedule = true;
                log::trace!("{} blocked on sem {}", run, sem.raw());
                WaitStatus::Blocked
            }
        }
    }

    /// Increment and, in blocking mode, release the first waiter found
    /// scanning the ring from the thread after the run pointer.
    ///
    /// Returns the released thread. The released thread is only made
    /// runnable; which thread runs next is left to the scheduler.
    ///
    /// # Panics
    /// If the counter shows a waiter but no thread in the ring is blocked on
    /// this semaphore. That is corrupted kernel state.
    pub fn signal(&mut self, sem: SemaphoreId) -> Option<TaskId> {
        let count = &mut self.semaphores[sem.index()];
        let had_waiter = *count < 0;
        match count.checked_add(1) {
            Some(value) => *count = value,
            None => {
                log::warn!("semaphore {} saturated, signal dropped", sem.raw());
                return None;
            }
        }

        if self.config.semaphores() == SemaphoreMode::Spin || !had_waiter {
            return None;
        }

        let mut candidate = self.tcbs[self.run.index()].next;
        for _ in 0..N {
            let tcb = &mut self.tcbs[candidate.index()];
            if tcb.blocked_on == Some(sem) {
                tcb.blocked_on = None;
                log::trace!("sem {} released {}", sem.raw(), candidate);
                return Some(candidate);
            }
            candidate = tcb.next;
        }
        panic!("semaphore {} has waiters but no thread is blocked on it", sem.raw());
    }
}
