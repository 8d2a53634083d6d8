//! # Task Control Block
//!
//! Defines the per-thread descriptor the scheduler walks. TCBs live in a fixed
//! array inside the [`Scheduler`](crate::scheduler::Scheduler) and are linked
//! into a ring by index, so "pointers" between them are plain integers into a
//! statically sized table.
//!
//! A thread's state is never stored; it is derived from its `blocked_on` and
//! `sleep` fields:
//!
//! ```text
//!                 wait() on sem <= 0
//!   ┌──────────┐ ─────────────────────► ┌──────────┐
//!   │ Runnable │                        │ Blocked  │
//!   └──────────┘ ◄───────────────────── └──────────┘
//!     │     ▲          signal()
//!     │     │
//!     │     │ counter decays to 0
//!     ▼     │
//!   ┌──────────┐
//!   │ Sleeping │ ◄── sleep(ticks > 0)
//!   └──────────┘
//! ```

use crate::semaphore::SemaphoreId;

/// Entry function of a main thread. Never returns.
pub type TaskFn = extern "C" fn() -> !;

/// Index of a thread slot in the TCB ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u8);

impl TaskId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Derived state
// ---------------------------------------------------------------------------

/// Scheduling state of a thread, derived from its TCB fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Eligible for selection by the scheduler.
    Runnable,
    /// Waiting for a `signal` on this semaphore.
    Blocked(SemaphoreId),
    /// Dormant for this many more ticks.
    Sleeping(u32),
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// One thread handed to `add_threads`.
///
/// `entry` is optional so that a registration table assembled at run time can
/// carry an empty slot; `add_threads` rejects such a table as a whole.
#[derive(Debug, Clone, Copy)]
pub struct ThreadSpec {
    pub entry: Option<TaskFn>,
    /// Lower value = higher priority. Ignored by the round-robin policies.
    pub priority: u8,
}

impl ThreadSpec {
    /// A thread for the round-robin policies.
    pub const fn new(entry: TaskFn) -> Self {
        Self {
            entry: Some(entry),
            priority: 0,
        }
    }

    /// A thread with a static priority (0 highest).
    pub const fn with_priority(entry: TaskFn, priority: u8) -> Self {
        Self {
            entry: Some(entry),
            priority,
        }
    }
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Task Control Block.
///
/// `stack_pointer` is a word offset into the thread's own stack region; the
/// trampoline converts it to and from an address. It is only meaningful while
/// the thread is not running.
#[derive(Debug, Clone, Copy)]
pub struct Tcb {
    pub stack_pointer: usize,
    /// Remaining ticks of dormancy; 0 means not sleeping.
    pub sleep: u32,
    pub blocked_on: Option<SemaphoreId>,
    pub priority: u8,
    /// Ring successor. Set once at registration.
    pub next: TaskId,
}

impl Tcb {
    pub const EMPTY: Self = Self {
        stack_pointer: 0,
        sleep: 0,
        blocked_on: None,
        priority: 0,
        next: TaskId(0),
    };

    #[inline]
    pub fn state(&self) -> TaskState {
        match (self.blocked_on, self.sleep) {
            (Some(sem), _) => TaskState::Blocked(sem),
            (None, 0) => TaskState::Runnable,
            (None, ticks) => TaskState::Sleeping(ticks),
        }
    }

    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.blocked_on.is_none() && self.sleep == 0
    }
}
