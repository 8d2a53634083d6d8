//! # Mailbox
//!
//! One-word channel from a producer that must not block (an event thread or
//! ISR) to a single consumer thread. A send always overwrites the slot, so
//! the consumer sees the most recent value. A send that lands while the
//! previous value is still unread counts as lost and does not signal again,
//! so every value read was signalled exactly once.
//!
//! "Unread" is the `full` flag, not the semaphore count: once a blocked
//! consumer has been released the count is back at 0 even though the
//! consumer has not taken the value yet.
//!
//! As with the FIFO, a receive is an acquisition of [`Mailbox::ready`]
//! followed by [`Mailbox::take`].

use crate::scheduler::Scheduler;
use crate::semaphore::SemaphoreId;

pub struct Mailbox {
    slot: u32,
    full: bool,
    lost: u32,
    ready: SemaphoreId,
}

impl Mailbox {
    pub const fn new(ready: SemaphoreId) -> Self {
        Self {
            slot: 0,
            full: false,
            lost: 0,
            ready,
        }
    }

    /// Mark the mailbox empty.
    pub fn init<const N: usize>(&mut self, kernel: &mut Scheduler<N>) {
        self.slot = 0;
        self.full = false;
        self.lost = 0;
        kernel.init_semaphore(self.ready, 0);
    }

    pub fn send<const N: usize>(&mut self, kernel: &mut Scheduler<N>, data: u32) {
        self.slot = data;
        if self.full {
            self.lost = self.lost.wrapping_add(1);
            log::debug!("mailbox overwritten before read (lost {})", self.lost);
        } else {
            self.full = true;
            kernel.signal(self.ready);
        }
    }

    /// Read the slot and mark it empty. The caller must already have
    /// acquired `ready`.
    #[inline]
    pub fn take(&mut self) -> u32 {
        self.full = false;
        self.slot
    }

    #[inline]
    pub fn ready(&self) -> SemaphoreId {
        self.ready
    }

    /// Sends that overwrote an unread value.
    #[inline]
    pub fn lost(&self) -> u32 {
        self.lost
    }
}
