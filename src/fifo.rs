//! # FIFO
//!
//! Bounded single-producer / single-consumer word queue. The producer is an
//! interrupt or event thread and never blocks: a put on a full buffer drops
//! the datum and counts it as lost. The consumer is a main thread and blocks
//! on the occupancy semaphore until data is available.
//!
//! Occupancy is tracked twice: `len` is the buffer's own count, used for the
//! full check, while the semaphore counts data not yet claimed by a consumer
//! and may go negative while the consumer waits.
//!
//! A get is two steps so the consumer never holds the FIFO while suspended:
//!
//! ```ignore
//! kernel.wait(fifo.items());   // may block
//! let datum = fifo.take();     // inside a critical section
//! ```

use crate::error::KernelError;
use crate::scheduler::Scheduler;
use crate::semaphore::SemaphoreId;

pub struct Fifo<const C: usize> {
    buf: [u32; C],
    put_index: usize,
    get_index: usize,
    len: usize,
    lost: u32,
    items: SemaphoreId,
}

impl<const C: usize> Fifo<C> {
    pub const fn new(items: SemaphoreId) -> Self {
        assert!(C > 0, "fifo capacity must be non-zero");
        Self {
            buf: [0; C],
            put_index: 0,
            get_index: 0,
            len: 0,
            lost: 0,
            items,
        }
    }

    /// Empty the buffer and zero its semaphore and lost counter.
    pub fn init<const N: usize>(&mut self, kernel: &mut Scheduler<N>) {
        self.put_index = 0;
        self.get_index = 0;
        self.len = 0;
        self.lost = 0;
        kernel.init_semaphore(self.items, 0);
    }

    /// Enqueue `data` and signal the consumer. Never blocks.
    pub fn put<const N: usize>(&mut self, kernel: &mut Scheduler<N>, data: u32) -> Result<(), KernelError> {
        if self.len == C {
            self.lost = self.lost.wrapping_add(1);
            log::debug!("fifo full, dropped {:#x} (lost {})", data, self.lost);
            return Err(KernelError::FifoFull);
        }
        self.buf[self.put_index] = data;
        self.put_index = (self.put_index + 1) % C;
        self.len += 1;
        kernel.signal(self.items);
        Ok(())
    }

    /// Dequeue the oldest datum. The caller must already have acquired
    /// [`items`](Self::items).
    ///
    /// # Panics
    /// If the buffer is empty, meaning the caller skipped the acquisition.
    pub fn take(&mut self) -> u32 {
        assert!(self.len > 0, "fifo take without a matching wait");
        let data = self.buf[self.get_index];
        self.get_index = (self.get_index + 1) % C;
        self.len -= 1;
        data
    }

    /// The occupancy semaphore.
    #[inline]
    pub fn items(&self) -> SemaphoreId {
        self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Data dropped because the buffer was full.
    #[inline]
    pub fn lost(&self) -> u32 {
        self.lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KernelConfig, FIFO_SEMAPHORE, FIFO_SIZE};
    use crate::scheduler::tests::registered;
    use crate::semaphore::WaitStatus;
    use crate::task::TaskId;

    fn fifo() -> Fifo<FIFO_SIZE> {
        Fifo::new(SemaphoreId::new(FIFO_SEMAPHORE))
    }

    #[test]
    fn test_order_preserved() {
        let mut k = registered(KernelConfig::BLOCKING);
        let mut f = fifo();
        f.init(&mut k);

        for v in [7, 8, 9] {
            f.put(&mut k, v).unwrap();
        }
        assert_eq!(k.semaphore_value(f.items()), 3);

        for expected in [7, 8, 9] {
            assert_eq!(k.wait(f.items()), WaitStatus::Acquired);
            assert_eq!(f.take(), expected);
        }
        assert!(f.is_empty());
    }

    #[test]
    fn test_full_buffer_drops_and_counts() {
        let mut k = registered(KernelConfig::BLOCKING);
        let mut f = fifo();
        f.init(&mut k);

        for v in 0..FIFO_SIZE as u32 {
            f.put(&mut k, v).unwrap();
        }
        assert_eq!(f.put(&mut k, 100), Err(KernelError::FifoFull));
        assert_eq!(f.put(&mut k, 101), Err(KernelError::FifoFull));
        assert_eq!(f.lost(), 2);
        assert_eq!(f.len(), FIFO_SIZE);
        assert_eq!(k.semaphore_value(f.items()), FIFO_SIZE as i32);

        // Oldest datum survives, dropped ones never appear.
        k.wait(f.items());
        assert_eq!(f.take(), 0);
        f.put(&mut k, 102).unwrap();
        let mut last = 0;
        while !f.is_empty() {
            k.wait(f.items());
            last = f.take();
        }
        assert_eq!(last, 102);
    }

    #[test]
    fn test_wraps_around() {
        let mut k = registered(KernelConfig::BLOCKING);
        let mut f = fifo();
        f.init(&mut k);

        for round in 0..3u32 {
            for i in 0..FIFO_SIZE as u32 {
                f.put(&mut k, round * 100 + i).unwrap();
            }
            for i in 0..FIFO_SIZE as u32 {
                k.wait(f.items());
                assert_eq!(f.take(), round * 100 + i);
            }
        }
        assert_eq!(f.lost(), 0);
    }

    #[test]
    fn test_consumer_blocks_until_put() {
        let mut k = registered(KernelConfig::BLOCKING);
        let mut f = fifo();
        f.init(&mut k);

        assert_eq!(k.wait(f.items()), WaitStatus::Blocked);
        k.schedule();
        assert!(!k.tcb(TaskId(0)).is_runnable());

        f.put(&mut k, 42).unwrap();
        assert!(k.tcb(TaskId(0)).is_runnable());
        assert_eq!(f.take(), 42);
    }

    #[test]
    fn test_init_clears_state() {
        let mut k = registered(KernelConfig::BLOCKING);
        let mut f = fifo();
        f.init(&mut k);
        for v in 0..FIFO_SIZE as u32 + 1 {
            let _ = f.put(&mut k, v);
        }
        f.init(&mut k);
        assert!(f.is_empty());
        assert_eq!(f.lost(), 0);
        assert_eq!(k.semaphore_value(f.items()), 0);
    }

    #[test]
    #[should_panic(expected = "without a matching wait")]
    fn test_take_from_empty_is_fatal() {
        fifo().take();
    }
}
