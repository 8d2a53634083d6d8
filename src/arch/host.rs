//! Host stand-in for the hardware port.
//!
//! There is no second thread of execution on the host: a suspend is only
//! counted, and the run pointer moves only when a test calls the scheduler
//! or [`kernel::switch_context`](crate::kernel::switch_context) directly.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::event::Edge;

static SUSPENDS: AtomicUsize = AtomicUsize::new(0);

pub fn suspend() {
    SUSPENDS.fetch_add(1, Ordering::Relaxed);
}

/// Context switches requested so far.
pub fn suspends() -> usize {
    SUSPENDS.load(Ordering::Relaxed)
}

pub fn arm_edge(_edge: Edge, _priority: u8) {}

pub fn rearm_edge() {}

pub fn start(reload: u32) -> ! {
    panic!("no thread launch on the host (slice reload {})", reload);
}
