//! # Kernel
//!
//! The global kernel instance and the API threads, event callbacks and
//! interrupt handlers call.
//!
//! Kernel state lives in a [`KernelCell`] and is only touched inside a
//! critical section. Each call performs one state transition on the
//! [`Scheduler`]; if the transition asked for the running thread to be
//! descheduled, the call requests a context switch from the port once the
//! critical section has been released.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init(config)          ← Select variant, clear state
//!         ├─► kernel::init_semaphore() ...  ← Application semaphores
//!         ├─► kernel::fifo_init() / mailbox_init()
//!         ├─► kernel::add_threads([..])     ← Build the TCB ring
//!         ├─► kernel::add_periodic_event() / period_trigger()
//!         ├─► kernel::edge_trigger_init()
//!         └─► kernel::launch(slice)         ← No return on success
//!               ├─► Configure SysTick and the time base
//!               ├─► Set exception priorities
//!               └─► Start the first thread
//! ```

use core::convert::Infallible;

use crate::arch::port;
use crate::config::{
    KernelConfig, FIFO_SEMAPHORE, FIFO_SIZE, MAILBOX_SEMAPHORE, NUM_THREADS, USER_SEMAPHORES,
};
use crate::error::KernelError;
use crate::event::{Edge, EventAction, EventFn};
use crate::fifo::Fifo;
use crate::mailbox::Mailbox;
use crate::scheduler::Scheduler;
use crate::semaphore::{SemaphoreId, WaitStatus};
use crate::sync::KernelCell;
use crate::task::{TaskId, TaskState, ThreadSpec};

// ---------------------------------------------------------------------------
// Global kernel instance
// ---------------------------------------------------------------------------

static KERNEL: KernelCell<Scheduler<NUM_THREADS>> =
    KernelCell::new(Scheduler::new(KernelConfig::PRIORITY));

static FIFO: KernelCell<Fifo<FIFO_SIZE>> =
    KernelCell::new(Fifo::new(SemaphoreId::new(FIFO_SEMAPHORE)));

static MAILBOX: KernelCell<Mailbox> =
    KernelCell::new(Mailbox::new(SemaphoreId::new(MAILBOX_SEMAPHORE)));

/// Apply `f` to the kernel and act on any reschedule it requested.
fn transition<R>(f: impl FnOnce(&mut Scheduler<NUM_THREADS>) -> R) -> R {
    let (result, reschedule) = KERNEL.lock(|k| {
        let result = f(k);
        (result, k.take_reschedule())
    });
    if reschedule {
        port::suspend();
    }
    result
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Reset the kernel and select its variant. Call first, from `main`.
pub fn init(config: KernelConfig) {
    KERNEL.lock(|k| k.reset(config));
    log::info!("kernel init: {:?}", config);
}

/// Initialise an application semaphore.
///
/// The pool slots used by the kernel FIFO and mailbox are rejected.
pub fn init_semaphore(sem: SemaphoreId, value: i32) -> Result<(), KernelError> {
    if sem.index() >= USER_SEMAPHORES {
        log::warn!("semaphore {} is reserved", sem.raw());
        return Err(KernelError::InvalidSemaphore(sem.raw()));
    }
    KERNEL.lock(|k| k.init_semaphore(sem, value));
    Ok(())
}

/// Register all main threads. See [`Scheduler::add_threads`].
pub fn add_threads(threads: [ThreadSpec; NUM_THREADS]) -> Result<(), KernelError> {
    KERNEL.lock(|k| k.add_threads(threads))
}

/// Run `task` from the time-base interrupt every `period` ticks.
///
/// `task` runs in interrupt context: it may signal, put to the FIFO or send
/// to the mailbox, but must never wait or sleep.
pub fn add_periodic_event(task: EventFn, period: u32) -> Result<usize, KernelError> {
    KERNEL.lock(|k| k.add_periodic(EventAction::Call(task), period))
}

/// Signal `sem` every `period` ticks.
pub fn period_trigger(sem: SemaphoreId, period: u32) -> Result<usize, KernelError> {
    KERNEL.lock(|k| k.period_trigger(sem, period))
}

/// Signal `sem` on the next `edge` of the trigger input, with the input's
/// interrupt at `priority` (0 highest).
pub fn edge_trigger_init(sem: SemaphoreId, edge: Edge, priority: u8) {
    KERNEL.lock(|k| k.edge_trigger_init(sem, edge, priority));
    port::arm_edge(edge, priority);
}

/// Re-arm the edge trigger. Call once the input has settled.
pub fn edge_trigger_restart() -> Result<(), KernelError> {
    KERNEL.lock(|k| k.edge_trigger_restart())?;
    port::rearm_edge();
    Ok(())
}

/// Start scheduling with a slice of `period_cycles` core-clock cycles.
///
/// Only returns on a configuration error.
pub fn launch(period_cycles: u32) -> Result<Infallible, KernelError> {
    let reload = KERNEL.lock(|k| k.launch_reload(period_cycles))?;
    log::info!("launch: slice {} cycles", period_cycles);
    port::start(reload)
}

// ---------------------------------------------------------------------------
// Thread API
// ---------------------------------------------------------------------------

/// Acquire `sem`, blocking or spinning per the configured variant.
pub fn wait(sem: SemaphoreId) {
    loop {
        match transition(|k| k.wait(sem)) {
            // A blocked caller only resumes once a signal released it.
            WaitStatus::Acquired | WaitStatus::Blocked => return,
            WaitStatus::Busy => core::hint::spin_loop(),
        }
    }
}

/// Release `sem`. Safe from threads, event callbacks and interrupts.
pub fn signal(sem: SemaphoreId) {
    transition(|k| {
        k.signal(sem);
    });
}

/// Give up the rest of the current slice.
pub fn suspend() {
    transition(|k| k.suspend());
}

/// Sleep for `ticks` time-base ticks. `sleep(0)` yields.
pub fn sleep(ticks: u32) {
    transition(|k| k.sleep(ticks));
}

// ---------------------------------------------------------------------------
// FIFO and mailbox
// ---------------------------------------------------------------------------

/// Empty the kernel FIFO and clear its lost count.
pub fn fifo_init() {
    FIFO.lock(|f| KERNEL.lock(|k| f.init(k)));
}

/// Enqueue from an event callback or interrupt. Never blocks; a full FIFO
/// drops `data`.
pub fn fifo_put(data: u32) -> Result<(), KernelError> {
    FIFO.lock(|f| KERNEL.lock(|k| f.put(k, data)))
}

/// Dequeue from a main thread, blocking while empty.
pub fn fifo_get() -> u32 {
    let items = FIFO.lock(|f| f.items());
    wait(items);
    FIFO.lock(|f| f.take())
}

/// Puts dropped on a full FIFO since `fifo_init`.
pub fn fifo_lost() -> u32 {
    FIFO.lock(|f| f.lost())
}

/// Empty the kernel mailbox and clear its lost count.
pub fn mailbox_init() {
    MAILBOX.lock(|m| KERNEL.lock(|k| m.init(k)));
}

/// Publish `data`, replacing any unread value. Never blocks.
pub fn mailbox_send(data: u32) {
    MAILBOX.lock(|m| KERNEL.lock(|k| m.send(k, data)));
}

/// Receive the most recent value, blocking until one is sent.
pub fn mailbox_recv() -> u32 {
    let ready = MAILBOX.lock(|m| m.ready());
    wait(ready);
    MAILBOX.lock(|m| m.take())
}

/// Sends that overwrote an unread value since `mailbox_init`.
pub fn mailbox_lost() -> u32 {
    MAILBOX.lock(|m| m.lost())
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// The thread currently holding the CPU.
pub fn current() -> TaskId {
    KERNEL.lock(|k| k.run())
}

/// Whether `task` is runnable, blocked or sleeping.
pub fn state(task: TaskId) -> TaskState {
    KERNEL.lock(|k| k.state(task))
}

/// Current counter of `sem`; negative counts blocked threads.
pub fn semaphore_value(sem: SemaphoreId) -> i32 {
    KERNEL.lock(|k| k.semaphore_value(sem))
}

/// Time-base ticks since `init`.
pub fn ticks() -> u64 {
    KERNEL.lock(|k| k.ticks())
}

// ---------------------------------------------------------------------------
// Port hooks
// ---------------------------------------------------------------------------

/// Time-base interrupt body: age sleepers, dispatch periodic events.
///
/// Callbacks run after the kernel is released so they may use the API.
pub fn time_base_tick() {
    let (due, reschedule) = KERNEL.lock(|k| {
        let due = k.tick();
        (due, k.take_reschedule())
    });
    for callback in due {
        callback();
    }
    if reschedule {
        port::suspend();
    }
}

/// Edge-trigger interrupt body. Returns whether the bound semaphore was
/// signalled; the port masks the input either way.
pub fn edge_interrupt() -> bool {
    KERNEL.lock(|k| k.edge_event())
}

/// Stack pointer of the thread `launch` starts.
pub fn first_stack_pointer() -> *mut u32 {
    KERNEL.lock(|k| k.stack_pointer())
}

/// Context-switch body: record the outgoing thread's stack pointer, pick the
/// next thread and return its stack pointer.
pub fn switch_context(psp: *mut u32) -> *mut u32 {
    KERNEL.lock(|k| {
        k.save_stack_pointer(psp);
        k.schedule();
        k.stack_pointer()
    })
}
