//! # Scheduler
//!
//! The single kernel-state value: the TCB ring, its stack arena, the run
//! pointer, the semaphore pool and the event tables. Everything here is a
//! plain state transition on `&mut self`; the [`kernel`](crate::kernel) layer
//! owns the global instance, wraps each call in a critical section and turns
//! a pending reschedule into a hardware context switch.
//!
//! ## Scheduling Policies
//!
//! Selected once through [`KernelConfig::policy`]:
//!
//! 1. **RoundRobin**: advance the run pointer to `next`.
//! 2. **RoundRobinSkip**: advance to `next`, then keep advancing past blocked
//!    and sleeping threads.
//! 3. **Priority**: scan the whole ring once, starting after the run pointer,
//!    and take the first runnable thread with the lowest priority value.
//!    Because the scan starts past the previous thread, equal-priority
//!    threads take turns.
//!
//! ## Tick
//!
//! Every time-base tick decrements each non-zero sleep counter and runs the
//! periodic event dispatcher. Selecting the next thread is a separate step
//! driven by the slice timer or by a cooperative suspend.

use crate::config::{KernelConfig, SchedulePolicy, MAX_SEMAPHORES, MAX_TICK_PERIOD};
use crate::error::KernelError;
use crate::event::{Callbacks, EdgeTrigger, PeriodicTable};
use crate::stack::{self, Stack};
use crate::task::{TaskId, TaskState, Tcb, ThreadSpec};

pub struct Scheduler<const N: usize> {
    pub(crate) tcbs: [Tcb; N],
    pub(crate) stacks: [Stack; N],
    /// The thread the CPU is executing.
    pub(crate) run: TaskId,
    pub(crate) semaphores: [i32; MAX_SEMAPHORES],
    pub(crate) periodic: PeriodicTable,
    pub(crate) edge: EdgeTrigger,
    pub(crate) config: KernelConfig,
    registered: bool,
    /// Set when the running thread must be descheduled before its slice ends.
    pub(crate) reschedule: bool,
    tick_count: u64,
}

impl<const N: usize> Scheduler<N> {
    pub const fn new(config: KernelConfig) -> Self {
        assert!(N > 0 && N <= u8::MAX as usize, "thread ring size out of range");
        Self {
            tcbs: [Tcb::EMPTY; N],
            stacks: [Stack::EMPTY; N],
            run: TaskId(0),
            semaphores: [0; MAX_SEMAPHORES],
            periodic: PeriodicTable::new(),
            edge: EdgeTrigger::new(),
            config,
            registered: false,
            reschedule: false,
            tick_count: 0,
        }
    }

    /// Return to the freshly initialised state under a new configuration.
    pub fn reset(&mut self, config: KernelConfig) {
        *self = Self::new(config);
    }

    #[inline]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Register the complete thread set.
    ///
    /// Builds the ring in array order, writes every initial stack frame and
    /// points the run pointer at the first thread. Either every slot is
    /// registered or, on error, nothing is touched.
    pub fn add_threads(&mut self, threads: [ThreadSpec; N]) -> Result<(), KernelError> {
        if self.registered {
            return Err(KernelError::AlreadyRegistered);
        }
        if let Some(slot) = threads.iter().position(|t| t.entry.is_none()) {
            log::warn!("thread registration rejected: slot {} empty", slot);
            return Err(KernelError::NullEntry { slot });
        }

        for (i, spec) in threads.iter().enumerate() {
            let Some(entry) = spec.entry else { continue };
            let tcb = &mut self.tcbs[i];
            tcb.next = TaskId(((i + 1) % N) as u8);
            tcb.priority = spec.priority;
            tcb.sleep = 0;
            tcb.blocked_on = None;
            tcb.stack_pointer = stack::init_frame(&mut self.stacks[i], entry);
        }

        self.run = TaskId(0);
        self.registered = true;
        log::info!("registered {} threads ({:?})", N, self.config.policy());
        Ok(())
    }

    #[inline]
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// The run pointer.
    #[inline]
    pub fn run(&self) -> TaskId {
        self.run
    }

    #[inline]
    pub fn tcb(&self, task: TaskId) -> &Tcb {
        &self.tcbs[task.index()]
    }

    #[inline]
    pub fn state(&self, task: TaskId) -> TaskState {
        self.tcbs[task.index()].state()
    }

    /// A thread's stack image, for diagnostics.
    pub fn stack_words(&self, task: TaskId) -> &[u32] {
        &self.stacks[task.index()].words
    }

    /// Time-base ticks since the last reset.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.tick_count
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Pick the next thread and move the run pointer to it.
    ///
    /// # Panics
    /// Under the skipping and priority policies, if no thread in the ring is
    /// runnable. The thread set must always include one that never blocks or
    /// sleeps.
    pub fn schedule(&mut self) -> TaskId {
        let next = match self.config.policy() {
            SchedulePolicy::RoundRobin => self.tcbs[self.run.index()].next,
            SchedulePolicy::RoundRobinSkip => self.next_runnable(),
            SchedulePolicy::Priority => self.highest_priority(),
        };
        log::trace!("switch {} -> {}", self.run, next);
        self.run = next;
        self.reschedule = false;
        next
    }

    fn next_runnable(&self) -> TaskId {
        let mut candidate = self.tcbs[self.run.index()].next;
        for _ in 0..N {
            if self.tcbs[candidate.index()].is_runnable() {
                return candidate;
            }
            candidate = self.tcbs[candidate.index()].next;
        }
        panic!("no runnable thread in the ring");
    }

    fn highest_priority(&self) -> TaskId {
        let mut best: Option<(u8, TaskId)> = None;
        let mut candidate = self.tcbs[self.run.index()].next;
        for _ in 0..N {
            let tcb = &self.tcbs[candidate.index()];
            let better = match best {
                Some((priority, _)) => tcb.priority < priority,
                None => true,
            };
            if tcb.is_runnable() && better {
                best = Some((tcb.priority, candidate));
            }
            candidate = tcb.next;
        }
        match best {
            Some((_, task)) => task,
            None => panic!("no runnable thread in the ring"),
        }
    }

    /// Request that the running thread give up the rest of its slice.
    #[inline]
    pub fn suspend(&mut self) {
        self.reschedule = true;
    }

    /// Put the running thread to sleep for `ticks` time-base ticks and
    /// request a reschedule. `sleep(0)` only yields.
    pub fn sleep(&mut self, ticks: u32) {
        self.tcbs[self.run.index()].sleep = ticks;
        self.suspend();
    }

    /// Consume a pending reschedule request.
    #[inline]
    pub fn take_reschedule(&mut self) -> bool {
        core::mem::take(&mut self.reschedule)
    }

    /// One time-base tick: age every sleeping thread, then dispatch due
    /// periodic events. Returns the event callbacks to run once the kernel
    /// state is released.
    pub fn tick(&mut self) -> Callbacks {
        self.tick_count = self.tick_count.wrapping_add(1);
        for tcb in self.tcbs.iter_mut() {
            tcb.sleep = tcb.sleep.saturating_sub(1);
        }
        self.dispatch_periodic()
    }

    // -----------------------------------------------------------------------
    // Launch and trampoline support
    // -----------------------------------------------------------------------

    /// Validate a slice length in core-clock cycles and return the SysTick
    /// reload value for it.
    pub fn launch_reload(&self, period_cycles: u32) -> Result<u32, KernelError> {
        if !self.registered {
            return Err(KernelError::NotRegistered);
        }
        if period_cycles == 0 || period_cycles > MAX_TICK_PERIOD {
            log::warn!("tick period {} outside 1..={}", period_cycles, MAX_TICK_PERIOD);
            return Err(KernelError::InvalidTickPeriod(period_cycles));
        }
        Ok(period_cycles - 1)
    }

    /// Address of the running thread's saved context.
    pub fn stack_pointer(&mut self) -> *mut u32 {
        let run = self.run.index();
        let offset = self.tcbs[run].stack_pointer;
        self.stacks[run].word_ptr(offset)
    }

    /// Record where the trampoline saved the running thread's context.
    ///
    /// # Panics
    /// If `psp` lies outside the thread's stack region (stack overflow).
    pub fn save_stack_pointer(&mut self, psp: *const u32) {
        let run = self.run.index();
        match self.stacks[run].offset_of(psp) {
            Some(offset) => self.tcbs[run].stack_pointer = offset,
            None => panic!("{} overflowed its stack", self.run),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{FRAME_WORDS, STACK_WORDS};
    use crate::semaphore::SemaphoreId;

    extern "C" fn worker() -> ! {
        loop {}
    }

    pub(crate) fn registered_with(config: KernelConfig, priorities: [u8; 4]) -> Scheduler<4> {
        let mut k = Scheduler::new(config);
        let threads = priorities.map(|p| ThreadSpec::with_priority(worker, p));
        k.add_threads(threads).unwrap();
        k
    }

    pub(crate) fn registered(config: KernelConfig) -> Scheduler<4> {
        registered_with(config, [1, 1, 1, 1])
    }

    /// Run `decisions` scheduling passes and record who was picked.
    fn picks<const N: usize>(k: &mut Scheduler<N>, decisions: usize) -> [u8; 16] {
        let mut out = [u8::MAX; 16];
        for slot in out.iter_mut().take(decisions) {
            *slot = k.schedule().0;
        }
        out
    }

    #[test]
    fn test_ring_and_run_pointer() {
        let k = registered(KernelConfig::SPIN);
        assert_eq!(k.run(), TaskId(0));
        for i in 0..4u8 {
            assert_eq!(k.tcb(TaskId(i)).next, TaskId((i + 1) % 4));
            assert_eq!(k.tcb(TaskId(i)).stack_pointer, STACK_WORDS - FRAME_WORDS);
        }
    }

    #[test]
    fn test_null_entry_is_all_or_nothing() {
        let mut k: Scheduler<4> = Scheduler::new(KernelConfig::BLOCKING);
        let mut threads = [ThreadSpec::new(worker); 4];
        threads[2].entry = None;

        assert_eq!(k.add_threads(threads), Err(KernelError::NullEntry { slot: 2 }));
        assert!(!k.is_registered());
        for i in 0..4 {
            assert!(k.stack_words(TaskId(i)).iter().all(|&w| w == 0), "slot {} touched", i);
        }
    }

    #[test]
    fn test_second_registration_rejected() {
        let mut k = registered(KernelConfig::BLOCKING);
        let again = [ThreadSpec::new(worker); 4];
        assert_eq!(k.add_threads(again), Err(KernelError::AlreadyRegistered));
    }

    #[test]
    fn test_round_robin_visits_each_once() {
        let mut k = registered(KernelConfig::SPIN);
        let order = picks(&mut k, 8);
        assert_eq!(&order[..8], &[1, 2, 3, 0, 1, 2, 3, 0]);
    }

    #[test]
    fn test_round_robin_ignores_blocked_state() {
        let mut k = registered(KernelConfig::SPIN);
        k.tcbs[1].sleep = 5;
        assert_eq!(k.schedule(), TaskId(1));
    }

    #[test]
    fn test_skip_passes_blocked_and_sleeping() {
        let mut k = registered(KernelConfig::BLOCKING);
        k.tcbs[1].blocked_on = Some(SemaphoreId::new(0));
        k.tcbs[2].sleep = 2;

        assert_eq!(k.schedule(), TaskId(3));
        assert_eq!(k.schedule(), TaskId(0));
        assert_eq!(k.schedule(), TaskId(3));
    }

    #[test]
    #[should_panic(expected = "no runnable thread")]
    fn test_skip_with_nothing_runnable_is_fatal() {
        let mut k = registered(KernelConfig::BLOCKING);
        for tcb in k.tcbs.iter_mut() {
            tcb.sleep = 1;
        }
        k.schedule();
    }

    #[test]
    fn test_priority_selects_minimum() {
        let mut k = registered_with(KernelConfig::PRIORITY, [3, 1, 2, 1]);
        for _ in 0..6 {
            let picked = k.schedule();
            assert_eq!(k.tcb(picked).priority, 1);
        }
    }

    #[test]
    fn test_priority_rotates_within_band() {
        let mut k = registered_with(KernelConfig::PRIORITY, [3, 1, 2, 1]);
        let order = picks(&mut k, 4);
        assert_eq!(&order[..4], &[1, 3, 1, 3]);
    }

    #[test]
    fn test_priority_falls_back_when_band_unavailable() {
        let mut k = registered_with(KernelConfig::PRIORITY, [3, 1, 2, 1]);
        k.tcbs[1].blocked_on = Some(SemaphoreId::new(4));
        k.tcbs[3].sleep = 10;
        assert_eq!(k.schedule(), TaskId(2));

        k.tcbs[2].sleep = 1;
        assert_eq!(k.schedule(), TaskId(0));
    }

    #[test]
    fn test_priority_may_reselect_running_thread() {
        let mut k = registered_with(KernelConfig::PRIORITY, [0, 5, 5, 5]);
        assert_eq!(k.schedule(), TaskId(0));
        assert_eq!(k.schedule(), TaskId(0));
    }

    #[test]
    fn test_sleep_duration() {
        let mut k = registered(KernelConfig::BLOCKING);
        k.sleep(3);
        assert!(k.take_reschedule());
        assert_eq!(k.state(TaskId(0)), TaskState::Sleeping(3));
        k.schedule();

        // Not eligible for the next 2 ticks, eligible exactly at the 3rd.
        for remaining in [2, 1] {
            k.tick();
            assert_eq!(k.state(TaskId(0)), TaskState::Sleeping(remaining));
            for _ in 0..4 {
                assert_ne!(k.schedule(), TaskId(0));
            }
        }
        k.tick();
        assert_eq!(k.state(TaskId(0)), TaskState::Runnable);
    }

    #[test]
    fn test_sleep_zero_only_yields() {
        let mut k = registered(KernelConfig::BLOCKING);
        k.sleep(0);
        assert!(k.take_reschedule());
        assert_eq!(k.state(TaskId(0)), TaskState::Runnable);
        assert_eq!(k.schedule(), TaskId(1));
    }

    #[test]
    fn test_tick_ages_every_sleeper() {
        let mut k = registered(KernelConfig::BLOCKING);
        k.tcbs[1].sleep = 1;
        k.tcbs[2].sleep = 4;
        k.tick();
        assert_eq!(k.tcbs[1].sleep, 0);
        assert_eq!(k.tcbs[2].sleep, 3);
        assert_eq!(k.tcbs[0].sleep, 0);
        assert_eq!(k.ticks(), 1);
    }

    #[test]
    fn test_schedule_clears_reschedule() {
        let mut k = registered(KernelConfig::BLOCKING);
        k.suspend();
        k.schedule();
        assert!(!k.take_reschedule());
    }

    #[test]
    fn test_launch_reload_validation() {
        let unregistered: Scheduler<4> = Scheduler::new(KernelConfig::PRIORITY);
        assert_eq!(unregistered.launch_reload(16_000), Err(KernelError::NotRegistered));

        let k = registered(KernelConfig::PRIORITY);
        assert_eq!(k.launch_reload(16_000), Ok(15_999));
        assert_eq!(k.launch_reload(MAX_TICK_PERIOD), Ok(MAX_TICK_PERIOD - 1));
        assert_eq!(k.launch_reload(0), Err(KernelError::InvalidTickPeriod(0)));
        assert_eq!(
            k.launch_reload(MAX_TICK_PERIOD + 1),
            Err(KernelError::InvalidTickPeriod(MAX_TICK_PERIOD + 1))
        );
    }

    #[test]
    fn test_stack_pointer_save_restore() {
        let mut k = registered(KernelConfig::SPIN);
        let sp = k.stack_pointer();
        // Pretend the thread pushed four more words before being switched out.
        let deeper = sp.wrapping_sub(4);
        k.save_stack_pointer(deeper);
        assert_eq!(k.tcb(TaskId(0)).stack_pointer, STACK_WORDS - FRAME_WORDS - 4);
        assert_eq!(k.stack_pointer(), deeper);
    }

    #[test]
    #[should_panic(expected = "overflowed its stack")]
    fn test_stack_overflow_detected() {
        let mut k = registered(KernelConfig::SPIN);
        let foreign = [0u32; 4];
        k.save_stack_pointer(foreign.as_ptr());
    }

    #[test]
    fn test_reset_discards_registration() {
        let mut k = registered(KernelConfig::SPIN);
        k.reset(KernelConfig::PRIORITY);
        assert!(!k.is_registered());
        assert_eq!(k.config().policy(), SchedulePolicy::Priority);
    }
}
