//! # Events
//!
//! Two ways for the outside world to drive threads:
//!
//! - **Periodic events**: up to [`NUM_PERIODIC`] entries, each either a short
//!   callback or a semaphore to signal, dispatched from the time-base tick.
//!   Counters start at `-periodic_lead`, so the first firing of a period-`p`
//!   event happens `lead + p` ticks after registration. The lead lets the
//!   threads reach their first `wait` before any event arrives.
//! - **Edge trigger**: a single input pin. Its interrupt signals the bound
//!   semaphore once and disarms itself; a thread re-arms it with
//!   `edge_trigger_restart` after debouncing.
//!
//! Callbacks run in interrupt context and must not block or sleep. They are
//! handed back to the caller of [`Scheduler::tick`] rather than invoked here
//! so they execute after the kernel state has been released.

use heapless::Vec;

use crate::config::NUM_PERIODIC;
use crate::error::KernelError;
use crate::scheduler::Scheduler;
use crate::semaphore::SemaphoreId;

/// A periodic callback.
pub type EventFn = fn();

/// Callbacks due on one tick.
pub type Callbacks = Vec<EventFn, NUM_PERIODIC>;

#[derive(Debug, Clone, Copy)]
pub enum EventAction {
    Call(EventFn),
    Signal(SemaphoreId),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PeriodicEvent {
    action: EventAction,
    period: u32,
    /// Ticks since the last firing. Negative during the start-up lead.
    counter: i64,
}

pub(crate) type PeriodicTable = Vec<PeriodicEvent, NUM_PERIODIC>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// High-to-low transition (switch to ground with a pull-up).
    Falling,
    Rising,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct EdgeTrigger {
    sem: Option<SemaphoreId>,
    edge: Edge,
    priority: u8,
    armed: bool,
}

impl EdgeTrigger {
    pub(crate) const fn new() -> Self {
        Self {
            sem: None,
            edge: Edge::Falling,
            priority: 0,
            armed: false,
        }
    }
}

impl<const N: usize> Scheduler<N> {
    /// Register a periodic action every `period` ticks. Returns its slot.
    pub fn add_periodic(&mut self, action: EventAction, period: u32) -> Result<usize, KernelError> {
        if period == 0 {
            return Err(KernelError::ZeroPeriod);
        }
        let event = PeriodicEvent {
            action,
            period,
            counter: -i64::from(self.config.periodic_lead()),
        };
        if self.periodic.push(event).is_err() {
            log::warn!("periodic table full ({} slots)", NUM_PERIODIC);
            return Err(KernelError::PeriodicTableFull);
        }
        let slot = self.periodic.len() - 1;
        log::info!("periodic slot {}: every {} ticks", slot, period);
        Ok(slot)
    }

    /// Signal `sem` every `period` ticks.
    pub fn period_trigger(&mut self, sem: SemaphoreId, period: u32) -> Result<usize, KernelError> {
        self.add_periodic(EventAction::Signal(sem), period)
    }

    pub(crate) fn dispatch_periodic(&mut self) -> Callbacks {
        let mut due = Callbacks::new();
        let mut fired = false;

        for i in 0..self.periodic.len() {
            let event = &mut self.periodic[i];
            event.counter += 1;
            if event.counter < i64::from(event.period) {
                continue;
            }
            event.counter = 0;
            let action = event.action;
            fired = true;
            match action {
                EventAction::Call(f) => {
                    // Capacity equals the table size.
                    let _ = due.push(f);
                }
                EventAction::Signal(sem) => {
                    self.signal(sem);
                }
            }
        }

        if fired && self.config.suspend_on_event() {
            self.reschedule = true;
        }
        due
    }

    /// Bind the edge trigger to `sem` and arm it.
    pub fn edge_trigger_init(&mut self, sem: SemaphoreId, edge: Edge, priority: u8) {
        self.edge = EdgeTrigger {
            sem: Some(sem),
            edge,
            priority,
            armed: true,
        };
        log::info!("edge trigger armed: {:?} edge, sem {}, priority {}", edge, sem.raw(), priority);
    }

    /// Interrupt body for the edge trigger. Signals at most once per arming.
    /// Returns whether a signal was issued.
    pub fn edge_event(&mut self) -> bool {
        let trigger = &mut self.edge;
        let sem = match trigger.sem {
            Some(sem) if trigger.armed => sem,
            _ => return false,
        };
        trigger.armed = false;
        self.signal(sem);
        true
    }

    /// Re-arm the edge trigger after it fired.
    pub fn edge_trigger_restart(&mut self) -> Result<(), KernelError> {
        if self.edge.sem.is_none() {
            return Err(KernelError::EdgeNotConfigured);
        }
        self.edge.armed = true;
        Ok(())
    }

    #[inline]
    pub fn edge_armed(&self) -> bool {
        self.edge.armed
    }

    /// Configured edge and interrupt priority, if bound.
    pub fn edge_config(&self) -> Option<(Edge, u8)> {
        self.edge.sem.map(|_| (self.edge.edge, self.edge.priority))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::scheduler::tests::{registered, registered_with};
    use crate::task::TaskId;

    const SAMPLE: SemaphoreId = SemaphoreId::new(3);
    const BUTTON: SemaphoreId = SemaphoreId::new(4);

    fn noop() {}

    /// Tick `n` times, recording which ticks signalled `sem`.
    fn ticks_until_signalled<const N: usize>(k: &mut Scheduler<N>, sem: SemaphoreId, n: usize) -> [bool; 32] {
        let mut out = [false; 32];
        for hit in out.iter_mut().take(n) {
            let before = k.semaphore_value(sem);
            k.tick();
            *hit = k.semaphore_value(sem) > before;
        }
        out
    }

    #[test]
    fn test_period_without_lead() {
        let mut k = registered(KernelConfig::BLOCKING);
        k.init_semaphore(SAMPLE, 0);
        k.period_trigger(SAMPLE, 3).unwrap();

        let hits = ticks_until_signalled(&mut k, SAMPLE, 9);
        assert_eq!(&hits[..9], &[false, false, true, false, false, true, false, false, true]);
    }

    #[test]
    fn test_first_fire_after_lead() {
        let mut k = registered(KernelConfig::PRIORITY);
        let lead = KernelConfig::PRIORITY.periodic_lead() as usize;
        k.init_semaphore(SAMPLE, 0);
        k.period_trigger(SAMPLE, 2).unwrap();

        let hits = ticks_until_signalled(&mut k, SAMPLE, lead + 4);
        let first = hits.iter().position(|&h| h).unwrap();
        assert_eq!(first + 1, lead + 2);
        assert!(hits[lead + 3]);
    }

    #[test]
    fn test_callbacks_returned_not_invoked() {
        let mut k = registered(KernelConfig::BLOCKING);
        k.add_periodic(EventAction::Call(noop), 1).unwrap();
        let due = k.tick();
        assert_eq!(due.len(), 1);
        assert!(!k.take_reschedule(), "BLOCKING preset does not suspend on events");
    }

    #[test]
    fn test_event_forces_suspend_when_configured() {
        let mut k = registered_with(KernelConfig::PRIORITY, [0; 4]);
        k.add_periodic(EventAction::Call(noop), 1).unwrap();
        for _ in 0..KernelConfig::PRIORITY.periodic_lead() {
            assert!(k.tick().is_empty());
            assert!(!k.take_reschedule());
        }
        assert_eq!(k.tick().len(), 1);
        assert!(k.take_reschedule());
    }

    #[test]
    fn test_periodic_signal_wakes_blocked_thread() {
        let mut k = registered(KernelConfig::BLOCKING);
        k.init_semaphore(SAMPLE, 0);
        k.period_trigger(SAMPLE, 2).unwrap();

        k.wait(SAMPLE);
        k.schedule();
        assert!(!k.tcb(TaskId(0)).is_runnable());

        k.tick();
        k.tick();
        assert!(k.tcb(TaskId(0)).is_runnable());
        assert_eq!(k.semaphore_value(SAMPLE), 0);
    }

    #[test]
    fn test_periodic_registration_errors() {
        let mut k = registered(KernelConfig::BLOCKING);
        assert_eq!(k.add_periodic(EventAction::Call(noop), 0), Err(KernelError::ZeroPeriod));
        for slot in 0..NUM_PERIODIC {
            assert_eq!(k.add_periodic(EventAction::Call(noop), 10), Ok(slot));
        }
        assert_eq!(
            k.period_trigger(SAMPLE, 10),
            Err(KernelError::PeriodicTableFull)
        );
    }

    #[test]
    fn test_edge_signals_once_until_restart() {
        let mut k = registered(KernelConfig::BLOCKING);
        k.init_semaphore(BUTTON, 0);
        k.edge_trigger_init(BUTTON, Edge::Falling, 2);
        assert_eq!(k.edge_config(), Some((Edge::Falling, 2)));

        // A bouncing switch raises several edges.
        assert!(k.edge_event());
        assert!(!k.edge_event());
        assert!(!k.edge_event());
        assert_eq!(k.semaphore_value(BUTTON), 1);
        assert!(!k.edge_armed());

        k.edge_trigger_restart().unwrap();
        assert!(k.edge_event());
        assert_eq!(k.semaphore_value(BUTTON), 2);
    }

    #[test]
    fn test_edge_restart_requires_binding() {
        let mut k = registered(KernelConfig::BLOCKING);
        assert_eq!(k.edge_trigger_restart(), Err(KernelError::EdgeNotConfigured));
        assert!(!k.edge_event());
        assert_eq!(k.edge_config(), None);
    }
}
