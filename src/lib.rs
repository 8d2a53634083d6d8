//! # Ring OS
//!
//! A small preemptive real-time kernel for ARM Cortex-M4 microcontrollers
//! (TM4C123), grown in stages from a plain round-robin switcher into a
//! priority scheduler with blocking semaphores and event-driven dispatch.
//!
//! ## Overview
//!
//! A fixed set of main threads is registered once, linked into a ring and
//! time-sliced by SysTick. On top of that preemptive core:
//!
//! - **Semaphores** that either spin or block the caller
//! - **Sleep** and cooperative **suspend**
//! - A bounded **FIFO** and a single-slot **mailbox** from interrupt-context
//!   producers to thread consumers
//! - **Periodic events** (callbacks or semaphore signals from a 1 kHz time
//!   base) and an **edge trigger** on an input pin
//!
//! The scheduling and semaphore behaviour is chosen once at setup through
//! [`KernelConfig`](config::KernelConfig).
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │          Main threads · event callbacks · ISRs          │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │   init · add_threads · launch · wait · signal · sleep   │
//! ├──────────────┬──────────────────┬──────────────────────┤
//! │  Scheduler   │  Channels        │  Events              │
//! │  scheduler.rs│  fifo.rs         │  event.rs            │
//! │  semaphore.rs│  mailbox.rs      │  ─ periodic table    │
//! │  ─ schedule()│                  │  ─ edge trigger      │
//! │  ─ tick()    │                  │                      │
//! ├──────────────┴──────────────────┴──────────────────────┤
//! │   Threads (task.rs) · Stacks (stack.rs) · sync.rs      │
//! ├────────────────────────────────────────────────────────┤
//! │   Port (arch/): cortex_m4 · tm4c123 · host stand-in     │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **Fixed thread ring**: `[Tcb; NUM_THREADS]` linked by index
//! - **Per-thread stack**: `[u32; STACK_WORDS]`, one arena entry per thread
//! - **Critical sections**: `critical-section`, backed by `cortex-m` on target

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod sync;
pub mod task;
pub mod stack;
pub mod scheduler;
pub mod semaphore;
pub mod fifo;
pub mod mailbox;
pub mod event;
pub mod kernel;
pub mod arch;
