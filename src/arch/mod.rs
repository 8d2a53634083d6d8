//! # Architecture Abstraction Layer
//!
//! Provides the hardware boundary for the kernel. The Cortex-M4 core port
//! (context switch, SysTick, first-thread launch) and the TM4C123 board
//! peripherals (time-base timer, edge-trigger input) are compiled for bare-metal
//! ARM targets; everywhere else a host stand-in is used so the kernel logic
//! builds and tests natively.
//!
//! The kernel only ever talks to [`port`].

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod tm4c123;

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub mod host;

/// Operations the kernel needs from the hardware.
///
/// - `start(reload) -> !`: start the time base and the slice timer, launch
///   the thread at the run pointer.
/// - `suspend()`: request a context switch as soon as interrupts allow.
/// - `arm_edge(edge, priority)` / `rearm_edge()`: configure and re-enable
///   the edge-trigger input.
pub mod port {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    pub use super::cortex_m4::{start, suspend};
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    pub use super::tm4c123::{arm_edge, rearm_edge};

    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    pub use super::host::{arm_edge, rearm_edge, start, suspend};
}
