//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) core: the
//! context-switch trampoline in PendSV, the SysTick slice timer and the
//! first-thread launch.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model:
//! - **MSP** (Main Stack Pointer): used by `main` and every interrupt handler
//! - **PSP** (Process Stack Pointer): used by threads in Thread mode
//!
//! On exception entry the hardware stacks R0–R3, R12, LR, PC and xPSR onto the
//! process stack. PendSV pushes R4–R11 below them, hands the resulting PSP to
//! [`kernel::switch_context`], and unwinds the same way from the stack pointer
//! it gets back.
//!
//! SysTick only pends PendSV, so every switch (slice expiry or suspend) goes
//! through the same path.
//!
//! ## Interrupt Priorities (3 implemented bits, 0 highest)
//!
//! - Time-base timer: `TIME_BASE_PRIORITY`
//! - SysTick: `SYSTICK_PRIORITY` (lowest)
//! - PendSV: lowest, so it never preempts a device handler
//!
//! Threads must not use the FPU: build for `thumbv7em-none-eabi`, where the
//! 8-word basic frame is always the one stacked.

use core::arch::{asm, global_asm};

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};
use cortex_m_rt::exception;

use crate::arch::tm4c123;
use crate::config::{SYSTICK_PRIORITY, TICK_HZ, TIME_BASE_PRIORITY};
use crate::kernel;

/// Priority register value for the lowest priority level.
const LOWEST_PRIORITY: u8 = 0xE0;

/// Convert a 0..=7 priority level to the register encoding.
#[inline]
pub const fn priority_bits(level: u8) -> u8 {
    (level & 0x07) << 5
}

// ---------------------------------------------------------------------------
// Launch
// ---------------------------------------------------------------------------

/// Start the kernel: configure exception priorities, the time base and the
/// slice timer, then enter the thread at the run pointer. Does not return.
pub fn start(reload: u32) -> ! {
    cortex_m::interrupt::disable();

    // SAFETY: the kernel is the only owner of SCB priorities and SYST once
    // launched; `main` never takes the peripherals.
    let mut cp = unsafe { cortex_m::Peripherals::steal() };
    set_interrupt_priorities(&mut cp.SCB);
    tm4c123::init_time_base(TICK_HZ, TIME_BASE_PRIORITY);
    configure_systick(&mut cp.SYST, reload);

    let first = kernel::first_stack_pointer();
    // SAFETY: `first` points at the initial frame written by `add_threads`.
    unsafe { start_first_task(first) }
}

/// Configure SysTick to expire every `reload + 1` core-clock cycles.
pub fn configure_systick(syst: &mut SYST, reload: u32) {
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// SysTick at `SYSTICK_PRIORITY`, PendSV at the lowest level.
pub fn set_interrupt_priorities(scb: &mut SCB) {
    // SAFETY: priorities are set with interrupts disabled, before any
    // priority-based critical section exists.
    unsafe {
        scb.set_priority(SystemHandler::SysTick, priority_bits(SYSTICK_PRIORITY));
        scb.set_priority(SystemHandler::PendSV, LOWEST_PRIORITY);
    }
}

/// Switch Thread mode to PSP and branch into the first thread.
///
/// The trampoline-saved half of the frame (R4–R11) is skipped; the hardware
/// half is popped by hand since this is not a real exception return.
///
/// # Safety
/// Must only be called once, with interrupts disabled, with `psp` pointing
/// at a frame built by [`init_frame`](crate::stack::init_frame).
pub unsafe fn start_first_task(psp: *const u32) -> ! {
    asm!(
        "adds r0, #32",        // Skip R4-R11 (8 x 4 bytes)
        "msr psp, r0",
        "movs r0, #2",         // CONTROL.SPSEL = 1: Thread mode uses PSP
        "msr control, r0",
        "isb",
        "pop {{r0-r3, r12}}",
        "pop {{r4}}",          // LR placeholder, threads never return
        "pop {{r5}}",          // PC
        "pop {{r6}}",          // xPSR
        "orr r5, r5, #1",      // Thumb state for the branch
        "cpsie i",
        "bx r5",
        in("r0") psp,
        options(noreturn)
    );
}

// ---------------------------------------------------------------------------
// Suspend
// ---------------------------------------------------------------------------

/// Pend a switch away from the running thread. Restarts the slice counter
/// so the next thread gets a full slice.
#[inline]
pub fn suspend() {
    // SAFETY: CVR is write-to-clear; any write only resets the count.
    unsafe { (*SYST::PTR).cvr.write(0) };
    SCB::set_pendst();
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

// ---------------------------------------------------------------------------
// SysTick and PendSV
// ---------------------------------------------------------------------------

#[exception]
fn SysTick() {
    SCB::set_pendsv();
}

// PendSV: save R4-R11 below the hardware frame, swap stacks through the
// kernel, restore. r4 is pushed alongside lr only to keep MSP 8-byte aligned
// across the call.
global_asm!(
    ".section .text.PendSV,\"ax\",%progbits",
    ".global PendSV",
    ".type PendSV,%function",
    ".thumb_func",
    "PendSV:",
    "    cpsid i",
    "    mrs r0, psp",
    "    stmdb r0!, {{r4-r11}}",
    "    push {{r4, lr}}",
    "    bl {switch}",
    "    pop {{r4, lr}}",
    "    ldmia r0!, {{r4-r11}}",
    "    msr psp, r0",
    "    cpsie i",
    "    bx lr",
    ".size PendSV, . - PendSV",
    switch = sym ringos_switch_context,
);

extern "C" fn ringos_switch_context(psp: *mut u32) -> *mut u32 {
    kernel::switch_context(psp)
}
