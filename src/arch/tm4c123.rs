//! # TM4C123 Board Peripherals
//!
//! The two device interrupts the kernel owns:
//!
//! | Source        | IRQ | Role                                         |
//! |---------------|-----|----------------------------------------------|
//! | Timer 2A      | 23  | Time base: sleep aging, periodic events      |
//! | GPIO Port D   | 3   | Edge trigger on PD6                          |
//!
//! Without a device crate, cortex-m-rt routes every device interrupt to
//! `DefaultHandler`, which dispatches on the IRQ number.

use core::ptr::{read_volatile, write_volatile};

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;
use cortex_m_rt::exception;

use crate::arch::cortex_m4::priority_bits;
use crate::config::SYSTEM_CLOCK_HZ;
use crate::event::Edge;
use crate::kernel;

/// Device interrupts used by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Irq {
    GpioPortD = 3,
    Timer2A = 23,
}

// SAFETY: discriminants are valid TM4C123 IRQ numbers.
unsafe impl InterruptNumber for Irq {
    #[inline]
    fn number(self) -> u16 {
        self as u16
    }
}

// ---------------------------------------------------------------------------
// Registers
// ---------------------------------------------------------------------------

/// A memory-mapped 32-bit register.
#[derive(Clone, Copy)]
struct Reg(usize);

impl Reg {
    #[inline]
    fn read(self) -> u32 {
        // SAFETY: every `Reg` constant below is a valid, aligned MMIO address.
        unsafe { read_volatile(self.0 as *const u32) }
    }

    #[inline]
    fn write(self, value: u32) {
        // SAFETY: as above.
        unsafe { write_volatile(self.0 as *mut u32, value) }
    }

    #[inline]
    fn modify(self, f: impl FnOnce(u32) -> u32) {
        self.write(f(self.read()));
    }
}

const SYSCTL_RCGCTIMER: Reg = Reg(0x400F_E604);
const SYSCTL_RCGCGPIO: Reg = Reg(0x400F_E608);
const SYSCTL_PRTIMER: Reg = Reg(0x400F_EA04);
const SYSCTL_PRGPIO: Reg = Reg(0x400F_EA08);

const TIMER2: usize = 0x4003_2000;
const TIMER2_CFG: Reg = Reg(TIMER2);
const TIMER2_TAMR: Reg = Reg(TIMER2 + 0x004);
const TIMER2_CTL: Reg = Reg(TIMER2 + 0x00C);
const TIMER2_IMR: Reg = Reg(TIMER2 + 0x018);
const TIMER2_ICR: Reg = Reg(TIMER2 + 0x024);
const TIMER2_TAILR: Reg = Reg(TIMER2 + 0x028);
const TIMER2_TAPR: Reg = Reg(TIMER2 + 0x038);

const GPIOD: usize = 0x4000_7000;
const GPIOD_DIR: Reg = Reg(GPIOD + 0x400);
const GPIOD_IS: Reg = Reg(GPIOD + 0x404);
const GPIOD_IBE: Reg = Reg(GPIOD + 0x408);
const GPIOD_IEV: Reg = Reg(GPIOD + 0x40C);
const GPIOD_IM: Reg = Reg(GPIOD + 0x410);
const GPIOD_ICR: Reg = Reg(GPIOD + 0x41C);
const GPIOD_AFSEL: Reg = Reg(GPIOD + 0x420);
const GPIOD_PUR: Reg = Reg(GPIOD + 0x510);
const GPIOD_DEN: Reg = Reg(GPIOD + 0x51C);
const GPIOD_AMSEL: Reg = Reg(GPIOD + 0x528);
const GPIOD_PCTL: Reg = Reg(GPIOD + 0x52C);

const RCGC_TIMER2: u32 = 1 << 2;
const RCGC_PORTD: u32 = 1 << 3;
const TIMER_32_BIT: u32 = 0x0;
const TAMR_PERIODIC: u32 = 0x2;
const CTL_TAEN: u32 = 1 << 0;
const TATO: u32 = 1 << 0;
const PD6: u32 = 1 << 6;
const PCTL_PD6: u32 = 0x0F00_0000;

fn set_priority(irq: Irq, level: u8) {
    // SAFETY: only the kernel configures these two lines.
    unsafe {
        let mut nvic = cortex_m::Peripherals::steal().NVIC;
        nvic.set_priority(irq, priority_bits(level));
    }
}

// ---------------------------------------------------------------------------
// Time base
// ---------------------------------------------------------------------------

/// Start Timer 2A as a periodic `hz` interrupt at `level`.
pub fn init_time_base(hz: u32, level: u8) {
    SYSCTL_RCGCTIMER.modify(|v| v | RCGC_TIMER2);
    while SYSCTL_PRTIMER.read() & RCGC_TIMER2 == 0 {}

    TIMER2_CTL.write(0);
    TIMER2_CFG.write(TIMER_32_BIT);
    TIMER2_TAMR.write(TAMR_PERIODIC);
    TIMER2_TAILR.write(SYSTEM_CLOCK_HZ / hz - 1);
    TIMER2_TAPR.write(0);
    TIMER2_ICR.write(TATO);
    TIMER2_IMR.write(TATO);

    set_priority(Irq::Timer2A, level);
    // SAFETY: the handler is ready and only touches kernel state through
    // critical sections.
    unsafe { NVIC::unmask(Irq::Timer2A) };
    TIMER2_CTL.write(CTL_TAEN);
}

fn time_base_isr() {
    TIMER2_ICR.write(TATO);
    kernel::time_base_tick();
}

// ---------------------------------------------------------------------------
// Edge trigger
// ---------------------------------------------------------------------------

/// Configure PD6 as an edge-sensitive input. A falling edge expects a switch
/// to ground and enables the internal pull-up.
pub fn arm_edge(edge: Edge, level: u8) {
    SYSCTL_RCGCGPIO.modify(|v| v | RCGC_PORTD);
    while SYSCTL_PRGPIO.read() & RCGC_PORTD == 0 {}

    GPIOD_DIR.modify(|v| v & !PD6);
    GPIOD_AFSEL.modify(|v| v & !PD6);
    GPIOD_AMSEL.modify(|v| v & !PD6);
    GPIOD_PCTL.modify(|v| v & !PCTL_PD6);
    GPIOD_DEN.modify(|v| v | PD6);
    match edge {
        Edge::Falling => {
            GPIOD_PUR.modify(|v| v | PD6);
            GPIOD_IEV.modify(|v| v & !PD6);
        }
        Edge::Rising => GPIOD_IEV.modify(|v| v | PD6),
    }
    GPIOD_IS.modify(|v| v & !PD6);
    GPIOD_IBE.modify(|v| v & !PD6);
    GPIOD_ICR.write(PD6);
    GPIOD_IM.modify(|v| v | PD6);

    set_priority(Irq::GpioPortD, level);
    rearm_edge();
}

/// Clear any edge latched while disarmed and unmask the input.
pub fn rearm_edge() {
    GPIOD_ICR.write(PD6);
    // SAFETY: see `init_time_base`.
    unsafe { NVIC::unmask(Irq::GpioPortD) };
}

fn edge_isr() {
    GPIOD_ICR.write(PD6);
    kernel::edge_interrupt();
    NVIC::mask(Irq::GpioPortD);
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    match irqn {
        n if n == Irq::Timer2A as i16 => time_base_isr(),
        n if n == Irq::GpioPortD as i16 => edge_isr(),
        _ => {
            log::warn!("unhandled interrupt {}", irqn);
            if let Ok(n) = u16::try_from(irqn) {
                NVIC::mask(Stray(n));
            }
        }
    }
}

/// An IRQ number the kernel does not own.
#[derive(Clone, Copy)]
struct Stray(u16);

// SAFETY: only built from the number of the interrupt being serviced.
unsafe impl InterruptNumber for Stray {
    fn number(self) -> u16 {
        self.0
    }
}
