//! # Ring OS Demo Firmware
//!
//! A small data-acquisition application on the priority preset:
//!
//! | Thread       | Priority | Behavior                                        |
//! |--------------|----------|-------------------------------------------------|
//! | `control`    | 0        | Runs every 10 ms on a periodic trigger          |
//! | `filter`     | 1        | Averages FIFO samples, mails the result         |
//! | `button`     | 1        | Counts debounced presses on the edge trigger    |
//! | `display`    | 2        | Publishes mailbox values under a mutex          |
//! | `heartbeat`  | 3        | Sleeps 500 ms between beats                     |
//! | `stats`      | 3        | Samples the lost-data counters once a second    |
//! | `background` | 4        | Busy work that yields between batches           |
//! | `idle`       | 254      | Always runnable                                 |
//!
//! A 1 kHz periodic callback stands in for an ADC and feeds the FIFO.

#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std)]
#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_main)]

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod firmware {
    use core::convert::Infallible;
    use core::sync::atomic::{AtomicU32, Ordering};

    use cortex_m_rt::entry;
    use panic_halt as _;

    use ringos::config::{KernelConfig, SYSTEM_CLOCK_HZ};
    use ringos::error::KernelError;
    use ringos::event::Edge;
    use ringos::kernel;
    use ringos::semaphore::SemaphoreId;
    use ringos::task::ThreadSpec;

    const DISPLAY: SemaphoreId = SemaphoreId::new(0);
    const CONTROL_TICK: SemaphoreId = SemaphoreId::new(1);
    const BUTTON: SemaphoreId = SemaphoreId::new(2);

    /// 2 ms slices.
    const SLICE_CYCLES: u32 = SYSTEM_CLOCK_HZ / 500;
    const CONTROL_PERIOD: u32 = 10;
    const DEBOUNCE_TICKS: u32 = 20;
    const FILTER_TAPS: u32 = 4;
    const BUTTON_PRIORITY: u8 = 2;

    static ADC: AtomicU32 = AtomicU32::new(0);
    static LATEST: AtomicU32 = AtomicU32::new(0);
    static ACTUATOR: AtomicU32 = AtomicU32::new(0);
    static SHOWN: AtomicU32 = AtomicU32::new(0);
    static PRESSES: AtomicU32 = AtomicU32::new(0);
    static BEATS: AtomicU32 = AtomicU32::new(0);
    static LOST: AtomicU32 = AtomicU32::new(0);
    static IDLE: AtomicU32 = AtomicU32::new(0);

    // -----------------------------------------------------------------------
    // Periodic event
    // -----------------------------------------------------------------------

    /// Sawtooth stand-in for a 12-bit ADC conversion.
    fn sample() {
        let raw = ADC.fetch_add(7, Ordering::Relaxed) & 0x0FFF;
        LATEST.store(raw, Ordering::Relaxed);
        // A full FIFO is counted by the kernel.
        let _ = kernel::fifo_put(raw);
    }

    // -----------------------------------------------------------------------
    // Main threads
    // -----------------------------------------------------------------------

    extern "C" fn control() -> ! {
        let mut integral: u32 = 0;
        loop {
            kernel::wait(CONTROL_TICK);
            let error = 2048u32.abs_diff(LATEST.load(Ordering::Relaxed));
            integral = integral.wrapping_add(error) & 0xFFFF;
            ACTUATOR.store(error / 2 + integral / 64, Ordering::Relaxed);
        }
    }

    extern "C" fn filter() -> ! {
        loop {
            let mut sum = 0;
            for _ in 0..FILTER_TAPS {
                sum += kernel::fifo_get();
            }
            kernel::mailbox_send(sum / FILTER_TAPS);
        }
    }

    extern "C" fn button() -> ! {
        loop {
            kernel::wait(BUTTON);
            PRESSES.fetch_add(1, Ordering::Relaxed);
            kernel::sleep(DEBOUNCE_TICKS);
            if let Err(err) = kernel::edge_trigger_restart() {
                log::warn!("button: {}", err);
            }
        }
    }

    extern "C" fn display() -> ! {
        loop {
            let value = kernel::mailbox_recv();
            kernel::wait(DISPLAY);
            SHOWN.store(value, Ordering::Relaxed);
            kernel::signal(DISPLAY);
        }
    }

    extern "C" fn heartbeat() -> ! {
        loop {
            kernel::sleep(500);
            BEATS.fetch_add(1, Ordering::Relaxed);
        }
    }

    extern "C" fn stats() -> ! {
        loop {
            kernel::sleep(1000);
            kernel::wait(DISPLAY);
            LOST.store(kernel::fifo_lost() + kernel::mailbox_lost(), Ordering::Relaxed);
            kernel::signal(DISPLAY);
        }
    }

    extern "C" fn background() -> ! {
        let mut checksum: u32 = 0;
        loop {
            for i in 0..1_000u32 {
                checksum = checksum.rotate_left(5) ^ i;
            }
            core::hint::black_box(checksum);
            kernel::suspend();
        }
    }

    extern "C" fn idle() -> ! {
        loop {
            IDLE.fetch_add(1, Ordering::Relaxed);
        }
    }

    // -----------------------------------------------------------------------
    // Entry
    // -----------------------------------------------------------------------

    fn setup() -> Result<(), KernelError> {
        kernel::init(KernelConfig::PRIORITY);

        kernel::init_semaphore(DISPLAY, 1)?;
        kernel::init_semaphore(CONTROL_TICK, 0)?;
        kernel::init_semaphore(BUTTON, 0)?;
        kernel::fifo_init();
        kernel::mailbox_init();

        kernel::add_threads([
            ThreadSpec::with_priority(control, 0),
            ThreadSpec::with_priority(filter, 1),
            ThreadSpec::with_priority(button, 1),
            ThreadSpec::with_priority(display, 2),
            ThreadSpec::with_priority(heartbeat, 3),
            ThreadSpec::with_priority(stats, 3),
            ThreadSpec::with_priority(background, 4),
            ThreadSpec::with_priority(idle, 254),
        ])?;

        kernel::add_periodic_event(sample, 1)?;
        kernel::period_trigger(CONTROL_TICK, CONTROL_PERIOD)?;
        kernel::edge_trigger_init(BUTTON, Edge::Falling, BUTTON_PRIORITY);
        Ok(())
    }

    #[entry]
    fn main() -> ! {
        let launched: Result<Infallible, KernelError> =
            setup().and_then(|()| kernel::launch(SLICE_CYCLES));
        match launched {
            Ok(never) => match never {},
            Err(err) => panic!("kernel setup failed: {}", err),
        }
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {
    eprintln!("ringos: firmware image; build for thumbv7em-none-eabi. Kernel tests run with `cargo test`.");
}
