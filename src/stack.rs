//! # Stack Arena and Initial Frame
//!
//! Each thread owns one `Stack` of `STACK_WORDS` words. Before the scheduler
//! starts, [`init_frame`] writes a synthetic "interrupted" register image at
//! the top of the stack so the first switch into the thread is
//! indistinguishable from resuming a preempted one.
//!
//! ## Frame Layout (top = high address, growing down)
//!
//! ```text
//! [Hardware stacked frame]
//!   xPSR  0x0100_0000 (Thumb bit)    <- STACK_WORDS - 1
//!   PC    entry point                <- STACK_WORDS - 2
//!   LR    0x1414_1414
//!   R12   0x1212_1212
//!   R3 .. R0
//! [Trampoline saved context]
//!   R11 .. R5
//!   R4    0x0404_0404                <- stack_pointer after init
//! ```
//!
//! Only PC and xPSR are load-bearing. The general-purpose registers carry
//! recognisable patterns so a debugger can spot a thread that never ran.

use crate::config::{FRAME_WORDS, STACK_WORDS};
use crate::task::TaskFn;

/// xPSR with only the Thumb execution state bit set.
pub const XPSR_THUMB: u32 = 0x0100_0000;

/// Placeholder contents for R0–R12 and LR, indexed by register number
/// (LR stored at index 13).
const PLACEHOLDER: [u32; 14] = [
    0x0000_0000, // R0
    0x0101_0101, // R1
    0x0202_0202, // R2
    0x0303_0303, // R3
    0x0404_0404, // R4
    0x0505_0505, // R5
    0x0606_0606, // R6
    0x0707_0707, // R7
    0x0808_0808, // R8
    0x0909_0909, // R9
    0x1010_1010, // R10
    0x1111_1111, // R11
    0x1212_1212, // R12
    0x1414_1414, // LR
];

/// Word offsets of the frame, counted from the bottom of the frame.
pub mod slot {
    /// R4..R11 occupy offsets 0..8.
    pub const R4: usize = 0;
    pub const R0: usize = 8;
    pub const R12: usize = 12;
    pub const LR: usize = 13;
    pub const PC: usize = 14;
    pub const XPSR: usize = 15;
}

/// One thread's private stack. Aligned to 8 bytes per AAPCS.
#[repr(C, align(8))]
#[derive(Clone, Copy)]
pub struct Stack {
    pub words: [u32; STACK_WORDS],
}

impl Stack {
    pub const EMPTY: Self = Self {
        words: [0; STACK_WORDS],
    };

    /// Address of the word at `offset`.
    #[inline]
    pub fn word_ptr(&mut self, offset: usize) -> *mut u32 {
        self.words[offset..].as_mut_ptr()
    }

    /// Word offset of `ptr` inside this stack, if it points into it.
    pub fn offset_of(&self, ptr: *const u32) -> Option<usize> {
        let base = self.words.as_ptr() as usize;
        let addr = ptr as usize;
        let end = base + STACK_WORDS * core::mem::size_of::<u32>();
        if addr < base || addr >= end || (addr - base) % 4 != 0 {
            return None;
        }
        Some((addr - base) / 4)
    }
}

/// Code address of a thread entry as it belongs in a stacked PC.
///
/// Thumb function pointers carry bit 0 set; an exception-return PC must not.
#[inline]
pub fn entry_address(entry: TaskFn) -> u32 {
    (entry as usize as u32) & !1
}

/// Write the initial register image for `entry` and return the saved stack
/// pointer (a word offset into `stack`).
///
/// Touches only the top `FRAME_WORDS` words of this stack; calling it again
/// for the same entry produces the same image.
pub fn init_frame(stack: &mut Stack, entry: TaskFn) -> usize {
    let bottom = STACK_WORDS - FRAME_WORDS;
    let frame = &mut stack.words[bottom..];

    // R4–R11, saved by the trampoline
    for (i, word) in frame[slot::R4..slot::R0].iter_mut().enumerate() {
        *word = PLACEHOLDER[4 + i];
    }
    // R0–R3, stacked by the hardware
    for (i, word) in frame[slot::R0..slot::R12].iter_mut().enumerate() {
        *word = PLACEHOLDER[i];
    }
    frame[slot::R12] = PLACEHOLDER[12];
    frame[slot::LR] = PLACEHOLDER[13];
    frame[slot::PC] = entry_address(entry);
    frame[slot::XPSR] = XPSR_THUMB;

    bottom
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn entry_a() -> ! {
        loop {}
    }

    extern "C" fn entry_b() -> ! {
        loop {}
    }

    #[test]
    fn test_frame_load_bearing_slots() {
        let mut stack = Stack::EMPTY;
        let sp = init_frame(&mut stack, entry_a);

        assert_eq!(sp, STACK_WORDS - 16);
        assert_eq!(stack.words[STACK_WORDS - 1], XPSR_THUMB);
        assert_eq!(stack.words[STACK_WORDS - 2], entry_address(entry_a));
        assert_eq!(stack.words[STACK_WORDS - 2] & 1, 0, "stacked PC must be halfword aligned");
    }

    #[test]
    fn test_frame_register_placeholders() {
        let mut stack = Stack::EMPTY;
        let sp = init_frame(&mut stack, entry_a);

        assert_eq!(stack.words[sp + slot::R4], 0x0404_0404);
        assert_eq!(stack.words[sp + slot::R4 + 7], 0x1111_1111); // R11
        assert_eq!(stack.words[sp + slot::R0], 0x0000_0000);
        assert_eq!(stack.words[sp + slot::R0 + 3], 0x0303_0303); // R3
        assert_eq!(stack.words[sp + slot::R12], 0x1212_1212);
        assert_eq!(stack.words[sp + slot::LR], 0x1414_1414);
    }

    #[test]
    fn test_frame_leaves_rest_of_stack_untouched() {
        let mut stack = Stack::EMPTY;
        stack.words[0] = 0xDEAD_BEEF;
        let sp = init_frame(&mut stack, entry_a);
        assert!(stack.words[1..sp].iter().all(|&w| w == 0));
        assert_eq!(stack.words[0], 0xDEAD_BEEF);
    }

    #[test]
    fn test_frame_idempotent() {
        let mut first = Stack::EMPTY;
        let mut second = Stack::EMPTY;
        init_frame(&mut first, entry_b);
        init_frame(&mut second, entry_b);
        init_frame(&mut second, entry_b);
        assert_eq!(first.words, second.words);
    }

    #[test]
    fn test_offset_round_trip() {
        let mut stack = Stack::EMPTY;
        let ptr = stack.word_ptr(84);
        assert_eq!(stack.offset_of(ptr), Some(84));

        let outside = [0u32; 1];
        assert_eq!(stack.offset_of(outside.as_ptr()), None);
    }
}
