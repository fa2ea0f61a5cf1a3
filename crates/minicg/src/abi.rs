//! x86-64 register roles and frame constants.
//!
//! Only the System V argument registers are used as the temporary cache; `rax`
//! carries the return value and `rbp` anchors every frame slot.

use crate::asm::Reg;

/// Registers the cache may hand out, in allocation order.
pub const CACHE_REGS: [Reg; 6] = [Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9];

/// Return value register.
pub const RETURN_REG: Reg = Reg::Rax;

/// Frame base; every frame slot is addressed as `offset(%rbp)`.
pub const FRAME_PTR_REG: Reg = Reg::Rbp;

pub const STACK_PTR_REG: Reg = Reg::Rsp;

/// Minimum size of a frame slot. Narrower declared types are widened so every
/// value moves with a single `movq`.
pub const MIN_SLOT_SIZE: u32 = 8;

/// Size of the home slot given to each IR temporary.
pub const TEMP_SLOT_SIZE: u32 = 8;

/// Reserved stack space is rounded up to this, keeping `%rsp` aligned.
pub const STACK_ALIGN: u32 = 16;

/// Largest frame whose slot offsets and `subq $N, %rsp` fit a signed 32-bit
/// displacement: `i32::MAX` rounded down to [`STACK_ALIGN`].
pub const MAX_FRAME_SIZE: u32 = 0x7fff_fff0;

/// Scratch register for 64-bit immediates that cannot be encoded inline.
/// `%rax` is only written by `return`, which ends the body.
pub const SCRATCH_REG: Reg = Reg::Rax;

/// Label the body jumps to on `return`.
#[must_use]
pub fn epilogue_label(function: &str) -> String {
    format!(".L{function}_end")
}
