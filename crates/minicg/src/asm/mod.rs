//! x86-64 assembly model: structured lines with AT&T-syntax rendering.

mod instruction;
mod listing;

pub use instruction::{AsmInstruction, Operand, Reg};
pub use listing::{AsmFunction, Directive, Line, Note};
