//! Code generation: IR -> x86-64 assembly.
//!
//! - `regcache`: recency cache of temporaries in the six argument registers
//! - `emitter`: per-instruction lowering with spill/reload insertion
//!
//! Frame shape, for a function `f` with N bytes of slots:
//!
//! ```text
//!     .text
//!     .globl f
//!   f:
//!     pushq %rbp
//!     movq %rsp, %rbp
//!     subq $N, %rsp
//!     <body>
//!   .Lf_end:
//!     addq $N, %rsp
//!     popq %rbp
//!     ret
//! ```

mod emitter;
pub mod regcache;

pub use emitter::Emitter;
pub use regcache::{CacheEntry, RegisterCache, Resolution};

use crate::abi::{FRAME_PTR_REG, STACK_PTR_REG};
use crate::asm::{AsmFunction, AsmInstruction, Directive, Line, Note, Operand};
use crate::ir::Function;
use crate::{CompileOptions, Result};

/// Lower a laid-out IR function to assembly.
///
/// Every cell must already have a home slot (see [`Function::layout`]);
/// otherwise this fails with [`crate::Error::Internal`].
pub fn lower_function(function: &Function, options: &CompileOptions) -> Result<AsmFunction> {
    let frame_size = function.frame.size();
    let mut emitter = Emitter::new(function, options);

    emit_prologue(&mut emitter, &function.name, frame_size);
    for instr in &function.instructions {
        emitter.lower_instruction(instr)?;
    }
    emit_epilogue(&mut emitter, frame_size);

    let asm = AsmFunction {
        name: function.name.clone(),
        frame_size,
        lines: emitter.lines,
    };
    tracing::debug!(
        function = %asm.name,
        frame_size,
        lines = asm.lines.len(),
        spills = asm.count_notes(Note::Spill),
        reloads = asm.count_notes(Note::Reload),
        "lowered function"
    );
    Ok(asm)
}

fn emit_prologue(emitter: &mut Emitter<'_>, name: &str, frame_size: u32) {
    emitter.lines.push(Line::Directive(Directive::Text));
    emitter
        .lines
        .push(Line::Directive(Directive::Globl(name.to_owned())));
    emitter.label(name.to_owned());
    emitter.emit(AsmInstruction::Push(FRAME_PTR_REG));
    emitter.emit(AsmInstruction::Mov {
        src: STACK_PTR_REG.into(),
        dst: FRAME_PTR_REG.into(),
    });
    emitter.emit(AsmInstruction::Sub {
        src: Operand::Imm(i64::from(frame_size)),
        dst: STACK_PTR_REG.into(),
    });
}

fn emit_epilogue(emitter: &mut Emitter<'_>, frame_size: u32) {
    let end = emitter.end_label().to_owned();
    emitter.label(end);
    emitter.emit(AsmInstruction::Add {
        src: Operand::Imm(i64::from(frame_size)),
        dst: STACK_PTR_REG.into(),
    });
    emitter.emit(AsmInstruction::Pop(FRAME_PTR_REG));
    emitter.emit(AsmInstruction::Ret);
}
