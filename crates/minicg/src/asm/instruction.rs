use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    Rax,
    Rbp,
    Rsp,
    Rdi,
    Rsi,
    Rdx,
    Rcx,
    R8,
    R9,
}

impl Reg {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Reg::Rax => "rax",
            Reg::Rbp => "rbp",
            Reg::Rsp => "rsp",
            Reg::Rdi => "rdi",
            Reg::Rsi => "rsi",
            Reg::Rdx => "rdx",
            Reg::Rcx => "rcx",
            Reg::R8 => "r8",
            Reg::R9 => "r9",
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg),
    Imm(i64),
    /// `offset(%base)`
    Mem { offset: i32, base: Reg },
}

impl From<Reg> for Operand {
    fn from(reg: Reg) -> Self {
        Operand::Reg(reg)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{reg}"),
            Operand::Imm(value) => write!(f, "${value}"),
            Operand::Mem { offset, base } => write!(f, "{offset}({base})"),
        }
    }
}

/// The instruction subset the emitter produces. Two-operand forms follow AT&T
/// order: `src, dst`, with the result written to `dst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmInstruction {
    Push(Reg),
    Pop(Reg),
    Mov { src: Operand, dst: Operand },
    Add { src: Operand, dst: Operand },
    Sub { src: Operand, dst: Operand },
    Imul { src: Operand, dst: Operand },
    Jmp(String),
    Ret,
}

impl AsmInstruction {
    #[must_use]
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            AsmInstruction::Push(_) => "pushq",
            AsmInstruction::Pop(_) => "popq",
            AsmInstruction::Mov { .. } => "movq",
            AsmInstruction::Add { .. } => "addq",
            AsmInstruction::Sub { .. } => "subq",
            AsmInstruction::Imul { .. } => "imulq",
            AsmInstruction::Jmp(_) => "jmp",
            AsmInstruction::Ret => "ret",
        }
    }

    /// Operand written by this instruction, if it writes one.
    #[must_use]
    pub const fn dest(&self) -> Option<Operand> {
        match self {
            AsmInstruction::Pop(reg) => Some(Operand::Reg(*reg)),
            AsmInstruction::Mov { dst, .. }
            | AsmInstruction::Add { dst, .. }
            | AsmInstruction::Sub { dst, .. }
            | AsmInstruction::Imul { dst, .. } => Some(*dst),
            AsmInstruction::Push(_) | AsmInstruction::Jmp(_) | AsmInstruction::Ret => None,
        }
    }
}

impl fmt::Display for AsmInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        match self {
            AsmInstruction::Push(reg) | AsmInstruction::Pop(reg) => write!(f, "{mnemonic} {reg}"),
            AsmInstruction::Mov { src, dst }
            | AsmInstruction::Add { src, dst }
            | AsmInstruction::Sub { src, dst }
            | AsmInstruction::Imul { src, dst } => write!(f, "{mnemonic} {src}, {dst}"),
            AsmInstruction::Jmp(label) => write!(f, "{mnemonic} {label}"),
            AsmInstruction::Ret => write!(f, "{mnemonic}"),
        }
    }
}
