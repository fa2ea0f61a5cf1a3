//! Test harness for minicg unit and integration tests
//!
//! This module provides utilities for testing the compiler backend: AST
//! shorthands, instruction pattern matching, and a small interpreter that
//! executes the emitted x86-64 subset so tests can check computed results.
//!
//! # Example
//!
//! ```rust
//! use minicg::test_harness::*;
//!
//! let unit = function("f", vec![ret(add(int(2), mul(int(3), int(4))))]);
//! let asm = lower_default(&unit).expect("Failed to compile");
//! assert_eq!(run(&asm).expect("Failed to run"), 14);
//!
//! assert_has_pattern(
//!     &extract_instructions(&asm),
//!     &[InstructionPattern::Imul { src: Pat::Exact(Operand::Imm(4)), dst: Pat::Any }],
//! );
//! ```

#![allow(
    clippy::must_use_candidate,
    clippy::manual_assert,
    clippy::missing_panics_doc,
    clippy::uninlined_format_args
)]

use std::collections::HashMap;

use crate::abi::{FRAME_PTR_REG, STACK_PTR_REG};
use crate::ast::{Node, TranslationUnit, Type};
use crate::{CompileOptions, Error, Result};

pub use crate::asm::{AsmFunction, AsmInstruction, Line, Note, Operand, Reg};

// ── AST shorthands ──

/// A translation unit holding one function whose body is `stmts`.
pub fn function(name: &str, stmts: Vec<Node>) -> TranslationUnit {
    TranslationUnit::new(vec![Node::func(name, Node::compound(stmts))])
}

pub fn int(value: i64) -> Node {
    Node::int(value)
}

pub fn var(name: &str) -> Node {
    Node::var(name)
}

pub fn add(left: Node, right: Node) -> Node {
    Node::add(left, right)
}

pub fn mul(left: Node, right: Node) -> Node {
    Node::mul(left, right)
}

pub fn ret(value: Node) -> Node {
    Node::ret(value)
}

pub fn block(stmts: Vec<Node>) -> Node {
    Node::compound(stmts)
}

/// `int name = init;`
pub fn decl(name: &str, init: Node) -> Node {
    Node::decl(name, Type::int(), Some(init))
}

/// `int name;`
pub fn decl_uninit(name: &str) -> Node {
    Node::decl(name, Type::int(), None)
}

/// `1 + (2 + (3 + ... + n))`, nested to the right.
pub fn right_nested_sum(n: i64) -> Node {
    (1..n).rev().fold(int(n), |acc, i| add(int(i), acc))
}

/// `name + (name + (... + name))` with `count` loads of the same local.
///
/// The first load stays live while the rest of the chain is evaluated, so with
/// more than six loads it must be spilled and later reloaded.
pub fn right_nested_var_sum(name: &str, count: usize) -> Node {
    assert!(count > 0);
    (1..count).fold(var(name), |acc, _| add(var(name), acc))
}

// ── Compilation ──

/// Run the full pipeline with default options.
pub fn lower_default(unit: &TranslationUnit) -> Result<AsmFunction> {
    crate::lower(unit, &CompileOptions::default())
}

/// Compile and execute, returning `%rax` at the final `ret`.
pub fn compile_and_run(unit: &TranslationUnit) -> Result<i64> {
    run(&lower_default(unit)?)
}

/// Extract the instruction sequence from a lowered function
pub fn extract_instructions(asm: &AsmFunction) -> Vec<AsmInstruction> {
    asm.instructions().cloned().collect()
}

// ── Execution ──

const STACK_TOP: i64 = 0x7fff_0000;
const RETURN_SENTINEL: i64 = 0x0bad_c0de;
const CALLER_FRAME_PTR: i64 = 0x7fff_8000;
const STEP_LIMIT: usize = 100_000;

/// Interpreter state for the emitted instruction subset.
///
/// Reading a register or memory word that was never written is an error, as is
/// touching memory outside the reserved frame. This catches spills that were
/// never stored and frames that are too small.
#[derive(Debug, Default)]
pub struct Machine {
    regs: HashMap<Reg, i64>,
    memory: HashMap<i64, i64>,
}

impl Machine {
    pub fn reg(&self, reg: Reg) -> Result<i64> {
        self.regs
            .get(&reg)
            .copied()
            .ok_or_else(|| fault(format!("read of uninitialized register {reg}")))
    }

    fn set_reg(&mut self, reg: Reg, value: i64) {
        self.regs.insert(reg, value);
    }

    fn address(&self, offset: i32, base: Reg) -> Result<i64> {
        let addr = self.reg(base)?.wrapping_add(i64::from(offset));
        if addr % 8 != 0 {
            return Err(fault(format!("unaligned access at {addr:#x}")));
        }
        // Frame accesses must land in [%rsp, %rbp).
        if base == FRAME_PTR_REG {
            let (low, high) = (self.reg(STACK_PTR_REG)?, self.reg(FRAME_PTR_REG)?);
            if addr < low || addr + 8 > high {
                return Err(fault(format!(
                    "access at {offset}({base}) is outside the reserved frame"
                )));
            }
        }
        Ok(addr)
    }

    fn load(&self, addr: i64) -> Result<i64> {
        self.memory
            .get(&addr)
            .copied()
            .ok_or_else(|| fault(format!("read of uninitialized memory at {addr:#x}")))
    }

    fn read(&self, operand: Operand) -> Result<i64> {
        match operand {
            Operand::Reg(reg) => self.reg(reg),
            Operand::Imm(value) => Ok(value),
            Operand::Mem { offset, base } => self.load(self.address(offset, base)?),
        }
    }

    fn write(&mut self, operand: Operand, value: i64) -> Result<()> {
        match operand {
            Operand::Reg(reg) => self.set_reg(reg, value),
            Operand::Imm(_) => return Err(fault("write to an immediate operand".into())),
            Operand::Mem { offset, base } => {
                let addr = self.address(offset, base)?;
                self.memory.insert(addr, value);
            }
        }
        Ok(())
    }

    fn push(&mut self, value: i64) -> Result<()> {
        let sp = self.reg(STACK_PTR_REG)? - 8;
        self.set_reg(STACK_PTR_REG, sp);
        self.memory.insert(sp, value);
        Ok(())
    }

    fn pop(&mut self) -> Result<i64> {
        let sp = self.reg(STACK_PTR_REG)?;
        let value = self.load(sp)?;
        self.set_reg(STACK_PTR_REG, sp + 8);
        Ok(value)
    }
}

fn fault(msg: String) -> Error {
    Error::Internal(format!("execution fault: {msg}"))
}

/// Rejects operand shapes an x86-64 assembler would not accept.
fn check_encodable(instr: &AsmInstruction) -> Result<()> {
    let imm32 = |op: &Operand| match op {
        Operand::Imm(v) => i32::try_from(*v).is_ok(),
        Operand::Reg(_) | Operand::Mem { .. } => true,
    };
    match instr {
        AsmInstruction::Mov {
            src: Operand::Mem { .. },
            dst: Operand::Mem { .. },
        }
        | AsmInstruction::Add {
            src: Operand::Mem { .. },
            dst: Operand::Mem { .. },
        }
        | AsmInstruction::Sub {
            src: Operand::Mem { .. },
            dst: Operand::Mem { .. },
        } => Err(fault(format!("memory-to-memory operation: {instr}"))),
        AsmInstruction::Imul {
            dst: Operand::Mem { .. } | Operand::Imm(_),
            ..
        } => Err(fault(format!("imul needs a register destination: {instr}"))),
        // movabs: a full 64-bit immediate may only be moved into a register.
        AsmInstruction::Mov {
            src,
            dst: Operand::Reg(_),
        } if matches!(src, Operand::Imm(_)) => Ok(()),
        AsmInstruction::Mov { src, .. }
        | AsmInstruction::Add { src, .. }
        | AsmInstruction::Sub { src, .. }
        | AsmInstruction::Imul { src, .. }
            if !imm32(src) =>
        {
            Err(fault(format!("immediate does not fit in 32 bits: {instr}")))
        }
        _ => Ok(()),
    }
}

/// Execute a lowered function from its entry label and return `%rax`.
///
/// The caller's frame pointer and stack pointer must be intact on return.
pub fn run(asm: &AsmFunction) -> Result<i64> {
    let labels: HashMap<&str, usize> = asm
        .lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Line::Label(name) => Some((name.as_str(), i)),
            Line::Directive(_) | Line::Instr { .. } => None,
        })
        .collect();
    let mut pc = *labels
        .get(asm.name.as_str())
        .ok_or_else(|| fault(format!("no entry label '{}'", asm.name)))?;

    let mut m = Machine::default();
    m.set_reg(STACK_PTR_REG, STACK_TOP);
    m.set_reg(FRAME_PTR_REG, CALLER_FRAME_PTR);
    m.push(RETURN_SENTINEL)?;

    for _ in 0..STEP_LIMIT {
        let Some(line) = asm.lines.get(pc) else {
            return Err(fault("ran off the end of the function".into()));
        };
        pc += 1;
        let Line::Instr { instr, .. } = line else {
            continue;
        };
        check_encodable(instr)?;
        match instr {
            AsmInstruction::Push(reg) => {
                let value = m.reg(*reg)?;
                m.push(value)?;
            }
            AsmInstruction::Pop(reg) => {
                let value = m.pop()?;
                m.set_reg(*reg, value);
            }
            AsmInstruction::Mov { src, dst } => {
                let value = m.read(*src)?;
                m.write(*dst, value)?;
            }
            AsmInstruction::Add { src, dst } => {
                let value = m.read(*dst)?.wrapping_add(m.read(*src)?);
                m.write(*dst, value)?;
            }
            AsmInstruction::Sub { src, dst } => {
                let value = m.read(*dst)?.wrapping_sub(m.read(*src)?);
                m.write(*dst, value)?;
            }
            AsmInstruction::Imul { src, dst } => {
                let value = m.read(*dst)?.wrapping_mul(m.read(*src)?);
                m.write(*dst, value)?;
            }
            AsmInstruction::Jmp(label) => {
                pc = *labels
                    .get(label.as_str())
                    .ok_or_else(|| fault(format!("jump to unknown label '{label}'")))?;
            }
            AsmInstruction::Ret => {
                let target = m.pop()?;
                if target != RETURN_SENTINEL {
                    return Err(fault(format!("ret to unexpected address {target:#x}")));
                }
                if m.reg(STACK_PTR_REG)? != STACK_TOP {
                    return Err(fault("stack pointer not restored".into()));
                }
                if m.reg(FRAME_PTR_REG)? != CALLER_FRAME_PTR {
                    return Err(fault("frame pointer not restored".into()));
                }
                return m.reg(Reg::Rax);
            }
        }
    }
    Err(fault(format!("step limit of {STEP_LIMIT} exceeded")))
}

// ── Pattern matching ──

/// Pattern matching for instruction fields
#[derive(Debug, Clone)]
pub enum Pat<T> {
    /// Match any value
    Any,
    /// Match exact value
    Exact(T),
    /// Match if value satisfies predicate
    Predicate(fn(&T) -> bool),
}

impl<T: PartialEq> Pat<T> {
    /// Check if a value matches this pattern
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Pat::Any => true,
            Pat::Exact(expected) => value == expected,
            Pat::Predicate(pred) => pred(value),
        }
    }
}

/// Pattern for matching instructions in tests
#[derive(Debug, Clone)]
pub enum InstructionPattern {
    /// Match any instruction
    Any,
    Push(Pat<Reg>),
    Pop(Pat<Reg>),
    Mov { src: Pat<Operand>, dst: Pat<Operand> },
    Add { src: Pat<Operand>, dst: Pat<Operand> },
    Sub { src: Pat<Operand>, dst: Pat<Operand> },
    Imul { src: Pat<Operand>, dst: Pat<Operand> },
    Jmp(Pat<String>),
    Ret,
}

impl InstructionPattern {
    /// Check if an instruction matches this pattern
    pub fn matches(&self, instr: &AsmInstruction) -> bool {
        use AsmInstruction as I;
        use InstructionPattern as P;

        match (self, instr) {
            (P::Any, _) | (P::Ret, I::Ret) => true,
            (P::Push(pat), I::Push(reg)) | (P::Pop(pat), I::Pop(reg)) => pat.matches(reg),
            (P::Mov { src: sp, dst: dp }, I::Mov { src, dst })
            | (P::Add { src: sp, dst: dp }, I::Add { src, dst })
            | (P::Sub { src: sp, dst: dp }, I::Sub { src, dst })
            | (P::Imul { src: sp, dst: dp }, I::Imul { src, dst }) => {
                sp.matches(src) && dp.matches(dst)
            }
            (P::Jmp(pat), I::Jmp(label)) => pat.matches(label),
            _ => false,
        }
    }
}

/// Find a pattern in an instruction sequence
///
/// Returns the index of the first match, or None if not found
pub fn find_pattern(
    instructions: &[AsmInstruction],
    pattern: &[InstructionPattern],
) -> Option<usize> {
    if pattern.is_empty() {
        return Some(0);
    }

    'outer: for start in 0..=instructions.len().saturating_sub(pattern.len()) {
        for (i, pat) in pattern.iter().enumerate() {
            match instructions.get(start + i) {
                Some(instr) if pat.matches(instr) => {}
                _ => continue 'outer,
            }
        }
        return Some(start);
    }
    None
}

/// Assert that an instruction sequence contains a pattern
///
/// Panics with a descriptive message if the pattern is not found
pub fn assert_has_pattern(instructions: &[AsmInstruction], pattern: &[InstructionPattern]) {
    if find_pattern(instructions, pattern).is_none() {
        panic!(
            "Pattern not found in instruction sequence.\n\nExpected pattern:\n{}\n\nActual instructions:\n{}",
            format_patterns(pattern),
            format_instructions(instructions)
        );
    }
}

/// Format patterns for display
fn format_patterns(patterns: &[InstructionPattern]) -> String {
    patterns
        .iter()
        .map(|p| format!("  {:?}", p))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format instructions for display
fn format_instructions(instructions: &[AsmInstruction]) -> String {
    instructions
        .iter()
        .map(|i| format!("  {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Count instructions with a specific mnemonic
pub fn count_mnemonic(instructions: &[AsmInstruction], mnemonic: &str) -> usize {
    instructions
        .iter()
        .filter(|i| i.mnemonic() == mnemonic)
        .count()
}

/// Register operands that hold IR temporaries (everything except `rax`,
/// `rbp` and `rsp`).
pub fn cache_registers_used(instructions: &[AsmInstruction]) -> Vec<Reg> {
    let mut regs = Vec::new();
    for instr in instructions {
        let operands = match instr {
            AsmInstruction::Mov { src, dst }
            | AsmInstruction::Add { src, dst }
            | AsmInstruction::Sub { src, dst }
            | AsmInstruction::Imul { src, dst } => vec![*src, *dst],
            AsmInstruction::Push(_)
            | AsmInstruction::Pop(_)
            | AsmInstruction::Jmp(_)
            | AsmInstruction::Ret => Vec::new(),
        };
        for op in operands {
            if let Operand::Reg(reg) = op
                && crate::abi::CACHE_REGS.contains(&reg)
                && !regs.contains(&reg)
            {
                regs.push(reg);
            }
        }
    }
    regs
}
