//! Per-function emitter: turns IR instructions into assembly lines, resolving
//! every temporary through the register cache right before the line that uses it.

use crate::abi::{CACHE_REGS, FRAME_PTR_REG, RETURN_REG, SCRATCH_REG, epilogue_label};
use crate::asm::{AsmInstruction, Line, Note, Operand, Reg};
use crate::ir::{Function, Instruction, SlotId, Temp, TempId};
use crate::{CompileOptions, Error, Result};

use super::regcache::RegisterCache;

pub struct Emitter<'f> {
    function: &'f Function,
    pub(crate) cache: RegisterCache,
    pub(crate) lines: Vec<Line>,
    annotate: bool,
    end_label: String,
}

impl<'f> Emitter<'f> {
    pub fn new(function: &'f Function, options: &CompileOptions) -> Self {
        Self {
            function,
            cache: RegisterCache::new(&CACHE_REGS),
            lines: Vec::new(),
            annotate: options.annotate,
            end_label: epilogue_label(&function.name),
        }
    }

    pub fn end_label(&self) -> &str {
        &self.end_label
    }

    pub fn label(&mut self, label: String) {
        self.lines.push(Line::Label(label));
    }

    pub fn emit(&mut self, instr: AsmInstruction) {
        self.lines.push(Line::Instr { instr, note: None });
    }

    fn emit_noted(&mut self, instr: AsmInstruction, note: Note) {
        let note = self.annotate.then_some(note);
        self.lines.push(Line::Instr { instr, note });
    }

    pub fn lower_instruction(&mut self, instr: &Instruction) -> Result<()> {
        match instr {
            Instruction::Add { dst, lhs, rhs } => {
                self.lower_binary(*dst, *lhs, *rhs, |src, dst| AsmInstruction::Add { src, dst })
            }
            Instruction::Mul { dst, lhs, rhs } => {
                self.lower_binary(*dst, *lhs, *rhs, |src, dst| AsmInstruction::Imul { src, dst })
            }
            Instruction::Ret { value } => {
                let src = self.operand(*value)?;
                self.emit(AsmInstruction::Mov {
                    src,
                    dst: RETURN_REG.into(),
                });
                self.emit(AsmInstruction::Jmp(self.end_label.clone()));
                Ok(())
            }
            // Space for every slot is reserved by the prologue.
            Instruction::Alloc { .. } => Ok(()),
            Instruction::Load { dst, src } => {
                let src = self.slot_operand(*src);
                let reg = self.register(*dst)?;
                self.emit(AsmInstruction::Mov {
                    src,
                    dst: reg.into(),
                });
                Ok(())
            }
            Instruction::Store { dst, src } => {
                let src = self.source(*src)?;
                let dst = self.slot_operand(*dst);
                self.emit(AsmInstruction::Mov { src, dst });
                Ok(())
            }
        }
    }

    /// `dst = lhs op rhs` as `mov lhs, dst; op rhs, dst`.
    fn lower_binary(
        &mut self,
        dst: TempId,
        lhs: Temp,
        rhs: Temp,
        op: impl FnOnce(Operand, Operand) -> AsmInstruction,
    ) -> Result<()> {
        let lhs = self.operand(lhs)?;
        let dst_reg = Operand::Reg(self.register(dst)?);
        if lhs != dst_reg {
            self.emit(AsmInstruction::Mov { src: lhs, dst: dst_reg });
        }
        let rhs = self.source(rhs)?;
        let dst_reg = Operand::Reg(self.register(dst)?);
        self.emit(op(rhs, dst_reg));
        Ok(())
    }

    /// Concrete operand for a temp: an immediate, or the register caching a cell.
    pub fn operand(&mut self, temp: Temp) -> Result<Operand> {
        match temp {
            Temp::Imm(value) => Ok(Operand::Imm(value)),
            Temp::Cell(id) => Ok(Operand::Reg(self.register(id)?)),
        }
    }

    /// Source operand for an ALU instruction or a store. Those only encode a
    /// sign-extended 32-bit immediate, so a wider one is first moved into
    /// [`SCRATCH_REG`].
    fn source(&mut self, temp: Temp) -> Result<Operand> {
        match temp {
            Temp::Imm(value) if i32::try_from(value).is_err() => {
                self.emit(AsmInstruction::Mov {
                    src: Operand::Imm(value),
                    dst: SCRATCH_REG.into(),
                });
                Ok(SCRATCH_REG.into())
            }
            Temp::Imm(_) | Temp::Cell(_) => self.operand(temp),
        }
    }

    /// Register holding `temp`, emitting any spill store and reload it needs.
    pub fn register(&mut self, temp: TempId) -> Result<Reg> {
        let home = self.home_operand(temp)?;
        let resolution = self.cache.resolve(temp);
        if let Some(victim) = resolution.spill {
            let victim_home = self.home_operand(victim)?;
            self.emit_noted(
                AsmInstruction::Mov {
                    src: resolution.reg.into(),
                    dst: victim_home,
                },
                Note::Spill,
            );
        }
        if resolution.reload {
            self.emit_noted(
                AsmInstruction::Mov {
                    src: home,
                    dst: resolution.reg.into(),
                },
                Note::Reload,
            );
        }
        Ok(resolution.reg)
    }

    fn slot_operand(&self, slot: SlotId) -> Operand {
        Operand::Mem {
            offset: self.function.frame.slot(slot).offset,
            base: FRAME_PTR_REG,
        }
    }

    fn home_operand(&self, temp: TempId) -> Result<Operand> {
        let slot = self.function.home(temp).ok_or_else(|| {
            Error::Internal(format!(
                "{temp} in function '{}' has no home slot; layout has not run",
                self.function.name
            ))
        })?;
        Ok(self.slot_operand(slot))
    }
}
