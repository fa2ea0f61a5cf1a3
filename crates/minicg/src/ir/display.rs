use std::fmt;

use super::{Function, Instruction, SlotId, Temp, TempId};

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temp::Cell(id) => write!(f, "{id}"),
            Temp::Imm(value) => write!(f, "{value}"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Add { dst, lhs, rhs } => write!(f, "{dst} = add {lhs}, {rhs}"),
            Instruction::Mul { dst, lhs, rhs } => write!(f, "{dst} = mul {lhs}, {rhs}"),
            Instruction::Ret { value } => write!(f, "ret {value}"),
            Instruction::Alloc { slot, size } => write!(f, "alloc {slot}, {size}"),
            Instruction::Load { dst, src } => write!(f, "{dst} = load {src}"),
            Instruction::Store { dst, src } => write!(f, "store {dst}, {src}"),
        }
    }
}

/// Textual IR dump: header, body, then the frame slot table.
impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "function {} (frame {} bytes)", self.name, self.frame.size())?;
        for instr in &self.instructions {
            writeln!(f, "    {instr}")?;
        }
        for (id, slot) in self.frame.slots() {
            write!(f, "  {id}: {} bytes at {}", slot.size, slot.offset)?;
            let owner = self
                .temps
                .iter()
                .position(|cell| cell.home == Some(id));
            if let Some(index) = owner {
                write!(f, " (home of t{index})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
