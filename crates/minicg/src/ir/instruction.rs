use super::Frame;
use crate::Result;
use crate::abi::TEMP_SLOT_SIZE;

/// Identity of a value-cell temporary within one [`Function`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(pub(crate) u32);

impl TempId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a frame slot within one [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) u32);

impl SlotId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A value produced during translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temp {
    /// Stack-backed value with an identity; may be cached in a register.
    Cell(TempId),
    /// Constant with no storage.
    Imm(i64),
}

/// Per-cell data kept in the function's temp arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TempCell {
    /// Home slot, assigned by [`Function::layout`].
    pub home: Option<SlotId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Add { dst: TempId, lhs: Temp, rhs: Temp },
    Mul { dst: TempId, lhs: Temp, rhs: Temp },
    Ret { value: Temp },
    /// Marks the point where a declared local's slot comes into existence.
    Alloc { slot: SlotId, size: u32 },
    Load { dst: TempId, src: SlotId },
    Store { dst: SlotId, src: Temp },
}

/// One translated function. Owns every slot and temporary it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub instructions: Vec<Instruction>,
    pub frame: Frame,
    pub temps: Vec<TempCell>,
}

impl Function {
    /// Gives every cell without a home an 8-byte frame slot, in creation order.
    ///
    /// Runs after IR building and before emission. Calling it again is a no-op.
    /// Fails if the homes push the frame past its maximum size.
    pub fn layout(&mut self) -> Result<()> {
        let mut assigned = 0usize;
        for cell in &mut self.temps {
            if cell.home.is_none() {
                cell.home = Some(self.frame.alloc(TEMP_SLOT_SIZE)?);
                assigned += 1;
            }
        }
        tracing::debug!(
            function = %self.name,
            assigned,
            frame_size = self.frame.size(),
            "frame layout"
        );
        Ok(())
    }

    #[must_use]
    pub fn home(&self, temp: TempId) -> Option<SlotId> {
        self.temps.get(temp.index()).and_then(|cell| cell.home)
    }

    #[must_use]
    pub fn is_laid_out(&self) -> bool {
        self.temps.iter().all(|cell| cell.home.is_some())
    }
}
