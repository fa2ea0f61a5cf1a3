mod builder;
mod display;
mod frame;
mod instruction;

pub use builder::{IrBuilder, build_ir};
pub use frame::{Frame, FrameSlot};
pub use instruction::{Function, Instruction, SlotId, Temp, TempCell, TempId};
