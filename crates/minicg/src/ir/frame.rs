use crate::abi::{MAX_FRAME_SIZE, STACK_ALIGN};
use crate::{Error, Result};

use super::SlotId;

/// A fixed region of the stack frame, addressed as `offset(%rbp)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    pub size: u32,
    /// Negative offset of the slot's lowest byte from the frame base.
    pub offset: i32,
}

/// Bump allocator for a function's stack frame.
///
/// Slots are carved downward from the frame base in allocation order and are
/// never reused, so no two slots overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    slots: Vec<FrameSlot>,
    /// Bytes allocated so far (the magnitude of the lowest offset).
    depth: u32,
}

impl Frame {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            depth: 0,
        }
    }

    /// Carves `size` bytes below the previous slot.
    ///
    /// Fails once the frame would exceed [`MAX_FRAME_SIZE`]; the frame is left
    /// unchanged in that case.
    pub fn alloc(&mut self, size: u32) -> Result<SlotId> {
        let depth = self
            .depth
            .checked_add(size)
            .filter(|depth| *depth <= MAX_FRAME_SIZE)
            .ok_or_else(|| {
                Error::Unsupported(format!(
                    "frame too large: {size} more bytes on top of {} exceeds {MAX_FRAME_SIZE}",
                    self.depth
                ))
            })?;
        let offset = i32::try_from(depth)
            .map_err(|_| Error::Internal(format!("frame depth {depth} has no i32 offset")))?;
        self.depth = depth;
        let id = SlotId(self.slots.len() as u32);
        self.slots.push(FrameSlot {
            size,
            offset: -offset,
        });
        Ok(id)
    }

    #[must_use]
    pub fn slot(&self, id: SlotId) -> FrameSlot {
        self.slots[id.index()]
    }

    pub fn slots(&self) -> impl Iterator<Item = (SlotId, FrameSlot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (SlotId(i as u32), *slot))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Sum of all slot sizes.
    #[must_use]
    pub const fn allocated(&self) -> u32 {
        self.depth
    }

    /// Stack space the prologue reserves: all slots, rounded up to [`STACK_ALIGN`].
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.depth.next_multiple_of(STACK_ALIGN)
    }
}
