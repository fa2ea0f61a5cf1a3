//! Recency cache mapping machine registers to IR temporaries.
//!
//! There is no liveness analysis. Every temporary owns a home slot in the frame,
//! and registers only cache those slots: when all registers are taken the
//! least-recently-used resident is written back (once) and its register is
//! handed to the newcomer, which is reloaded if it was written back earlier.
//!
//! The cache is driven by a single forward pass over the instruction stream and
//! never releases a register on its own, so once full it stays full.

use std::collections::HashSet;

use crate::asm::Reg;
use crate::ir::TempId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub reg: Reg,
    pub temp: TempId,
}

/// What the emitter has to do before `reg` can be used for the requested temp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub reg: Reg,
    /// Evicted temp whose value must be stored from `reg` to its home slot.
    pub spill: Option<TempId>,
    /// The requested temp must be loaded from its home slot into `reg`.
    pub reload: bool,
}

#[derive(Debug, Clone)]
pub struct RegisterCache {
    regs: Vec<Reg>,
    /// Most-recently-used first.
    entries: Vec<CacheEntry>,
    /// Temps whose home slot holds their value.
    spilled: HashSet<TempId>,
}

impl RegisterCache {
    /// # Panics
    ///
    /// Panics if `regs` is empty.
    #[must_use]
    pub fn new(regs: &[Reg]) -> Self {
        assert!(!regs.is_empty(), "register cache needs at least one register");
        Self {
            regs: regs.to_vec(),
            entries: Vec::with_capacity(regs.len()),
            spilled: HashSet::new(),
        }
    }

    /// Make `temp` resident and most-recently-used, returning its register and
    /// the spill/reload work that must precede its use.
    pub fn resolve(&mut self, temp: TempId) -> Resolution {
        if let Some(pos) = self.entries.iter().position(|e| e.temp == temp) {
            let entry = self.entries.remove(pos);
            self.entries.insert(0, entry);
            return Resolution {
                reg: entry.reg,
                spill: None,
                reload: false,
            };
        }

        let reload = self.spilled.contains(&temp);

        if let Some(reg) = self.free_reg() {
            self.entries.insert(0, CacheEntry { reg, temp });
            return Resolution {
                reg,
                spill: None,
                reload,
            };
        }

        let victim = self
            .entries
            .pop()
            .expect("full cache must have a least-recently-used entry");
        // Temps are defined once, so a home slot written earlier is still current.
        let spill = self.spilled.insert(victim.temp).then_some(victim.temp);
        self.entries.insert(
            0,
            CacheEntry {
                reg: victim.reg,
                temp,
            },
        );
        tracing::trace!(
            reg = victim.reg.name(),
            evicted = %victim.temp,
            incoming = %temp,
            store = spill.is_some(),
            reload,
            "register cache eviction"
        );
        Resolution {
            reg: victim.reg,
            spill,
            reload,
        }
    }

    /// First register, in allocation order, with no resident.
    fn free_reg(&self) -> Option<Reg> {
        self.regs
            .iter()
            .copied()
            .find(|reg| self.entries.iter().all(|e| e.reg != *reg))
    }

    /// Temp currently held in `reg`.
    #[must_use]
    pub fn resident(&self, reg: Reg) -> Option<TempId> {
        self.entries.iter().find(|e| e.reg == reg).map(|e| e.temp)
    }

    #[must_use]
    pub fn register_of(&self, temp: TempId) -> Option<Reg> {
        self.entries.iter().find(|e| e.temp == temp).map(|e| e.reg)
    }

    #[must_use]
    pub fn is_spilled(&self, temp: TempId) -> bool {
        self.spilled.contains(&temp)
    }

    /// Entries from most- to least-recently used.
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.regs.len()
    }
}
