//! Stackable symbol table.
//!
//! An open-addressed string-keyed hash table (32-bit FNV-1a, linear probing,
//! tombstone deletion) with an optional borrowed parent. Lookups that miss
//! locally continue in the parent chain, which is what gives the compiler
//! lexical shadowing.
//!
//! ```text
//!   root    { x: A, y: C }
//!     ^
//!   child   { x: B }          child.get("x") == B, child.get("y") == C
//! ```
//!
//! Resize policy, checked before every insert:
//! - uninitialized: allocate [`INITIAL_CAPACITY`] slots
//! - occupied (live + tombstones) below 70%: nothing
//! - live below 35%: rebuild at the same size (drops tombstones)
//! - otherwise: rebuild at double the size

use std::fmt;
use std::iter::FusedIterator;

/// Slot count allocated on the first insert.
pub const INITIAL_CAPACITY: usize = 16;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a over the key's bytes.
#[must_use]
pub fn fnv1a(key: &str) -> u32 {
    key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

#[derive(Debug, Clone)]
enum Slot<V> {
    Empty,
    Tombstone,
    Occupied { key: String, value: V },
}

fn empty_slots<V>(capacity: usize) -> Vec<Slot<V>> {
    std::iter::repeat_with(|| Slot::Empty).take(capacity).collect()
}

/// String-keyed hash table with parent fallthrough.
///
/// `put` and `remove` only ever touch this table; `get` and `iter` see the
/// whole chain. The parent is borrowed, so a child can never outlive it.
pub struct ScopeTable<'p, V> {
    parent: Option<&'p ScopeTable<'p, V>>,
    slots: Vec<Slot<V>>,
    /// Live bindings (excludes tombstones).
    live: usize,
    /// Non-empty slots (live bindings plus tombstones).
    used: usize,
}

impl<'p, V> ScopeTable<'p, V> {
    /// Root table. Storage is allocated lazily on the first insert.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            parent: None,
            slots: Vec::new(),
            live: 0,
            used: 0,
        }
    }

    #[must_use]
    pub fn with_parent(parent: &'p ScopeTable<'p, V>) -> Self {
        Self {
            parent: Some(parent),
            slots: empty_slots(INITIAL_CAPACITY),
            live: 0,
            used: 0,
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<&'p ScopeTable<'p, V>> {
        self.parent
    }

    /// Number of live bindings in this table, ignoring the parent chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Current slot-array size; zero until the first insert on a root table.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Nearest binding for `key`, searching this table and then its ancestors.
    pub fn get(&self, key: &str) -> Option<&V> {
        match self.get_local(key) {
            Some(value) => Some(value),
            None => self.parent.and_then(|parent| parent.get(key)),
        }
    }

    /// Binding for `key` in this table only.
    pub fn get_local(&self, key: &str) -> Option<&V> {
        let index = self.find(key)?;
        match &self.slots[index] {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Empty | Slot::Tombstone => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts or overwrites the binding for `key` in this table.
    ///
    /// Returns the value previously bound in this table, if any. Parent
    /// bindings are never modified.
    pub fn put(&mut self, key: &str, value: V) -> Option<V> {
        self.maybe_rehash();

        let mask = self.slots.len() - 1;
        let mut index = fnv1a(key) as usize & mask;
        let mut first_tombstone = None;
        loop {
            match &mut self.slots[index] {
                Slot::Empty => break,
                Slot::Tombstone => {
                    first_tombstone.get_or_insert(index);
                }
                Slot::Occupied { key: k, value: v } if k.as_str() == key => {
                    return Some(std::mem::replace(v, value));
                }
                Slot::Occupied { .. } => {}
            }
            index = (index + 1) & mask;
        }

        // The key is absent: reuse the earliest tombstone on the probe path,
        // otherwise claim the empty slot that ended the probe.
        let target = if let Some(tombstone) = first_tombstone {
            tombstone
        } else {
            self.used += 1;
            index
        };
        self.slots[target] = Slot::Occupied {
            key: key.to_owned(),
            value,
        };
        self.live += 1;
        None
    }

    /// Removes the binding for `key` from this table only.
    ///
    /// A later `get` falls through to the parent. Removing an absent key is a
    /// no-op.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let index = self.find(key)?;
        let slot = std::mem::replace(&mut self.slots[index], Slot::Tombstone);
        self.live -= 1;
        match slot {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Empty | Slot::Tombstone => None,
        }
    }

    /// Bindings visible from this table, innermost first, each key at most once.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            origin: self,
            current: Some(self),
            index: 0,
        }
    }

    /// Slot index holding `key` in this table.
    fn find(&self, key: &str) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        let mask = self.slots.len() - 1;
        let mut index = fnv1a(key) as usize & mask;
        loop {
            match &self.slots[index] {
                Slot::Empty => return None,
                Slot::Occupied { key: k, .. } if k.as_str() == key => return Some(index),
                Slot::Occupied { .. } | Slot::Tombstone => {}
            }
            index = (index + 1) & mask;
        }
    }

    fn maybe_rehash(&mut self) {
        if self.slots.is_empty() {
            self.slots = empty_slots(INITIAL_CAPACITY);
            return;
        }

        let capacity = self.slots.len();
        // used / capacity < 0.7
        if self.used * 10 < capacity * 7 {
            return;
        }
        // live / capacity < 0.35 means mostly tombstones: compact in place.
        let new_capacity = if self.live * 100 < capacity * 35 {
            capacity
        } else {
            capacity * 2
        };

        let old = std::mem::replace(&mut self.slots, empty_slots(new_capacity));
        let mask = new_capacity - 1;
        for slot in old {
            if let Slot::Occupied { key, value } = slot {
                let mut index = fnv1a(&key) as usize & mask;
                while !matches!(self.slots[index], Slot::Empty) {
                    index = (index + 1) & mask;
                }
                self.slots[index] = Slot::Occupied { key, value };
            }
        }
        tracing::trace!(
            from = capacity,
            to = new_capacity,
            live = self.live,
            dropped_tombstones = self.used - self.live,
            "scope table rehash"
        );
        self.used = self.live;
    }
}

impl<V> Default for ScopeTable<'_, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for ScopeTable<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for slot in &self.slots {
            if let Slot::Occupied { key, value } = slot {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

impl<'a, V> IntoIterator for &'a ScopeTable<'_, V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a scope chain; see [`ScopeTable::iter`].
pub struct Iter<'a, V> {
    origin: &'a ScopeTable<'a, V>,
    current: Option<&'a ScopeTable<'a, V>>,
    index: usize,
}

impl<'a, V> Iter<'a, V> {
    /// Whether a table between the origin and `table` (exclusive) binds `key`.
    fn is_shadowed(&self, table: &'a ScopeTable<'a, V>, key: &str) -> bool {
        let mut scope = Some(self.origin);
        while let Some(s) = scope {
            if std::ptr::eq(s, table) {
                return false;
            }
            if s.get_local(key).is_some() {
                return true;
            }
            scope = s.parent;
        }
        false
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(table) = self.current {
            while let Some(slot) = table.slots.get(self.index) {
                self.index += 1;
                if let Slot::Occupied { key, value } = slot
                    && !self.is_shadowed(table, key)
                {
                    return Some((key.as_str(), value));
                }
            }
            self.current = table.parent;
            self.index = 0;
        }
        None
    }
}

impl<V> FusedIterator for Iter<'_, V> {}
