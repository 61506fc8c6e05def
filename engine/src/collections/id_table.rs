// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::fmt::Debug;

use crate::Sid;

struct Entry<V> {
    id: Sid,
    value: V,
}

/// Fixed-capacity map from [`Sid`] to `V`, with open addressing and linear
/// probing over an inline array of `N` slots.
///
/// Every probe visits at most `N` slots, so lookups of missing identifiers and
/// inserts into a full table terminate. Removal shifts the following entries
/// of the probe chain backwards, so removing one identifier never makes
/// another one unreachable.
///
/// The table is plain data without any heap allocations, but it's `N` slots
/// wide, so big tables should live inside some other long-lived structure.
pub struct IdTable<V, const N: usize> {
    slots: [Option<Entry<V>>; N],
    len: usize,
}

impl<V, const N: usize> IdTable<V, N> {
    /// Creates an empty table.
    pub fn new() -> IdTable<V, N> {
        IdTable {
            slots: core::array::from_fn(|_| None),
            len: 0,
        }
    }

    /// The slot where the probe for `id` starts.
    pub const fn hash_to_slot(id: Sid) -> usize {
        id.get() as usize % N
    }

    /// Inserts the value, returning the value previously stored for the same
    /// identifier, if any. If the identifier is new and every slot is already
    /// occupied, returns the given value back wrapped in a [`Result::Err`].
    pub fn insert(&mut self, id: Sid, value: V) -> Result<Option<V>, V> {
        let Some(slot) = self.probe(id, |slot| match slot {
            None => true,
            Some(entry) => entry.id == id,
        }) else {
            return Err(value);
        };

        let previous = self.slots[slot].replace(Entry { id, value });
        match previous {
            Some(entry) => Ok(Some(entry.value)),
            None => {
                self.len += 1;
                Ok(None)
            }
        }
    }

    /// Returns the value stored for the identifier, if any.
    pub fn get(&self, id: Sid) -> Option<&V> {
        let slot = self.find_slot(id)?;
        self.slots[slot].as_ref().map(|entry| &entry.value)
    }

    /// Returns the value stored for the identifier, if any.
    pub fn get_mut(&mut self, id: Sid) -> Option<&mut V> {
        let slot = self.find_slot(id)?;
        self.slots[slot].as_mut().map(|entry| &mut entry.value)
    }

    pub fn contains(&self, id: Sid) -> bool {
        self.find_slot(id).is_some()
    }

    /// Removes and returns the value stored for the identifier, if any.
    pub fn remove(&mut self, id: Sid) -> Option<V> {
        let mut hole = self.find_slot(id)?;
        let removed = self.slots[hole].take()?;
        self.len -= 1;

        // Backward shift: walk the rest of the probe chain, moving back every
        // entry whose home slot is not between the hole and its current slot,
        // since those entries would be unreachable by `find_slot` otherwise.
        let mut current = hole;
        for _ in 1..N {
            current = (current + 1) % N;
            let Some(entry) = &self.slots[current] else {
                break;
            };
            let home = Self::hash_to_slot(entry.id);
            let stays = if hole <= current {
                hole < home && home <= current
            } else {
                hole < home || home <= current
            };
            if !stays {
                self.slots[hole] = self.slots[current].take();
                hole = current;
            }
        }

        Some(removed.value)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.len = 0;
    }

    /// The amount of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Iterates over the entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Sid, &V)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|entry| (entry.id, &entry.value)))
    }

    fn find_slot(&self, id: Sid) -> Option<usize> {
        let slot = self.probe(id, |slot| match slot {
            None => true,
            Some(entry) => entry.id == id,
        })?;
        self.slots[slot].is_some().then_some(slot)
    }

    /// Walks the probe sequence of `id` for at most `N` slots, returning the
    /// first slot `stop_at` accepts.
    fn probe(&self, id: Sid, stop_at: impl Fn(&Option<Entry<V>>) -> bool) -> Option<usize> {
        let home = Self::hash_to_slot(id);
        (0..N)
            .map(|step| (home + step) % N)
            .find(|&slot| stop_at(&self.slots[slot]))
    }
}

impl<V, const N: usize> Default for IdTable<V, N> {
    fn default() -> Self {
        IdTable::new()
    }
}

impl<V: Debug, const N: usize> Debug for IdTable<V, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
