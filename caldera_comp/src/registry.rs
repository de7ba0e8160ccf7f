// Copyright 2026 the Caldera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slot arena for device records with generation-checked handles.

use caldera_core::error::CompError;

/// A handle to a registered display device.
///
/// Contains both a slot index and a generation counter, so that a handle
/// used after unregistration is detected instead of silently addressing a
/// reused slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId {
    /// Slot index into the table.
    idx: u32,
    /// Generation counter — must match the table's generation for the slot.
    generation: u32,
}

impl core::fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "DeviceId({}@gen{})", self.idx, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Storage for device records, addressed by [`DeviceId`] handles.
///
/// Destroyed slots are recycled via a free list; each removal bumps the
/// slot's generation so stale handles fail lookup.
#[derive(Debug)]
pub(crate) struct DeviceTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> DeviceTable<T> {
    /// Creates an empty table.
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Guarantees the next [`insert`](Self::insert) will not allocate.
    ///
    /// Surfaces allocation failure as [`CompError::OutOfMemory`] with no
    /// change to the table.
    pub(crate) fn ensure_free_slot(&mut self) -> Result<(), CompError> {
        if self.free.is_empty() {
            self.slots
                .try_reserve(1)
                .map_err(|_| CompError::OutOfMemory)?;
        }
        Ok(())
    }

    /// Stores `value` and returns its handle.
    pub(crate) fn insert(&mut self, value: T) -> DeviceId {
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.value = Some(value);
            return DeviceId {
                idx,
                generation: slot.generation,
            };
        }

        #[expect(
            clippy::cast_possible_truncation,
            reason = "device counts are far below u32::MAX"
        )]
        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        DeviceId { idx, generation: 0 }
    }

    /// Returns the record for `id`, or `None` if the handle is stale.
    pub(crate) fn get(&self, id: DeviceId) -> Option<&T> {
        self.slots
            .get(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Mutable variant of [`get`](Self::get).
    pub(crate) fn get_mut(&mut self, id: DeviceId) -> Option<&mut T> {
        self.slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Removes and returns the record for `id`, bumping the slot generation
    /// so the handle (and any copy of it) becomes stale.
    pub(crate) fn remove(&mut self, id: DeviceId) -> Option<T> {
        let slot = self.slots.get_mut(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.idx);
        Some(value)
    }

    /// Iterates live records with their handles, in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (DeviceId, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            let value = slot.value.as_ref()?;
            #[expect(
                clippy::cast_possible_truncation,
                reason = "device counts are far below u32::MAX"
            )]
            let idx = idx as u32;
            Some((
                DeviceId {
                    idx,
                    generation: slot.generation,
                },
                value,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let mut table = DeviceTable::new();
        table.ensure_free_slot().unwrap();
        let id = table.insert("a");
        assert_eq!(table.get(id), Some(&"a"));
        assert_eq!(format!("{id:?}"), "DeviceId(0@gen0)");
    }

    #[test]
    fn removal_makes_handle_stale() {
        let mut table = DeviceTable::new();
        table.ensure_free_slot().unwrap();
        let id = table.insert(1);
        assert_eq!(table.remove(id), Some(1));
        assert_eq!(table.get(id), None);
        assert_eq!(table.remove(id), None);
    }

    #[test]
    fn slot_reuse_bumps_generation() {
        let mut table = DeviceTable::new();
        table.ensure_free_slot().unwrap();
        let first = table.insert(1);
        table.remove(first);

        table.ensure_free_slot().unwrap();
        let second = table.insert(2);
        // Same slot, new generation: the old handle stays dead.
        assert_ne!(first, second);
        assert_eq!(table.get(first), None);
        assert_eq!(table.get(second), Some(&2));
        assert_eq!(format!("{second:?}"), "DeviceId(0@gen1)");
    }

    #[test]
    fn iter_yields_live_records_only() {
        let mut table = DeviceTable::new();
        for v in 0..3 {
            table.ensure_free_slot().unwrap();
            table.insert(v);
        }
        let ids: Vec<_> = table.iter().map(|(id, _)| id).collect();
        table.remove(ids[1]);

        let live: Vec<_> = table.iter().map(|(_, v)| *v).collect();
        assert_eq!(live, vec![0, 2]);
    }
}
