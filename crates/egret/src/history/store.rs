// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Flat ordered store of all cached changes for one topic.
//!
//! Append-only with bounded capacity plus arbitrary removal. Payload bytes
//! are copied into the pool on admission and released on removal; the slots
//! keep changes in reception order.

use std::collections::VecDeque;

use crate::core::rt::{PayloadHandle, PayloadPool};
use crate::core::types::{CacheChange, SampleIdentity};
use crate::error::{Error, Result};
use crate::qos::LENGTH_UNLIMITED;

/// One stored change plus its payload placement.
struct Slot {
    change: CacheChange,
    payload: PayloadHandle,
    payload_len: usize,
}

/// Ordered sequence of all held changes, bounded by `max_total_samples`.
pub(crate) struct ChangeStore {
    slots: VecDeque<Slot>,
    pool: PayloadPool,
    max_total_samples: usize,
    is_full: bool,
}

impl ChangeStore {
    /// Create a store backed by a pool of `slot_size`-byte payload slots.
    pub fn new(
        slot_size: usize,
        initial_slots: usize,
        pool_cap: usize,
        max_total_samples: usize,
        pool_can_grow: bool,
    ) -> Self {
        Self {
            slots: VecDeque::new(),
            pool: PayloadPool::new(slot_size, initial_slots, pool_cap, pool_can_grow),
            max_total_samples,
            is_full: false,
        }
    }

    /// Append a change, placing its payload in the pool.
    pub fn add(&mut self, change: CacheChange, payload: &[u8]) -> Result<()> {
        let handle = self.pool.store(payload).ok_or(Error::OutOfMemory)?;
        self.slots.push_back(Slot {
            change,
            payload: handle,
            payload_len: payload.len(),
        });
        self.recompute_full();
        Ok(())
    }

    /// Index of the change with the given identity.
    pub fn position(&self, id: &SampleIdentity) -> Option<usize> {
        self.slots.iter().position(|s| s.change.identity() == *id)
    }

    /// Remove the change with the given identity.
    #[allow(dead_code)] // store API - removal normally runs through the history
    pub fn remove(&mut self, id: &SampleIdentity) -> bool {
        match self.position(id) {
            Some(pos) => self.remove_at(pos),
            None => false,
        }
    }

    /// Remove the change at `pos`, releasing its payload slot.
    pub fn remove_at(&mut self, pos: usize) -> bool {
        match self.slots.remove(pos) {
            Some(slot) => {
                self.pool.release(slot.payload);
                self.recompute_full();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, pos: usize) -> Option<&CacheChange> {
        self.slots.get(pos).map(|s| &s.change)
    }

    pub fn front(&self) -> Option<&CacheChange> {
        self.slots.front().map(|s| &s.change)
    }

    /// Borrow the payload bytes of the change at `pos`.
    pub fn payload_at(&self, pos: usize) -> Option<&[u8]> {
        self.slots
            .get(pos)
            .map(|s| self.pool.get(s.payload, s.payload_len))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheChange> {
        self.slots.iter().map(|s| &s.change)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the store sits at `max_total_samples`.
    pub fn is_full(&self) -> bool {
        self.is_full
    }

    /// Drop every change and release all payload slots.
    pub fn clear(&mut self) {
        while let Some(slot) = self.slots.pop_front() {
            self.pool.release(slot.payload);
        }
        self.recompute_full();
    }

    fn recompute_full(&mut self) {
        self.is_full =
            self.max_total_samples != LENGTH_UNLIMITED && self.slots.len() >= self.max_total_samples;
    }
}
