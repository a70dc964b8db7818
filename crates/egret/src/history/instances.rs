// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-instance bookkeeping for keyed topics.
//!
//! The table maps instance handles to the ordered list of sample identities
//! held for that instance plus the instance's armed deadline. It is bounded
//! by `max_instances`; a full table admits a new instance only by reclaiming
//! an entry whose sample list is empty (samples all taken, instance slot
//! lingering).

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};
use std::time::Instant;

use crate::core::types::{InstanceHandle, SampleIdentity};
use crate::error::{Error, Result};
use crate::qos::LENGTH_UNLIMITED;

/// State of one keyed instance.
#[derive(Debug, Default)]
pub(crate) struct InstanceEntry {
    /// Identities of held samples, in reception order.
    pub changes: Vec<SampleIdentity>,
    /// Armed deadline, `None` until the reader first arms it.
    pub next_deadline: Option<Instant>,
}

/// Handle-ordered table of instance entries, bounded by `max_instances`.
pub(crate) struct InstanceTable {
    entries: BTreeMap<InstanceHandle, InstanceEntry>,
    max_instances: usize,
}

impl InstanceTable {
    pub fn new(max_instances: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_instances,
        }
    }

    /// Look up `handle`, creating its entry if the table allows.
    ///
    /// Returns the entry and whether it was created. A full table tries to
    /// reclaim some entry with no held samples; only then is an instance
    /// ever deleted implicitly.
    pub fn find_or_create(
        &mut self,
        handle: InstanceHandle,
    ) -> Result<(&mut InstanceEntry, bool)> {
        if !self.entries.contains_key(&handle)
            && self.max_instances != LENGTH_UNLIMITED
            && self.entries.len() >= self.max_instances
        {
            let reclaim = self
                .entries
                .iter()
                .find(|(_, entry)| entry.changes.is_empty())
                .map(|(h, _)| *h);
            match reclaim {
                Some(victim) => {
                    log::debug!(
                        "[InstanceTable] reclaiming empty instance {:?} for {:?}",
                        victim,
                        handle
                    );
                    self.entries.remove(&victim);
                }
                None => {
                    return Err(Error::CapacityExceeded(format!(
                        "instance table full ({} instances)",
                        self.entries.len()
                    )));
                }
            }
        }

        match self.entries.entry(handle) {
            Entry::Occupied(entry) => Ok((entry.into_mut(), false)),
            Entry::Vacant(slot) => Ok((slot.insert(InstanceEntry::default()), true)),
        }
    }

    pub fn get(&self, handle: &InstanceHandle) -> Option<&InstanceEntry> {
        self.entries.get(handle)
    }

    pub fn get_mut(&mut self, handle: &InstanceHandle) -> Option<&mut InstanceEntry> {
        self.entries.get_mut(handle)
    }

    /// Least instance strictly greater than `handle`.
    pub fn upper_bound(&self, handle: InstanceHandle) -> Option<(InstanceHandle, &InstanceEntry)> {
        self.entries
            .range((Excluded(handle), Unbounded))
            .next()
            .map(|(h, entry)| (*h, entry))
    }

    /// Entry with the minimum armed deadline.
    pub fn min_deadline(&self) -> Option<(InstanceHandle, Instant)> {
        self.entries
            .iter()
            .filter_map(|(h, entry)| entry.next_deadline.map(|t| (*h, t)))
            .min_by_key(|(_, t)| *t)
    }

    /// Drop `handle`'s entry if it holds no samples.
    ///
    /// Undoes a provisionally created entry when a later admission check
    /// refuses the sample.
    pub fn discard_if_empty(&mut self, handle: &InstanceHandle) -> bool {
        match self.entries.get(handle) {
            Some(entry) if entry.changes.is_empty() => {
                self.entries.remove(handle);
                true
            }
            _ => false,
        }
    }

    /// Erase `id` from the entry owning `handle`.
    pub fn remove_identity(&mut self, handle: &InstanceHandle, id: &SampleIdentity) -> bool {
        let Some(entry) = self.entries.get_mut(handle) else {
            return false;
        };
        match entry.changes.iter().position(|held| held == id) {
            Some(pos) => {
                entry.changes.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
