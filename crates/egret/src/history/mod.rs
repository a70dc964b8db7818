// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reader-side sample history cache.
//!
//! The [`ReaderHistory`] is the in-memory store a subscription endpoint
//! deposits received samples into, and from which application code and the
//! protocol layer read, take, and age them out. It enforces per-topic and
//! per-instance resource limits, both DDS history kinds, keyed semantics
//! with on-the-fly key extraction, and per-instance deadline bookkeeping.
//!
//! # Architecture
//!
//! ```text
//! protocol receive thread            application thread
//!         |                                  |
//!   received_change()              get_first_untaken_info()
//!         |                        lookup_instance() / deadlines
//!         v                                  v
//! +---------------------------------------------------------+
//! |  ReaderHistory (one mutex, *_nts methods inside)        |
//! |  +--------------+   +--------------------------------+  |
//! |  | ChangeStore  |<--| InstanceTable (keyed topics)   |  |
//! |  | payload pool |   | sample identities + deadlines  |  |
//! |  +--------------+   +--------------------------------+  |
//! +---------------------------------------------------------+
//! ```
//!
//! All operations run on the caller's thread and never suspend. The history
//! must be attached to its enclosing reader (see [`ReaderLink`]) before any
//! operation succeeds.

mod admission;
mod instances;
mod reader_link;
mod sample_info;
mod store;

pub use reader_link::ReaderLink;
pub use sample_info::{InstanceState, SampleInfo, SampleState, ViewState};

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::core::types::{CacheChange, InstanceHandle, SampleIdentity};
use crate::error::{Error, Result};
use crate::qos::{effective_limit, History, MemoryPolicy, QosProfile};
use crate::type_support::{KeyScratch, TypeSupport};

use admission::AdmissionPolicy;
use instances::InstanceTable;
use store::ChangeStore;

/// Payload slots carry a little alignment slack past the declared size.
const PAYLOAD_SLACK: usize = 3;

/// Immutable configuration snapshot taken at construction.
///
/// Limit values of `0` in the QoS profile arrive here already rewritten to
/// [`LENGTH_UNLIMITED`](crate::qos::LENGTH_UNLIMITED).
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub topic_name: String,
    pub type_name: String,
    pub has_key: bool,
    pub history: History,
    /// Per-instance retention under KEEP_LAST; zero under KEEP_ALL.
    pub depth: usize,
    pub max_total_samples: usize,
    pub max_instances: usize,
    pub max_samples_per_instance: usize,
    pub memory_policy: MemoryPolicy,
}

impl HistoryConfig {
    fn from_qos(topic_name: &str, type_support: &dyn TypeSupport, qos: &QosProfile) -> Self {
        let rl = &qos.resource_limits;
        Self {
            topic_name: topic_name.to_string(),
            type_name: type_support.type_name().to_string(),
            has_key: type_support.has_key(),
            history: qos.history,
            depth: match qos.history {
                History::KeepLast(depth) => depth as usize,
                History::KeepAll => 0,
            },
            max_total_samples: effective_limit(rl.max_samples),
            max_instances: effective_limit(rl.max_instances),
            max_samples_per_instance: effective_limit(rl.max_samples_per_instance),
            memory_policy: qos.memory_policy,
        }
    }

    /// Payload pool ceiling: raw limits for KEEP_ALL, depth-derived for
    /// KEEP_LAST (`depth` unkeyed, `depth x max_instances` keyed).
    fn pool_cap(&self) -> usize {
        match self.history {
            History::KeepAll => self.max_total_samples,
            History::KeepLast(_) => {
                if self.has_key {
                    self.depth.saturating_mul(self.max_instances)
                } else {
                    self.depth
                }
            }
        }
    }
}

/// Mutable history state, only ever touched under the history mutex.
///
/// Methods suffixed `_nts` assume the lock is held.
pub(crate) struct HistoryState {
    pub(crate) store: ChangeStore,
    pub(crate) instances: InstanceTable,
    pub(crate) global_next_deadline: Option<Instant>,
    pub(crate) key_scratch: Option<Box<dyn KeyScratch>>,
    pub(crate) policy: AdmissionPolicy,
    pub(crate) total_received: u64,
}

impl HistoryState {
    /// Remove one change by identity: scrub its instance entry, then the
    /// store. A sample missing from its instance entry is an internal
    /// inconsistency; it is reported and the store removal proceeds anyway.
    fn remove_change_nts(&mut self, id: &SampleIdentity, config: &HistoryConfig) -> Result<()> {
        let Some(pos) = self.store.position(id) else {
            log::debug!(
                "[ReaderHistory] topic '{}': sample {} from writer {} not in history",
                config.topic_name,
                id.sequence_number,
                id.writer_guid
            );
            return Err(Error::NotFound);
        };
        self.scrub_instance_nts(pos, config);
        self.store.remove_at(pos);
        Ok(())
    }

    /// Remove the change at `pos`. Returns true when a change was removed.
    fn remove_at_nts(&mut self, pos: usize, config: &HistoryConfig) -> bool {
        if pos >= self.store.len() {
            return false;
        }
        self.scrub_instance_nts(pos, config);
        self.store.remove_at(pos)
    }

    /// Erase the identity of the change at `pos` from its instance entry.
    /// The entry itself stays, even when it becomes empty: reclaim is lazy.
    fn scrub_instance_nts(&mut self, pos: usize, config: &HistoryConfig) {
        if !config.has_key {
            return;
        }
        let Some(change) = self.store.get(pos) else {
            return;
        };
        let handle = change.instance_handle;
        let id = change.identity();
        if handle.is_nil() {
            return;
        }
        if !self.instances.remove_identity(&handle, &id) {
            log::error!(
                "[ReaderHistory] topic '{}': sample {} not found in instance {:?} while removing",
                config.topic_name,
                id.sequence_number,
                handle
            );
        }
    }
}

/// Reader-side sample history for one topic.
///
/// Created from a topic name, a type plugin, and a QoS snapshot; attached to
/// its enclosing reader afterwards. Construction rewrites zero limits to
/// "unlimited" and allocates the key scratch object iff the type has a key.
pub struct ReaderHistory {
    config: HistoryConfig,
    reader: RwLock<Option<Arc<dyn ReaderLink>>>,
    state: Mutex<HistoryState>,
}

impl ReaderHistory {
    /// Build the history for `topic_name` with the given type and QoS.
    pub fn new(
        topic_name: &str,
        type_support: &dyn TypeSupport,
        qos: &QosProfile,
    ) -> Result<Self> {
        qos.validate().map_err(Error::InvalidQos)?;
        let config = HistoryConfig::from_qos(topic_name, type_support, qos);

        let pool_cap = config.pool_cap();
        let allocated = qos.resource_limits.allocated_samples.min(pool_cap);
        let pool_can_grow = config.memory_policy != MemoryPolicy::Preallocated;
        let store = ChangeStore::new(
            type_support.payload_size() + PAYLOAD_SLACK,
            allocated,
            pool_cap,
            config.max_total_samples,
            pool_can_grow,
        );

        let key_scratch = if config.has_key {
            type_support.create_key_scratch()
        } else {
            None
        };

        Ok(Self {
            state: Mutex::new(HistoryState {
                store,
                instances: InstanceTable::new(config.max_instances),
                global_next_deadline: None,
                key_scratch,
                policy: AdmissionPolicy::select(config.has_key, config.history),
                total_received: 0,
            }),
            reader: RwLock::new(None),
            config,
        })
    }

    /// The configuration snapshot taken at construction.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Install the enclosing reader. Until this runs, every operation fails.
    pub fn attach_reader(&self, link: Arc<dyn ReaderLink>) {
        *self.reader.write() = Some(link);
    }

    /// Detach from the enclosing reader. Must run before the history drops.
    pub fn detach_reader(&self) {
        *self.reader.write() = None;
    }

    pub fn is_attached(&self) -> bool {
        self.reader.read().is_some()
    }

    /// Deposit one received sample. Returns whether it was admitted.
    pub fn received_change(&self, change: CacheChange, payload: &[u8]) -> bool {
        self.received_change_with_unknown(change, payload, 0)
    }

    /// Deposit one received sample, reserving room for
    /// `unknown_missing_up_to` lower-numbered samples still in flight.
    pub fn received_change_with_unknown(
        &self,
        change: CacheChange,
        payload: &[u8],
        unknown_missing_up_to: usize,
    ) -> bool {
        let Some(link) = self.require_link("received_change") else {
            return false;
        };
        let is_key_protected = link.is_key_protected();
        let mut state = self.state.lock();
        match state.received_change_nts(
            change,
            payload,
            unknown_missing_up_to,
            is_key_protected,
            &self.config,
        ) {
            Ok(()) => {
                state.total_received += 1;
                true
            }
            Err(_) => false,
        }
    }

    /// Remove one change by identity.
    pub fn remove_change(&self, id: &SampleIdentity) -> bool {
        if self.require_link("remove_change").is_none() {
            return false;
        }
        let mut state = self.state.lock();
        state.remove_change_nts(id, &self.config).is_ok()
    }

    /// Remove every change matching `pred`, e.g. an expiry sweep.
    /// Returns the number of removed changes.
    ///
    /// `pred` runs under the history lock and must not call back into the
    /// history.
    pub fn remove_changes_where(&self, mut pred: impl FnMut(&CacheChange) -> bool) -> usize {
        if self.require_link("remove_changes_where").is_none() {
            return 0;
        }
        let mut state = self.state.lock();
        let mut pos = 0;
        let mut removed = 0;
        while pos < state.store.len() {
            let matches = match state.store.get(pos) {
                Some(change) => pred(change),
                None => false,
            };
            if matches && state.remove_at_nts(pos, &self.config) {
                removed += 1;
            } else {
                pos += 1;
            }
        }
        removed
    }

    /// Build the metadata of the reader's next not-yet-read change and mark
    /// it read by the user, without taking it.
    pub fn get_first_untaken_info(&self) -> Option<SampleInfo> {
        let link = self.require_link("get_first_untaken_info")?;
        let id = link.next_untaken_change()?;
        let info = {
            let state = self.state.lock();
            let Some(pos) = state.store.position(&id) else {
                log::debug!(
                    "[ReaderHistory] topic '{}': untaken sample {} is no longer in the history",
                    self.config.topic_name,
                    id.sequence_number
                );
                return None;
            };
            SampleInfo::from_change(state.store.get(pos)?)
        };
        link.change_read_by_user(&id, false);
        Some(info)
    }

    /// Look up an instance by handle.
    ///
    /// Exact lookups return the named instance. Non-exact lookups return the
    /// least instance strictly greater than `handle`. On an unkeyed topic
    /// only the non-exact nil lookup succeeds, yielding the fictitious
    /// instance and the whole store.
    pub fn lookup_instance(
        &self,
        handle: InstanceHandle,
        exact: bool,
    ) -> Option<(InstanceHandle, Vec<CacheChange>)> {
        if self.require_link("lookup_instance").is_none() {
            return None;
        }
        let state = self.state.lock();
        if !self.config.has_key {
            if handle.is_nil() && !exact {
                return Some((InstanceHandle::sentinel(), state.store.iter().copied().collect()));
            }
            return None;
        }
        let found = if exact {
            state.instances.get(&handle).map(|entry| (handle, entry))
        } else {
            state.instances.upper_bound(handle)
        };
        found.map(|(h, _)| {
            let changes = state
                .store
                .iter()
                .filter(|c| c.instance_handle == h)
                .copied()
                .collect();
            (h, changes)
        })
    }

    /// Arm the next deadline of an instance. Unkeyed topics keep a single
    /// global deadline and ignore the handle.
    pub fn set_next_deadline(&self, handle: InstanceHandle, deadline: Instant) -> bool {
        if self.require_link("set_next_deadline").is_none() {
            return false;
        }
        let mut state = self.state.lock();
        if !self.config.has_key {
            state.global_next_deadline = Some(deadline);
            return true;
        }
        match state.instances.get_mut(&handle) {
            Some(entry) => {
                entry.next_deadline = Some(deadline);
                true
            }
            None => {
                log::debug!(
                    "[ReaderHistory] topic '{}': set_next_deadline on unknown instance {:?}",
                    self.config.topic_name,
                    handle
                );
                false
            }
        }
    }

    /// The instance whose armed deadline expires first.
    pub fn get_next_deadline(&self) -> Option<(InstanceHandle, Instant)> {
        if self.require_link("get_next_deadline").is_none() {
            return None;
        }
        let state = self.state.lock();
        if !self.config.has_key {
            return state
                .global_next_deadline
                .map(|t| (InstanceHandle::sentinel(), t));
        }
        state.instances.min_deadline()
    }

    /// Copy of the payload bytes held for `id`.
    pub fn payload_of(&self, id: &SampleIdentity) -> Option<Vec<u8>> {
        if self.require_link("payload_of").is_none() {
            return None;
        }
        let state = self.state.lock();
        let pos = state.store.position(id)?;
        state.store.payload_at(pos).map(<[u8]>::to_vec)
    }

    /// Oldest change in the history, by reception order.
    pub fn earliest_change(&self) -> Option<CacheChange> {
        if self.require_link("earliest_change").is_none() {
            return None;
        }
        self.state.lock().store.front().copied()
    }

    pub fn len(&self) -> usize {
        if self.require_link("len").is_none() {
            return 0;
        }
        self.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        if self.require_link("is_empty").is_none() {
            return true;
        }
        self.state.lock().store.is_empty()
    }

    pub fn is_full(&self) -> bool {
        if self.require_link("is_full").is_none() {
            return false;
        }
        self.state.lock().store.is_full()
    }

    /// Distinct instances currently tracked (zero on unkeyed topics).
    pub fn instance_count(&self) -> usize {
        if self.require_link("instance_count").is_none() {
            return 0;
        }
        self.state.lock().instances.len()
    }

    /// Samples admitted since construction.
    pub fn total_received(&self) -> u64 {
        if self.require_link("total_received").is_none() {
            return 0;
        }
        self.state.lock().total_received
    }

    /// Drop every sample and instance entry.
    pub fn clear(&self) -> bool {
        if self.require_link("clear").is_none() {
            return false;
        }
        let mut state = self.state.lock();
        state.store.clear();
        state.instances.clear();
        state.global_next_deadline = None;
        true
    }

    fn require_link(&self, op: &str) -> Option<Arc<dyn ReaderLink>> {
        let link = self.reader.read().clone();
        if link.is_none() {
            log::error!(
                "[ReaderHistory] topic '{}': {} invoked before a reader was attached",
                self.config.topic_name,
                op
            );
        }
        link
    }
}

impl Drop for ReaderHistory {
    fn drop(&mut self) {
        if self.reader.read().is_some() {
            log::warn!(
                "[ReaderHistory] topic '{}': history dropped while still attached to its reader",
                self.config.topic_name
            );
        }
    }
}
