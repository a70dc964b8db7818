// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Admission control for arriving samples.
//!
//! One of four policies is bound at construction from the topic kind and the
//! history kind. KEEP_ALL refuses samples once limits are reached; KEEP_LAST
//! evicts the oldest sample of the affected scope and then admits. Eviction
//! always goes through the history's own removal path so keyed bookkeeping
//! stays consistent.

use super::{HistoryConfig, HistoryState};
use crate::core::types::{CacheChange, InstanceHandle};
use crate::error::{Error, Result};
use crate::qos::{History, LENGTH_UNLIMITED};

/// Admission strategy, selected once from `(has_key, history kind)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdmissionPolicy {
    /// Accept while the store (plus expected in-flight samples) fits.
    KeepAllUnkeyed,
    /// Evict the oldest stored sample once `depth` is reached.
    KeepLastUnkeyed { depth: usize },
    /// Accept while the owning instance is below its per-instance cap.
    KeepAllKeyed,
    /// Evict the owning instance's oldest sample once `depth` is reached.
    KeepLastKeyed { depth: usize },
}

impl AdmissionPolicy {
    pub fn select(has_key: bool, history: History) -> Self {
        match (has_key, history) {
            (false, History::KeepAll) => Self::KeepAllUnkeyed,
            (false, History::KeepLast(depth)) => Self::KeepLastUnkeyed {
                depth: depth as usize,
            },
            (true, History::KeepAll) => Self::KeepAllKeyed,
            (true, History::KeepLast(depth)) => Self::KeepLastKeyed {
                depth: depth as usize,
            },
        }
    }
}

impl HistoryState {
    /// Admit one arriving change under the bound policy.
    ///
    /// `unknown_missing_up_to` is how many lower-numbered samples the
    /// protocol layer still expects to fill in ahead of this one; only the
    /// KEEP_ALL/unkeyed policy consumes it.
    /// TODO: the KEEP_ALL/keyed policy should reserve in-flight room too.
    pub(super) fn received_change_nts(
        &mut self,
        change: CacheChange,
        payload: &[u8],
        unknown_missing_up_to: usize,
        is_key_protected: bool,
        config: &HistoryConfig,
    ) -> Result<()> {
        match self.policy {
            AdmissionPolicy::KeepAllUnkeyed => {
                self.admit_keep_all_unkeyed(change, payload, unknown_missing_up_to, config)
            }
            AdmissionPolicy::KeepLastUnkeyed { depth } => {
                self.admit_keep_last_unkeyed(change, payload, depth, config)
            }
            AdmissionPolicy::KeepAllKeyed => {
                self.admit_keep_all_keyed(change, payload, is_key_protected, config)
            }
            AdmissionPolicy::KeepLastKeyed { depth } => {
                self.admit_keep_last_keyed(change, payload, depth, is_key_protected, config)
            }
        }
    }

    fn admit_keep_all_unkeyed(
        &mut self,
        change: CacheChange,
        payload: &[u8],
        unknown_missing_up_to: usize,
        config: &HistoryConfig,
    ) -> Result<()> {
        if config.max_total_samples != LENGTH_UNLIMITED {
            let projected = self.store.len().saturating_add(unknown_missing_up_to);
            if projected >= config.max_total_samples {
                log::warn!(
                    "[ReaderHistory] topic '{}': history full ({} held, {} in flight), sample {} refused",
                    config.topic_name,
                    self.store.len(),
                    unknown_missing_up_to,
                    change.sequence_number
                );
                return Err(Error::CapacityExceeded("history full".into()));
            }
        }
        self.append_nts(change, payload, None, config)
    }

    fn admit_keep_last_unkeyed(
        &mut self,
        change: CacheChange,
        payload: &[u8],
        depth: usize,
        config: &HistoryConfig,
    ) -> Result<()> {
        if self.store.len() >= depth {
            let Some(victim) = self.store.front().map(CacheChange::identity) else {
                return Err(Error::NotFound);
            };
            log::debug!(
                "[ReaderHistory] topic '{}': depth {} reached, evicting sample {}",
                config.topic_name,
                depth,
                victim.sequence_number
            );
            self.remove_change_nts(&victim, config)?;
        }
        self.append_nts(change, payload, None, config)
    }

    fn admit_keep_all_keyed(
        &mut self,
        mut change: CacheChange,
        payload: &[u8],
        is_key_protected: bool,
        config: &HistoryConfig,
    ) -> Result<()> {
        let handle = self.resolve_instance_nts(&mut change, payload, is_key_protected, config)?;
        let (entry, created) = self.instances.find_or_create(handle)?;
        if config.max_samples_per_instance != LENGTH_UNLIMITED
            && entry.changes.len() >= config.max_samples_per_instance
        {
            log::warn!(
                "[ReaderHistory] topic '{}': instance {:?} at max_samples_per_instance ({}), sample {} refused",
                config.topic_name,
                handle,
                config.max_samples_per_instance,
                change.sequence_number
            );
            return Err(Error::CapacityExceeded("instance full".into()));
        }
        let result = self.append_nts(change, payload, Some(handle), config);
        if result.is_err() && created {
            // A refusal must not leave the provisional entry behind.
            self.instances.discard_if_empty(&handle);
        }
        result
    }

    fn admit_keep_last_keyed(
        &mut self,
        mut change: CacheChange,
        payload: &[u8],
        depth: usize,
        is_key_protected: bool,
        config: &HistoryConfig,
    ) -> Result<()> {
        let handle = self.resolve_instance_nts(&mut change, payload, is_key_protected, config)?;
        let (victim, created) = {
            let (entry, created) = self.instances.find_or_create(handle)?;
            if entry.changes.len() >= depth {
                (entry.changes.first().copied(), created)
            } else {
                (None, created)
            }
        };
        if let Some(victim) = victim {
            log::debug!(
                "[ReaderHistory] topic '{}': instance {:?} at depth {}, evicting sample {}",
                config.topic_name,
                handle,
                depth,
                victim.sequence_number
            );
            self.remove_change_nts(&victim, config)?;
        }
        let result = self.append_nts(change, payload, Some(handle), config);
        if result.is_err() && created {
            // A refusal must not leave the provisional entry behind.
            self.instances.discard_if_empty(&handle);
        }
        result
    }

    /// Ensure `change` carries a defined instance handle.
    ///
    /// Extracts the key from the payload through the scratch object when the
    /// protocol layer did not supply a handle.
    fn resolve_instance_nts(
        &mut self,
        change: &mut CacheChange,
        payload: &[u8],
        is_key_protected: bool,
        config: &HistoryConfig,
    ) -> Result<InstanceHandle> {
        if change.instance_handle.is_nil() {
            if let Some(scratch) = self.key_scratch.as_mut() {
                if let Err(e) = scratch.deserialize(payload) {
                    log::warn!(
                        "[ReaderHistory] topic '{}': cannot deserialize key of sample {}: {}",
                        config.topic_name,
                        change.sequence_number,
                        e
                    );
                    return Err(Error::KeyUnresolvable("payload yields no key".into()));
                }
                match scratch.get_key(is_key_protected) {
                    Some(handle) => change.instance_handle = handle,
                    None => {
                        log::warn!(
                            "[ReaderHistory] topic '{}': key extraction failed for sample {}",
                            config.topic_name,
                            change.sequence_number
                        );
                        return Err(Error::KeyUnresolvable("payload yields no key".into()));
                    }
                }
            }
        }
        if change.instance_handle.is_nil() {
            log::warn!(
                "[ReaderHistory] topic '{}': sample {} has no key and no method to obtain it",
                config.topic_name,
                change.sequence_number
            );
            return Err(Error::KeyUnresolvable("no key and no method".into()));
        }
        Ok(change.instance_handle)
    }

    /// Append an admitted change to the store and, if keyed, to the tail of
    /// its instance entry. Tail-append is correct because this history only
    /// supports reception order and samples arrive in that order.
    fn append_nts(
        &mut self,
        change: CacheChange,
        payload: &[u8],
        handle: Option<InstanceHandle>,
        config: &HistoryConfig,
    ) -> Result<()> {
        if self.store.is_full() {
            log::warn!(
                "[ReaderHistory] topic '{}': attempting to add sample {} to full history",
                config.topic_name,
                change.sequence_number
            );
            return Err(Error::CapacityExceeded("history full".into()));
        }
        let identity = change.identity();
        self.store.add(change, payload)?;
        if let Some(handle) = handle {
            match self.instances.get_mut(&handle) {
                Some(entry) => entry.changes.push(identity),
                None => {
                    // find_or_create ran earlier in the admission path.
                    log::error!(
                        "[ReaderHistory] topic '{}': instance {:?} vanished during admission",
                        config.topic_name,
                        handle
                    );
                }
            }
        }
        Ok(())
    }
}
