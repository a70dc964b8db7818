// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sample metadata returned to the application alongside a sample.

use crate::core::types::{CacheChange, ChangeKind, InstanceHandle, SampleIdentity};

/// Sample state per DDS spec (NOT_READ vs READ).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleState {
    /// Sample has not been read yet.
    NotRead,
    /// Sample has been accessed via `read()`.
    Read,
}

/// View state of the instance the sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// First sample of a (re)born instance.
    New,
    /// Instance already seen by this reader.
    NotNew,
}

/// Lifecycle state of the instance the sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Alive,
    NotAliveDisposed,
    NotAliveNoWriters,
}

/// Metadata record built for each sample handed to the application.
///
/// The generation counts and ranks are fixed placeholders; per-instance
/// generation tracking is not implemented yet.
#[derive(Debug, Clone, Copy)]
pub struct SampleInfo {
    pub sample_state: SampleState,
    pub view_state: ViewState,
    pub instance_state: InstanceState,
    pub disposed_generation_count: u32,
    pub no_writers_generation_count: u32,
    pub sample_rank: i32,
    pub generation_rank: i32,
    pub absolute_generation_rank: i32,
    pub source_timestamp_ns: u64,
    pub reception_timestamp_ns: u64,
    pub instance_handle: InstanceHandle,
    pub publication_handle: InstanceHandle,
    pub sample_identity: SampleIdentity,
    pub related_sample_identity: SampleIdentity,
    pub valid_data: bool,
}

impl SampleInfo {
    /// Build the metadata record for one cached change.
    pub fn from_change(change: &CacheChange) -> Self {
        Self {
            sample_state: SampleState::NotRead,
            view_state: ViewState::NotNew,
            instance_state: match change.kind {
                ChangeKind::NotAliveDisposed => InstanceState::NotAliveDisposed,
                // Unregister handling pending; treated as alive for now.
                ChangeKind::Alive | ChangeKind::NotAliveUnregistered => InstanceState::Alive,
            },
            disposed_generation_count: 0,
            no_writers_generation_count: 1,
            sample_rank: 0,
            generation_rank: 0,
            absolute_generation_rank: 0,
            source_timestamp_ns: change.source_timestamp_ns,
            reception_timestamp_ns: change.reception_timestamp_ns,
            instance_handle: change.instance_handle,
            publication_handle: InstanceHandle::from_guid(change.writer_guid),
            sample_identity: change.identity(),
            related_sample_identity: change.write_params.related_sample_identity,
            valid_data: change.kind == ChangeKind::Alive,
        }
    }
}
