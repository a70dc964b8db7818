// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cached sample records.
//!
//! A [`CacheChange`] is the metadata of one received sample. Payload bytes
//! are not part of the record: the change store places them in its payload
//! pool on admission and releases them on removal.

use std::time::{SystemTime, UNIX_EPOCH};

use super::{InstanceHandle, GUID};

/// Wall-clock time in nanoseconds since the Unix epoch.
pub fn current_time_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Lifecycle kind of a received change (DDS v1.4 Sec.2.2.2.5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Regular data sample.
    Alive,
    /// Writer disposed the instance.
    NotAliveDisposed,
    /// Writer unregistered from the instance.
    NotAliveUnregistered,
}

/// Identity of one sample: writer GUID plus its sequence number.
///
/// This pair is what the history matches when it removes a change from an
/// instance entry, standing in for the pointer identity of the store slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleIdentity {
    pub writer_guid: GUID,
    pub sequence_number: u64,
}

impl SampleIdentity {
    pub fn new(writer_guid: GUID, sequence_number: u64) -> Self {
        Self {
            writer_guid,
            sequence_number,
        }
    }

    /// Identity with the placeholder writer and sequence number zero.
    pub fn unknown() -> Self {
        Self {
            writer_guid: GUID::UNKNOWN,
            sequence_number: 0,
        }
    }
}

/// Write-side parameters carried alongside a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteParams {
    pub sample_identity: SampleIdentity,
    pub related_sample_identity: SampleIdentity,
}

impl Default for WriteParams {
    fn default() -> Self {
        Self {
            sample_identity: SampleIdentity::unknown(),
            related_sample_identity: SampleIdentity::unknown(),
        }
    }
}

/// Metadata of one received sample.
///
/// Produced by the protocol receive path. `instance_handle` may be nil on
/// arrival; the history sets it when it resolves the key from the payload.
/// The history never mutates any other field.
#[derive(Debug, Clone, Copy)]
pub struct CacheChange {
    pub kind: ChangeKind,
    pub writer_guid: GUID,
    pub sequence_number: u64,
    pub instance_handle: InstanceHandle,
    /// Source timestamp stamped by the writer, ns since Unix epoch.
    pub source_timestamp_ns: u64,
    /// Reception timestamp stamped by the receive path, ns since Unix epoch.
    pub reception_timestamp_ns: u64,
    pub write_params: WriteParams,
}

impl CacheChange {
    /// Build an ALIVE change with the reception timestamp stamped now.
    pub fn new(writer_guid: GUID, sequence_number: u64) -> Self {
        Self {
            kind: ChangeKind::Alive,
            writer_guid,
            sequence_number,
            instance_handle: InstanceHandle::nil(),
            source_timestamp_ns: 0,
            reception_timestamp_ns: current_time_ns(),
            write_params: WriteParams::default(),
        }
    }

    /// The `(writer_guid, sequence_number)` identity of this change.
    pub fn identity(&self) -> SampleIdentity {
        SampleIdentity::new(self.writer_guid, self.sequence_number)
    }
}
