// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic type plugin.
//!
//! The history does not know how topic types are serialized. It consumes a
//! small capability set: whether the type defines a key, the maximum
//! serialized payload size (which sizes the payload pool), and a scratch
//! object able to extract an instance key from payload bytes.

use crate::core::types::InstanceHandle;
use crate::error::Result;

/// Capability set the history consumes from a topic type.
pub trait TypeSupport: Send + Sync {
    /// Registered type name.
    fn type_name(&self) -> &str;

    /// Whether the type defines @key fields.
    fn has_key(&self) -> bool {
        false
    }

    /// Maximum serialized payload size in bytes.
    fn payload_size(&self) -> usize;

    /// Allocate the reusable key-extraction scratch object.
    ///
    /// Returns `None` when the type defines no key, or when key extraction
    /// is not implemented for it. Called once at history construction; the
    /// scratch lives as long as the history and is reused on every
    /// extraction.
    fn create_key_scratch(&self) -> Option<Box<dyn KeyScratch>> {
        None
    }
}

/// Reusable key-extraction buffer for one topic type.
pub trait KeyScratch: Send {
    /// Deserialize the key fields of `payload` into the scratch state.
    fn deserialize(&mut self, payload: &[u8]) -> Result<()>;

    /// Produce the instance handle for the deserialized key.
    ///
    /// `is_key_protected` selects the protected-key hashing mandated by DDS
    /// Security; plugins without security support may ignore it.
    fn get_key(&self, is_key_protected: bool) -> Option<InstanceHandle>;
}
