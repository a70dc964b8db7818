// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Egret - reader-side DDS sample history cache
//!
//! The in-memory store a DDS subscription endpoint deposits received samples
//! into, and from which application code and the protocol layer read, take,
//! and age them out. Egret enforces per-topic and per-instance resource
//! limits, the KEEP_ALL and KEEP_LAST history kinds, keyed topic semantics
//! with on-the-fly key extraction, and per-instance deadline bookkeeping.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use egret::{QosProfile, ReaderHistory, ReaderLink, Result};
//! use egret::qos::History;
//! use std::sync::Arc;
//!
//! fn run(
//!     type_support: &dyn egret::TypeSupport,
//!     reader: Arc<dyn ReaderLink>,
//! ) -> Result<()> {
//!     let qos = QosProfile {
//!         history: History::KeepLast(10),
//!         ..Default::default()
//!     };
//!     let history = ReaderHistory::new("sensors/temperature", type_support, &qos)?;
//!     history.attach_reader(reader);
//!
//!     // The protocol receive path deposits samples:
//!     // history.received_change(change, payload_bytes);
//!
//!     // The application side reads metadata:
//!     if let Some(info) = history.get_first_untaken_info() {
//!         println!("next sample from {}", info.sample_identity.writer_guid);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ReaderHistory`] | The per-topic sample history cache |
//! | [`CacheChange`] | Metadata of one received sample |
//! | [`SampleInfo`] | Metadata record returned to the application |
//! | [`ReaderLink`] | Contract with the enclosing RTPS reader |
//! | [`TypeSupport`] | Topic type plugin (key extraction, payload sizing) |
//! | [`QosProfile`] | History, resource-limit, deadline, and memory QoS |
//!
//! ## Scope
//!
//! Egret is pure in-memory state: it owns no threads, no sockets, and no
//! persistence. The network receive path, the user-facing DataReader API,
//! and QoS notifications live in the enclosing stack and talk to this crate
//! through the [`ReaderLink`] and [`TypeSupport`] contracts.

/// Core building blocks (identity types, payload pool).
pub mod core;
/// Errors returned by history operations.
pub mod error;
/// The reader-side sample history cache.
pub mod history;
/// QoS policies consumed by the history.
pub mod qos;
/// Topic type plugin traits.
pub mod type_support;

pub use crate::core::types::{
    current_time_ns, CacheChange, ChangeKind, InstanceHandle, SampleIdentity, WriteParams, GUID,
};
pub use error::{Error, Result};
pub use history::{
    InstanceState, ReaderHistory, ReaderLink, SampleInfo, SampleState, ViewState,
};
pub use qos::{Deadline, History, MemoryPolicy, QosProfile, ResourceLimits};
pub use type_support::{KeyScratch, TypeSupport};
