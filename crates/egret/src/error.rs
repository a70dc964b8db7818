// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors returned by history cache operations.
//!
//! The history never panics in release paths: every public operation reports
//! failure through this enum (or a `bool`/`Option` where the DDS API shape
//! calls for one) and logs the condition at the matching severity.

/// Errors returned by reader-history operations.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// QoS snapshot is invalid (e.g., KEEP_LAST depth of zero).
    InvalidQos(String),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Operation invoked before a reader was attached to the history.
    NotAttached,

    // ========================================================================
    // Admission Errors
    // ========================================================================
    /// Admission refused by the history policy or the instance table is full.
    CapacityExceeded(String),
    /// Payload could not yield an instance key, or the type has no extractor.
    KeyUnresolvable(String),
    /// Payload pool has no free slot for the sample payload.
    OutOfMemory,

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// Benign absence: the requested change or instance is not in the history.
    NotFound,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidQos(msg) => write!(f, "Invalid QoS: {}", msg),
            Error::NotAttached => write!(f, "History not attached to a reader"),
            Error::CapacityExceeded(msg) => write!(f, "Capacity exceeded: {}", msg),
            Error::KeyUnresolvable(msg) => write!(f, "Key unresolvable: {}", msg),
            Error::OutOfMemory => write!(f, "Payload pool exhausted"),
            Error::NotFound => write!(f, "Change or instance not found"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
