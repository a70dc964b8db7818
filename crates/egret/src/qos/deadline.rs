// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DEADLINE QoS policy (DDS v1.4 Sec.2.2.3.7)
//!
//! The longest gap the reader tolerates between samples of one instance.
//! The enclosing reader uses the period to arm per-instance deadlines in
//! the history; missing one triggers a QoS notification outside this crate.

use std::time::Duration;

/// DEADLINE QoS policy.
///
/// `period` of `None` disables enforcement, the DDS default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline {
    /// Expected maximum time between samples, `None` for no deadline.
    pub period: Option<Duration>,
}

impl Deadline {
    /// Expect a sample at least every `period`.
    pub fn new(period: Duration) -> Self {
        Self {
            period: Some(period),
        }
    }

    /// No deadline enforcement.
    pub fn none() -> Self {
        Self { period: None }
    }

    /// Expect a sample at least every `ms` milliseconds.
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Whether a period is set at all.
    pub fn is_enforced(&self) -> bool {
        self.period.is_some()
    }

    /// Request-vs-offered check: does this offered (writer) deadline meet
    /// the `requested` (reader) one?
    ///
    /// A writer that publishes at least as often as the reader expects is
    /// compatible. No requested deadline accepts any writer; no offered
    /// deadline meets only a request that asks for none.
    pub fn satisfies(&self, requested: &Deadline) -> bool {
        match (self.period, requested.period) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(offered), Some(wanted)) => offered <= wanted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_deadline() {
        let deadline = Deadline::default();
        assert_eq!(deadline.period, None);
        assert!(!deadline.is_enforced());
        assert_eq!(deadline, Deadline::none());
    }

    #[test]
    fn test_constructors_set_period() {
        assert_eq!(
            Deadline::from_millis(100).period,
            Some(Duration::from_millis(100))
        );
        assert!(Deadline::new(Duration::from_secs(1)).is_enforced());
    }

    #[test]
    fn test_satisfies_faster_writer() {
        // Writer publishes every 100ms, reader expects one within 200ms.
        let offered = Deadline::from_millis(100);
        let requested = Deadline::from_millis(200);
        assert!(offered.satisfies(&requested));
        assert!(!requested.satisfies(&offered));
        assert!(offered.satisfies(&offered));
    }

    #[test]
    fn test_satisfies_with_no_deadline() {
        let none = Deadline::none();
        let finite = Deadline::from_millis(100);

        // A reader that asks for nothing accepts any writer.
        assert!(none.satisfies(&none));
        assert!(finite.satisfies(&none));
        // A writer with no deadline cannot meet a finite request.
        assert!(!none.satisfies(&finite));
    }
}
