// aiops-core/src/core/time.rs
// ============================================================================
// Module: Incident Pipeline Time Model
// Description: Canonical timestamp representation for workflow events.
// Purpose: Provide deterministic, replayable time values across the durable
//          workflow journal and all records it produces.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The workflow core never reads the wall clock directly. Every timestamp it
//! observes (trigger arrival, suspension deadline, retry backoff, verification
//! delay) is supplied explicitly by the host driving it, so that replaying a
//! persisted journal against the same sequence of supplied timestamps
//! reproduces byte-identical transitions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in workflow journals and pipeline records.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads
///   wall-clock time.
/// - No validation is performed; monotonicity within a single workflow run is
///   a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value, used in tests to drive replay without
    /// depending on wall-clock precision.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(value),
        }
    }

    /// Returns the elapsed milliseconds between two `UnixMillis` timestamps,
    /// or `None` if either value is not `UnixMillis` or `self` precedes
    /// `earlier`.
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> Option<i64> {
        match (self, earlier) {
            (Self::UnixMillis(later), Self::UnixMillis(earlier)) if later >= earlier => {
                Some(later - earlier)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Timestamp;

    #[test]
    fn millis_since_computes_elapsed_duration() {
        let start = Timestamp::UnixMillis(1_000);
        let end = Timestamp::UnixMillis(121_000);
        assert_eq!(end.millis_since(start), Some(120_000));
    }

    #[test]
    fn millis_since_rejects_mismatched_or_reversed_timestamps() {
        let logical = Timestamp::Logical(5);
        let wall = Timestamp::UnixMillis(1_000);
        assert_eq!(wall.millis_since(logical), None);
        assert_eq!(logical.millis_since(wall), None);
        assert_eq!(Timestamp::UnixMillis(1).millis_since(Timestamp::UnixMillis(2)), None);
    }
}
