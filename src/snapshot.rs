//! The cumulative-text snapshot delivered during streaming analysis.

use serde::{Deserialize, Serialize};

/// The full text produced by the analysis service at a point in time.
///
/// Snapshots are cumulative, not deltas: for snapshots delivered in order
/// during one session, each earlier text is a prefix of each later one. The
/// latest snapshot is therefore always authoritative and prior ones can be
/// discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub text: String,
}

impl AnalysisSnapshot {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True when this snapshot is a monotonic extension of `prior`, the
    /// append-only growth invariant of a well-behaved stream.
    pub fn extends(&self, prior: &AnalysisSnapshot) -> bool {
        self.text.starts_with(&prior.text)
    }
}
