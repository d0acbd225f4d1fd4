//! Reconciliation of bank movements against ledger movements
//!
//! The matcher links and unlinks pairs of records, the summary and the
//! suggestions are read-only views over the stored movements.

pub mod matcher;
pub mod suggest;
pub mod summary;

pub use matcher::*;
pub use suggest::*;
pub use summary::*;

use serde::{Deserialize, Serialize};

/// Tuning knobs of the [`ReconciliationMatcher`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatcherConfig {
    /// How many times a reconcile or revert re-reads and retries after a
    /// version conflict before giving up. Values below 1 count as 1.
    pub max_commit_attempts: u32,
    /// Largest date gap, in days, between two movements suggested as a match
    pub date_tolerance_days: i64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: 3,
            date_tolerance_days: 3,
        }
    }
}
