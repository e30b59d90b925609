// ## src/telemetry/snapshot.rs

use serde::{Deserialize, Serialize};

/// Point-in-time copy of the dispatch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSnapshot {
    pub submitted: u64,
    pub delivered: u64,
    pub discarded: u64,
    pub skipped: u64,
    pub transport_failures: u64,
}

impl DispatchSnapshot {
    /// Requests that reached a terminal state (delivered, discarded or skipped).
    pub fn settled(&self) -> u64 {
        self.delivered + self.discarded + self.skipped
    }

    /// Submitted but not yet settled.
    pub fn in_flight(&self) -> u64 {
        self.submitted.saturating_sub(self.settled())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
