/*!
In-memory state carried from one tick to the next
*/

use chrono::{DateTime, Utc};
use tracing::{Level, debug, info, warn};

use phishing_list::snapshot::{self, FlaggedSet, NewItems, Snapshot};

/// Consecutive failed ticks between health warnings
const FAILURE_WARN_EVERY: u32 = 5;

/// Explicit state object handed to each tick.
///
/// Nothing here survives a restart: the first tick after start always
/// re-establishes the baseline.
#[derive(Debug, Default)]
pub struct StateManager {
    snapshot: Snapshot,
    ticks: u64,
    consecutive_failures: u32,
    last_success: Option<DateTime<Utc>>,
    alerts_sent: u64,
}

impl StateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers in `current` that are not in the committed baseline
    pub fn diff(&self, current: &FlaggedSet) -> NewItems {
        self.snapshot.diff(current)
    }

    /// Replace the baseline with `current`
    pub fn commit(&mut self, current: FlaggedSet) {
        if tracing::enabled!(Level::DEBUG) && self.snapshot.matches(&current) {
            let fingerprint = snapshot::fingerprint(&current);
            debug!("List unchanged since last tick ({})", &fingerprint[..12]);
        }
        self.snapshot.commit(current);
        debug!("Committed snapshot of {} identifiers", self.snapshot.len());
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot.is_initialized()
    }

    pub fn total_links(&self) -> usize {
        self.snapshot.len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn alerts_sent(&self) -> u64 {
        self.alerts_sent
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks += 1;
    }

    pub(crate) fn record_alert(&mut self) {
        self.alerts_sent += 1;
    }

    pub(crate) fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            info!(
                "✅ List source recovered after {} failed ticks",
                self.consecutive_failures
            );
        }
        self.consecutive_failures = 0;
        self.last_success = Some(Utc::now());
    }

    pub(crate) fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        if self.consecutive_failures % FAILURE_WARN_EVERY == 0 {
            warn!(
                "⚠️ {} consecutive ticks failed; last success: {}",
                self.consecutive_failures,
                self.last_success
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string())
            );
        }
    }
}
