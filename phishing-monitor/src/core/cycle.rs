/*!
One tick of the monitor: fetch, diff, enrich, notify, commit
*/

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use phishing_list::NewItems;

use crate::core::{
    config::{MonitorConfig, RunMode},
    list_source::ListSource,
    lookup::{Enricher, ReportLookup},
    message::{Notification, new_links_alert, startup_notice},
    output_plugins::OutputManager,
    state_manager::StateManager,
};

/// What a tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// First successful fetch; baseline set and startup notice sent
    Initialized { total_links: usize },
    /// Fetched successfully, nothing new
    Unchanged { total_links: usize },
    /// New identifiers found and reported
    Alerted {
        new_items: NewItems,
        total_links: usize,
        total_reports: u64,
        delivered: usize,
    },
    /// Fetch failed; state untouched
    Skipped { reason: String },
}

/// Settings the cycle needs from the configuration
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub mode: RunMode,
    pub interval: Duration,
    pub reference_url: String,
}

impl CycleSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            mode: config.mode,
            interval: config.schedule.interval(),
            reference_url: config.source.reference_url().to_string(),
        }
    }
}

/// The notifier cycle with its collaborators injected
pub struct NotifierCycle {
    source: Arc<dyn ListSource>,
    enricher: Enricher,
    outputs: OutputManager,
    settings: CycleSettings,
}

impl NotifierCycle {
    pub fn new(
        source: Arc<dyn ListSource>,
        enricher: Enricher,
        outputs: OutputManager,
        settings: CycleSettings,
    ) -> Self {
        Self {
            source,
            enricher,
            outputs,
            settings,
        }
    }

    /// Convenience constructor for a lookup with the given bounds
    pub fn with_lookup(
        source: Arc<dyn ListSource>,
        lookup: Arc<dyn ReportLookup>,
        lookup_timeout: Duration,
        max_concurrent: usize,
        outputs: OutputManager,
        settings: CycleSettings,
    ) -> Self {
        Self::new(
            source,
            Enricher::new(lookup, lookup_timeout, max_concurrent),
            outputs,
            settings,
        )
    }

    pub fn outputs_mut(&mut self) -> &mut OutputManager {
        &mut self.outputs
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    /// Run one tick against `state`.
    ///
    /// Never returns an error: failures are logged and reported as
    /// [`TickOutcome::Skipped`] with `state`'s snapshot unchanged.
    pub async fn run(&mut self, state: &mut StateManager) -> TickOutcome {
        state.record_tick();

        let document = match self.source.fetch().await {
            Ok(document) => document,
            Err(e) => {
                error!("❌ Error checking for new links: {}", e);
                state.record_failure();
                return TickOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };
        state.record_success();

        let current = document.flagged_set();
        let total_links = current.len();

        if !state.is_initialized() {
            state.commit(current);
            info!(
                "✅ Monitor initialized in {} mode with {} links",
                self.settings.mode.label().to_uppercase(),
                total_links
            );
            let notice = startup_notice(
                self.settings.mode,
                total_links,
                self.settings.interval,
                &self.settings.reference_url,
            );
            self.deliver(&notice).await;
            return TickOutcome::Initialized { total_links };
        }

        let new_items = state.diff(&current);
        if new_items.is_empty() {
            info!("✅ No new links found. Total: {}", total_links);
            state.commit(current);
            return TickOutcome::Unchanged { total_links };
        }

        info!(
            "🚨 Found {} new links, checking reports...",
            new_items.len()
        );
        let enrichment = self.enricher.enrich(new_items.iter().cloned().collect()).await;

        let alert = new_links_alert(
            &new_items,
            total_links,
            enrichment.total_reports,
            &self.settings.reference_url,
        );
        let delivered = self.deliver(&alert).await;
        if delivered > 0 {
            state.record_alert();
        }

        // Commit even when delivery failed: alerts are at-most-once
        state.commit(current);
        info!(
            "🚨 New links detected: {}",
            new_items.iter().cloned().collect::<Vec<_>>().join(", ")
        );

        TickOutcome::Alerted {
            new_items,
            total_links,
            total_reports: enrichment.total_reports,
            delivered,
        }
    }

    async fn deliver(&mut self, notification: &Notification) -> usize {
        let delivered = self.outputs.dispatch(notification).await;
        if delivered == 0 && !self.outputs.is_empty() {
            warn!(
                "⚠️ {} notification reached none of {} outputs",
                notification.kind.as_str(),
                self.outputs.len()
            );
        }
        delivered
    }
}
