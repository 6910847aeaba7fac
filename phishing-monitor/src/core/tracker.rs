/*!
Main coordinator that wires configuration, collaborators and state together
*/

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{
    config::MonitorConfig,
    cycle::{CycleSettings, NotifierCycle, TickOutcome},
    error::MonitorError,
    list_source::{HttpListSource, ListSource},
    lookup::{ChainAbuseLookup, NoLookup, ReportLookup},
    output_plugins::OutputManager,
    state_manager::StateManager,
};

/// The phishing monitor: explicit state plus the cycle that updates it
pub struct Monitor {
    config: MonitorConfig,
    state: StateManager,
    cycle: NotifierCycle,
    started_at: DateTime<Utc>,
}

impl Monitor {
    /// Build a monitor with HTTP collaborators and initialize its outputs
    pub async fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        info!("Initializing phishing monitor...");
        config.validate()?;

        let source: Arc<dyn ListSource> = Arc::new(HttpListSource::new(&config.source)?);
        let lookup: Arc<dyn ReportLookup> = if config.lookup.enabled {
            Arc::new(ChainAbuseLookup::new(&config.lookup)?)
        } else {
            info!("Report lookups disabled");
            Arc::new(NoLookup)
        };
        let outputs = OutputManager::new(&config.outputs, &config.telegram)?;

        let cycle = NotifierCycle::with_lookup(
            source,
            lookup,
            config.lookup.timeout(),
            config.lookup.max_concurrent,
            outputs,
            CycleSettings::from_config(&config),
        );

        Self::from_parts(config, cycle).await
    }

    /// Build a monitor around an already assembled cycle
    pub async fn from_parts(
        config: MonitorConfig,
        mut cycle: NotifierCycle,
    ) -> Result<Self, MonitorError> {
        cycle.outputs_mut().initialize().await?;

        info!("📊 Source: {}", config.source.url);
        info!("🌍 Mode: {}", config.mode.label());

        Ok(Self {
            config,
            state: StateManager::new(),
            cycle,
            started_at: Utc::now(),
        })
    }

    /// Run one tick
    pub async fn tick(&mut self) -> TickOutcome {
        self.cycle.run(&mut self.state).await
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Read-only status payload
    pub fn status(&self, monitoring: bool) -> MonitorStatus {
        MonitorStatus {
            status: "running".to_string(),
            mode: self.config.mode.label().to_string(),
            timestamp: Utc::now(),
            total_links: self.state.total_links(),
            initialized: self.state.is_initialized(),
            monitoring,
            started_at: self.started_at,
            ticks: self.state.ticks(),
            alerts_sent: self.state.alerts_sent(),
            consecutive_failures: self.state.consecutive_failures(),
            last_success: self.state.last_success(),
        }
    }

    /// Finalize outputs
    pub async fn shutdown(mut self) {
        info!("🛑 Initiating graceful shutdown...");
        self.cycle.outputs_mut().finalize().await;
        info!("✅ Shutdown completed successfully");
    }
}

/// Status of the monitor, serialized with the same field names as the
/// original web status route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub status: String,
    pub mode: String,
    pub timestamp: DateTime<Utc>,
    pub total_links: usize,
    pub initialized: bool,
    pub monitoring: bool,
    pub started_at: DateTime<Utc>,
    pub ticks: u64,
    pub alerts_sent: u64,
    pub consecutive_failures: u32,
    pub last_success: Option<DateTime<Utc>>,
}

/// Helper function to create a monitor from a config file
pub async fn create_monitor_from_config_file<P: AsRef<Path>>(
    config_path: P,
) -> Result<Monitor, MonitorError> {
    let config = MonitorConfig::load(config_path).await?;
    Monitor::new(config).await
}

/// Helper function to create a monitor with default config and environment credentials
pub async fn create_default_monitor() -> Result<Monitor, MonitorError> {
    Monitor::new(MonitorConfig::from_env()).await
}
