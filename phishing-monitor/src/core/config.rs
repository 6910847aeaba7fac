/*!
Configuration management for the phishing monitor
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::MonitorError;

pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_ENV: &str = "TELEGRAM_GROUP_CHAT_ID";
pub const MODE_ENV: &str = "MONITOR_MODE";

const DEFAULT_LIST_URL: &str =
    "https://raw.githubusercontent.com/MetaMask/eth-phishing-detect/refs/heads/main/src/config.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Label shown in the startup notice and status payload
    pub mode: RunMode,
    /// Where the list document lives
    pub source: SourceConfig,
    /// Tick cadence
    pub schedule: ScheduleConfig,
    /// Corroboration lookup settings
    pub lookup: LookupConfig,
    /// Bot API credentials and destination
    pub telegram: TelegramConfig,
    pub logging: LoggingConfig,
    /// Output sinks
    pub outputs: Vec<OutputConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Production,
    Development,
}

impl RunMode {
    pub fn label(&self) -> &'static str {
        match self {
            RunMode::Production => "production",
            RunMode::Development => "development",
        }
    }

    fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(RunMode::Production),
            "development" | "dev" => Some(RunMode::Development),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// URL of the JSON list document
    pub url: String,
    /// Link placed in notifications; defaults to `url`
    pub reference_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LookupConfig {
    pub enabled: bool,
    /// Lookup page prefix; the encoded address is appended
    pub base_url: String,
    /// Text that identifies a genuine lookup page
    pub site_marker: String,
    pub timeout_secs: u64,
    /// Upper bound on lookups in flight during one tick
    pub max_concurrent: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub parse_mode: String,
    pub timeout_secs: u64,
    pub disable_web_page_preview: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Output plugin type
    pub plugin: OutputPlugin,
    /// Whether this output is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OutputPlugin {
    Telegram,
    Terminal { format: TerminalFormat },
    Json { path: PathBuf, pretty: bool },
    Sqlite { path: PathBuf, table_name: String },
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum TerminalFormat {
    Plain,
    Colored,
    Json,
}

fn default_enabled() -> bool {
    true
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Development,
            source: SourceConfig::default(),
            schedule: ScheduleConfig::default(),
            lookup: LookupConfig::default(),
            telegram: TelegramConfig::default(),
            logging: LoggingConfig::default(),
            outputs: vec![
                OutputConfig {
                    plugin: OutputPlugin::Telegram,
                    enabled: true,
                },
                OutputConfig {
                    plugin: OutputPlugin::Terminal {
                        format: TerminalFormat::Colored,
                    },
                    enabled: true,
                },
            ],
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LIST_URL.to_string(),
            reference_url: None,
            timeout_secs: 30,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://www.chainabuse.com/domain/".to_string(),
            site_marker: "chainabuse".to_string(),
            timeout_secs: 10,
            max_concurrent: 8,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: None,
            chat_id: None,
            parse_mode: "HTML".to_string(),
            timeout_secs: 10,
            disable_web_page_preview: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SourceConfig {
    pub fn reference_url(&self) -> &str {
        self.reference_url.as_deref().unwrap_or(&self.url)
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MonitorConfig {
    /// Read a TOML config file, then apply environment overrides
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, MonitorError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let mut config: MonitorConfig = toml::from_str(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// `dirs::config_dir()/phishing-monitor/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("phishing-monitor").join("config.toml"))
    }

    /// Overlay credentials and mode from the environment.
    ///
    /// Takes a lookup function so tests do not have to touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(BOT_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = lookup(CHAT_ID_ENV).filter(|v| !v.trim().is_empty()) {
            self.telegram.chat_id = Some(chat_id);
        }
        if let Some(mode) = lookup(MODE_ENV).as_deref().and_then(RunMode::from_env_value) {
            self.mode = mode;
        }
    }

    pub fn telegram_enabled(&self) -> bool {
        self.outputs
            .iter()
            .any(|output| output.enabled && output.plugin == OutputPlugin::Telegram)
    }

    /// Reject settings the monitor cannot run with
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.schedule.interval_secs == 0 {
            return Err(MonitorError::Config(
                "schedule.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.lookup.enabled && self.lookup.max_concurrent == 0 {
            return Err(MonitorError::Config(
                "lookup.max_concurrent must be greater than zero".to_string(),
            ));
        }
        if self.telegram_enabled() {
            if self.telegram.bot_token.as_deref().is_none_or(str::is_empty) {
                return Err(MonitorError::Config(format!(
                    "Telegram output is enabled but no bot token is set (config telegram.bot_token or {})",
                    BOT_TOKEN_ENV
                )));
            }
            if self.telegram.chat_id.as_deref().is_none_or(str::is_empty) {
                return Err(MonitorError::Config(format!(
                    "Telegram output is enabled but no chat id is set (config telegram.chat_id or {})",
                    CHAT_ID_ENV
                )));
            }
        }
        Ok(())
    }
}
