/*!
Modular output system for monitor notifications
*/

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{error, info};

use crate::core::{
    config::{OutputConfig, OutputPlugin, TelegramConfig, TerminalFormat},
    error::MonitorError,
    message::{Notification, NotificationKind},
};

/// Trait for output plugins
#[async_trait]
pub trait NotificationSink: Send {
    /// Name of the output handler
    fn name(&self) -> &'static str;

    /// Initialize the output (create files, connections, etc.)
    async fn initialize(&mut self) -> Result<(), MonitorError> {
        Ok(())
    }

    /// Deliver one notification
    async fn send(&mut self, notification: &Notification) -> Result<(), MonitorError>;

    /// Cleanup/finalize the output
    async fn finalize(&mut self) -> Result<(), MonitorError> {
        Ok(())
    }
}

/// Fans notifications out to every enabled sink.
///
/// Delivery is at-most-once: a failing sink is logged and skipped, never retried.
pub struct OutputManager {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl OutputManager {
    pub fn new(configs: &[OutputConfig], telegram: &TelegramConfig) -> Result<Self, MonitorError> {
        let mut sinks: Vec<Box<dyn NotificationSink>> = Vec::new();

        for config in configs {
            if !config.enabled {
                continue;
            }

            let sink: Box<dyn NotificationSink> = match &config.plugin {
                OutputPlugin::Telegram => Box::new(TelegramSink::new(telegram)?),
                OutputPlugin::Terminal { format } => Box::new(TerminalSink::new(*format)),
                OutputPlugin::Json { path, pretty } => {
                    Box::new(JsonSink::new(path.clone(), *pretty))
                }
                OutputPlugin::Sqlite { path, table_name } => {
                    Box::new(SqliteSink::new(path.clone(), table_name.clone())?)
                }
            };

            sinks.push(sink);
        }

        info!("Initialized output manager with {} outputs", sinks.len());
        Ok(Self { sinks })
    }

    /// Build from already constructed sinks
    pub fn with_sinks(sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Initialize all sinks
    pub async fn initialize(&mut self) -> Result<(), MonitorError> {
        for sink in &mut self.sinks {
            sink.initialize().await?;
            info!("Initialized output: {}", sink.name());
        }
        Ok(())
    }

    /// Send to every sink; returns how many accepted the notification
    pub async fn dispatch(&mut self, notification: &Notification) -> usize {
        let mut delivered = 0;
        for sink in &mut self.sinks {
            match sink.send(notification).await {
                Ok(()) => delivered += 1,
                Err(e) => error!("❌ {} notification not delivered: {}", notification.kind.as_str(), e),
            }
        }
        delivered
    }

    /// Finalize all sinks, logging rather than stopping on failures
    pub async fn finalize(&mut self) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.finalize().await {
                error!("Failed to finalize output {}: {}", sink.name(), e);
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

/// Telegram Bot API `sendMessage` output
pub struct TelegramSink {
    endpoint: String,
    chat_id: String,
    parse_mode: String,
    disable_web_page_preview: bool,
    client: reqwest::Client,
}

impl TelegramSink {
    pub fn new(config: &TelegramConfig) -> Result<Self, MonitorError> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MonitorError::Config("Telegram bot token is not set".to_string()))?;
        let chat_id = config
            .chat_id
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| MonitorError::Config("Telegram chat id is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MonitorError::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                token
            ),
            chat_id,
            parse_mode: config.parse_mode.clone(),
            disable_web_page_preview: config.disable_web_page_preview,
            client,
        })
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    fn name(&self) -> &'static str {
        "Telegram"
    }

    async fn send(&mut self, notification: &Notification) -> Result<(), MonitorError> {
        let payload = SendMessageRequest {
            chat_id: &self.chat_id,
            text: &notification.text,
            parse_mode: &self.parse_mode,
            disable_web_page_preview: self.disable_web_page_preview,
        };

        // reqwest errors can echo the URL, which carries the bot token
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MonitorError::dispatch(self.name(), e.without_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::dispatch(
                self.name(),
                format!(
                    "HTTP {}: {} ({} characters)",
                    status,
                    body.trim(),
                    notification.text.chars().count()
                ),
            ));
        }

        Ok(())
    }
}

/// Terminal output
pub struct TerminalSink {
    format: TerminalFormat,
}

impl TerminalSink {
    pub fn new(format: TerminalFormat) -> Self {
        Self { format }
    }

    fn format_notification(&self, notification: &Notification) -> String {
        let timestamp = notification.created_at.format("%Y-%m-%d %H:%M:%S");
        let body = strip_tags(&notification.text);
        match self.format {
            TerminalFormat::Plain => format!("[{}] {}", timestamp, body),
            TerminalFormat::Colored => {
                let color = match notification.kind {
                    NotificationKind::Startup => "\x1b[32m",
                    NotificationKind::NewLinks => "\x1b[31m",
                };
                format!("\x1b[36m[{}]\x1b[0m {}{}\x1b[0m", timestamp, color, body)
            }
            TerminalFormat::Json => serde_json::to_string_pretty(notification)
                .unwrap_or_else(|_| "JSON serialization failed".to_string()),
        }
    }
}

#[async_trait]
impl NotificationSink for TerminalSink {
    fn name(&self) -> &'static str {
        "Terminal"
    }

    async fn send(&mut self, notification: &Notification) -> Result<(), MonitorError> {
        println!("{}", self.format_notification(notification));
        println!();
        Ok(())
    }
}

/// Appends notifications to a JSON file
pub struct JsonSink {
    file_path: PathBuf,
    pretty: bool,
    file: Option<std::fs::File>,
}

impl JsonSink {
    pub fn new(file_path: PathBuf, pretty: bool) -> Self {
        Self {
            file_path,
            pretty,
            file: None,
        }
    }
}

#[async_trait]
impl NotificationSink for JsonSink {
    fn name(&self) -> &'static str {
        "JSON"
    }

    async fn initialize(&mut self) -> Result<(), MonitorError> {
        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.file = Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file_path)?,
        );
        Ok(())
    }

    async fn send(&mut self, notification: &Notification) -> Result<(), MonitorError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| MonitorError::dispatch("JSON", "output file is not open"))?;
        let json_str = if self.pretty {
            serde_json::to_string_pretty(notification)?
        } else {
            serde_json::to_string(notification)?
        };
        writeln!(file, "{}", json_str)?;
        file.flush()?;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<(), MonitorError> {
        if let Some(ref mut file) = self.file {
            file.flush()?;
        }
        Ok(())
    }
}

/// Archives notifications in a SQLite table
pub struct SqliteSink {
    file_path: PathBuf,
    table_name: String,
    conn: Option<Connection>,
}

impl SqliteSink {
    pub fn new(file_path: PathBuf, table_name: String) -> Result<Self, MonitorError> {
        // The table name is spliced into SQL, so keep it to a plain identifier
        let valid = !table_name.is_empty()
            && table_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !table_name.starts_with(|c: char| c.is_ascii_digit());
        if !valid {
            return Err(MonitorError::Config(format!(
                "invalid SQLite table name: {:?}",
                table_name
            )));
        }

        Ok(Self {
            file_path,
            table_name,
            conn: None,
        })
    }
}

#[async_trait]
impl NotificationSink for SqliteSink {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    async fn initialize(&mut self) -> Result<(), MonitorError> {
        let conn = Connection::open(&self.file_path)?;

        conn.execute(
            &format!(
                r#"
            CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                identifiers TEXT NOT NULL, -- JSON array
                total_links INTEGER NOT NULL,
                total_reports INTEGER NOT NULL,
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
        "#,
                self.table_name
            ),
            [],
        )?;

        self.conn = Some(conn);
        Ok(())
    }

    async fn send(&mut self, notification: &Notification) -> Result<(), MonitorError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| MonitorError::dispatch("SQLite", "database is not open"))?;
        let identifiers_json = serde_json::to_string(&notification.identifiers)?;

        conn.execute(
            &format!(
                "INSERT INTO {} (kind, identifiers, total_links, total_reports, text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                self.table_name
            ),
            (
                notification.kind.as_str(),
                identifiers_json,
                notification.total_links as i64,
                notification.total_reports as i64,
                &notification.text,
                notification.created_at.timestamp(),
            ),
        )?;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<(), MonitorError> {
        // SQLite auto-commits
        self.conn = None;
        Ok(())
    }
}

/// Drop HTML tags and decode the entities `escape_html` produces
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{new_links_alert, startup_notice};
    use crate::core::config::RunMode;
    use std::sync::{Arc, Mutex};

    struct Recorder(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl NotificationSink for Recorder {
        fn name(&self) -> &'static str {
            "Recorder"
        }

        async fn send(&mut self, notification: &Notification) -> Result<(), MonitorError> {
            self.0.lock().unwrap().push(notification.text.clone());
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl NotificationSink for Broken {
        fn name(&self) -> &'static str {
            "Broken"
        }

        async fn send(&mut self, _notification: &Notification) -> Result<(), MonitorError> {
            Err(MonitorError::dispatch("Broken", "HTTP 502"))
        }
    }

    fn alert() -> Notification {
        let items = ["evil.example".to_string()].into_iter().collect();
        new_links_alert(&items, 3, 2, "https://example.test/config.json")
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_block_others() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut manager =
            OutputManager::with_sinks(vec![Box::new(Broken), Box::new(Recorder(seen.clone()))]);

        let delivered = manager.dispatch(&alert()).await;
        assert_eq!(delivered, 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_disabled_outputs_are_skipped() {
        let configs = vec![
            OutputConfig {
                plugin: OutputPlugin::Telegram,
                enabled: false,
            },
            OutputConfig {
                plugin: OutputPlugin::Terminal {
                    format: TerminalFormat::Plain,
                },
                enabled: true,
            },
        ];
        let manager = OutputManager::new(&configs, &TelegramConfig::default()).unwrap();
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_telegram_requires_credentials() {
        assert!(TelegramSink::new(&TelegramConfig::default()).is_err());

        let config = TelegramConfig {
            bot_token: Some("123:abc".to_string()),
            chat_id: Some("-100".to_string()),
            api_base: "https://api.telegram.org/".to_string(),
            ..TelegramConfig::default()
        };
        let sink = TelegramSink::new(&config).unwrap();
        assert_eq!(sink.endpoint, "https://api.telegram.org/bot123:abc/sendMessage");
    }

    #[test]
    fn test_send_message_payload_shape() {
        let payload = SendMessageRequest {
            chat_id: "-100",
            text: "hi",
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["chat_id"], "-100");
        assert_eq!(value["text"], "hi");
        assert_eq!(value["parse_mode"], "HTML");
    }

    #[tokio::test]
    async fn test_telegram_unreachable_is_dispatch_error() {
        let config = TelegramConfig {
            bot_token: Some("123:secret".to_string()),
            chat_id: Some("-100".to_string()),
            api_base: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..TelegramConfig::default()
        };
        let mut sink = TelegramSink::new(&config).unwrap();
        let err = sink.send(&alert()).await.unwrap_err();
        assert!(matches!(err, MonitorError::Dispatch { sink: "Telegram", .. }));
        assert!(!err.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn test_json_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("alerts.jsonl");

        let mut sink = JsonSink::new(path.clone(), false);
        sink.initialize().await.unwrap();
        sink.send(&startup_notice(
            RunMode::Development,
            2,
            Duration::from_secs(60),
            "https://example.test",
        ))
        .await
        .unwrap();
        sink.send(&alert()).await.unwrap();
        sink.finalize().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "NewLinks");
        assert_eq!(second["identifiers"][0], "evil.example");
    }

    #[tokio::test]
    async fn test_sqlite_sink_archives_notifications() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.db");

        let mut sink = SqliteSink::new(path.clone(), "alerts".to_string()).unwrap();
        sink.initialize().await.unwrap();
        sink.send(&alert()).await.unwrap();
        sink.finalize().await.unwrap();

        let conn = Connection::open(&path).unwrap();
        let (kind, identifiers, reports): (String, String, i64) = conn
            .query_row(
                "SELECT kind, identifiers, total_reports FROM alerts",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(kind, "new_links");
        assert_eq!(identifiers, r#"["evil.example"]"#);
        assert_eq!(reports, 2);
    }

    #[test]
    fn test_sqlite_rejects_unsafe_table_name() {
        assert!(SqliteSink::new(PathBuf::from("x.db"), "alerts; DROP".to_string()).is_err());
        assert!(SqliteSink::new(PathBuf::from("x.db"), "1alerts".to_string()).is_err());
    }

    #[test]
    fn test_plain_terminal_strips_markup() {
        let sink = TerminalSink::new(TerminalFormat::Plain);
        let items = ["<b>&".to_string()].into_iter().collect();
        let text = sink.format_notification(&new_links_alert(&items, 1, 0, "u"));
        assert!(text.contains("NEW PHISHING LINK DETECTED!"));
        assert!(text.contains("<b>&"));
        assert!(!text.contains("<code>"));
    }
}
