/*!
Notification composition (Telegram HTML parse mode)
*/

use std::borrow::Cow;
use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use phishing_list::NewItems;

use crate::core::config::RunMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Startup,
    NewLinks,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Startup => "startup",
            NotificationKind::NewLinks => "new_links",
        }
    }
}

/// One outbound message, plus the facts it was built from so that archive
/// outputs can store them without re-parsing the text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
    pub identifiers: Vec<String>,
    pub total_links: usize,
    pub total_reports: u64,
    pub created_at: DateTime<Utc>,
}

/// Builds the notice sent once the baseline is established
pub fn startup_notice(
    mode: RunMode,
    total_links: usize,
    interval: Duration,
    reference_url: &str,
) -> Notification {
    let text = format!(
        "🤖 <b>Phishing Monitor Started!</b>\n\n\
         🌍 Mode: <b>{}</b>\n\
         📊 Monitoring {} known phishing links\n\
         ⏰ Checking {} for new threats\n\
         🔗 Source: <a href=\"{}\">MetaMask Config</a>",
        mode.label().to_uppercase(),
        total_links,
        describe_interval(interval),
        escape_html(reference_url),
    );

    Notification {
        kind: NotificationKind::Startup,
        text,
        identifiers: Vec::new(),
        total_links,
        total_reports: 0,
        created_at: Utc::now(),
    }
}

/// Telegram rejects messages longer than this many characters
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Longest identifier shown verbatim in an alert
const MAX_SHOWN_IDENTIFIER: usize = 256;

/// Room kept for the "… and N more" line
const OVERFLOW_LINE_RESERVE: usize = 40;

/// Builds the single aggregate alert for all identifiers new in this tick.
///
/// The listing is cut short with "… and N more" once the text would exceed
/// [`TELEGRAM_MESSAGE_LIMIT`]; `identifiers` always holds the full set.
pub fn new_links_alert(
    new_items: &NewItems,
    total_links: usize,
    total_reports: u64,
    reference_url: &str,
) -> Notification {
    let mut text = String::from("🚨 <b>NEW PHISHING LINK DETECTED!</b> 🚨\n\n");
    let footer = alert_footer(total_links, total_reports, reference_url);

    let identifiers: Vec<String> = new_items.iter().cloned().collect();
    if let [only] = identifiers.as_slice() {
        let _ = write!(
            text,
            "🔗 New link on MetaMask phishing list:\n<code>{}</code>\n\n",
            escape_html(&clip(only))
        );
    } else {
        let _ = writeln!(
            text,
            "🔗 Found {} new links on MetaMask phishing list:",
            identifiers.len()
        );

        let mut budget = TELEGRAM_MESSAGE_LIMIT.saturating_sub(
            text.chars().count() + footer.chars().count() + OVERFLOW_LINE_RESERVE + 1,
        );
        let mut shown = 0;
        for identifier in &identifiers {
            let line = format!("<code>{}</code>\n", escape_html(&clip(identifier)));
            let len = line.chars().count();
            if len > budget {
                break;
            }
            budget -= len;
            text.push_str(&line);
            shown += 1;
        }
        if shown < identifiers.len() {
            let _ = writeln!(text, "… and {} more", identifiers.len() - shown);
        }
        text.push('\n');
    }

    text.push_str(&footer);

    Notification {
        kind: NotificationKind::NewLinks,
        text,
        identifiers,
        total_links,
        total_reports,
        created_at: Utc::now(),
    }
}

fn alert_footer(total_links: usize, total_reports: u64, reference_url: &str) -> String {
    let mut footer = format!("📊 Total MetaMask links now: {}\n\n", total_links);

    if total_reports > 0 {
        let _ = write!(
            footer,
            "🕵️ ChainAbuse: Found <b>{}</b> reports total\n\n",
            total_reports
        );
    } else {
        footer.push_str("🕵️ ChainAbuse: No reports found\n\n");
    }

    let _ = write!(
        footer,
        "📋 Check full MetaMask list: <a href=\"{}\">MetaMask Config</a>",
        escape_html(reference_url)
    );
    footer
}

/// Shorten an identifier to [`MAX_SHOWN_IDENTIFIER`] characters
fn clip(identifier: &str) -> Cow<'_, str> {
    match identifier.char_indices().nth(MAX_SHOWN_IDENTIFIER) {
        Some((end, _)) => Cow::Owned(format!("{}…", &identifier[..end])),
        None => Cow::Borrowed(identifier),
    }
}

/// "every minute", "every 5 minutes", "every 90 seconds"
fn describe_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    match secs {
        60 => "every minute".to_string(),
        s if s >= 60 && s % 60 == 0 => format!("every {} minutes", s / 60),
        1 => "every second".to_string(),
        s => format!("every {} seconds", s),
    }
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}
