#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use phishing_list::{LookupResult, PhishingConfig};
use phishing_monitor::core::{
    config::RunMode,
    cycle::{CycleSettings, NotifierCycle},
    error::MonitorError,
    list_source::ListSource,
    lookup::ReportLookup,
    message::Notification,
    output_plugins::{NotificationSink, OutputManager},
};

pub const REFERENCE_URL: &str = "https://example.test/config.json";

/// Builds a list document with everything in the blacklist
pub fn document(blacklist: &[&str], fuzzylist: &[&str]) -> PhishingConfig {
    PhishingConfig {
        blacklist: Some(blacklist.iter().map(|s| s.to_string()).collect()),
        fuzzylist: Some(fuzzylist.iter().map(|s| s.to_string()).collect()),
        ..PhishingConfig::default()
    }
}

/// Replays queued responses, one per fetch
#[derive(Clone, Default)]
pub struct ScriptedSource {
    responses: Arc<Mutex<VecDeque<Result<PhishingConfig, String>>>>,
    pub fetches: Arc<Mutex<u32>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, doc: PhishingConfig) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(doc));
        self
    }

    pub fn push_err(&self, reason: &str) -> &Self {
        self.responses.lock().unwrap().push_back(Err(reason.to_string()));
        self
    }
}

#[async_trait]
impl ListSource for ScriptedSource {
    async fn fetch(&self) -> Result<PhishingConfig, MonitorError> {
        *self.fetches.lock().unwrap() += 1;
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(doc)) => Ok(doc),
            Some(Err(reason)) => Err(MonitorError::fetch("scripted://list", reason)),
            None => Err(MonitorError::fetch("scripted://list", "script exhausted")),
        }
    }
}

#[derive(Clone, Copy)]
pub enum LookupBehavior {
    Reports(u64),
    Hang,
}

/// Lookup with canned answers; unknown identifiers are not found
#[derive(Clone, Default)]
pub struct FakeLookup {
    behaviors: HashMap<String, LookupBehavior>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, identifier: &str, behavior: LookupBehavior) -> Self {
        self.behaviors.insert(identifier.to_string(), behavior);
        self
    }
}

#[async_trait]
impl ReportLookup for FakeLookup {
    async fn lookup(&self, identifier: &str) -> LookupResult {
        self.calls.lock().unwrap().push(identifier.to_string());
        match self.behaviors.get(identifier) {
            Some(LookupBehavior::Reports(count)) => LookupResult::found(identifier, *count),
            Some(LookupBehavior::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                LookupResult::found(identifier, 1000)
            }
            None => LookupResult::not_found(identifier),
        }
    }
}

/// Records every notification; optionally fails after recording
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub sent: Arc<Mutex<Vec<Notification>>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &'static str {
        "Recording"
    }

    async fn send(&mut self, notification: &Notification) -> Result<(), MonitorError> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            return Err(MonitorError::dispatch("Recording", "HTTP 500"));
        }
        Ok(())
    }
}

pub fn settings() -> CycleSettings {
    CycleSettings {
        mode: RunMode::Production,
        interval: Duration::from_secs(60),
        reference_url: REFERENCE_URL.to_string(),
    }
}

pub fn cycle(source: &ScriptedSource, lookup: FakeLookup, sink: &RecordingSink) -> NotifierCycle {
    NotifierCycle::with_lookup(
        Arc::new(source.clone()),
        Arc::new(lookup),
        Duration::from_millis(100),
        4,
        OutputManager::with_sinks(vec![Box::new(sink.clone())]),
        settings(),
    )
}
