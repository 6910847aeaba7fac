/*!
Fetching the published phishing list
*/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use tracing::debug;

use phishing_list::PhishingConfig;

use crate::core::{config::SourceConfig, error::MonitorError};

/// Source of the current list document
#[async_trait]
pub trait ListSource: Send + Sync {
    /// Fetch and parse the current document.
    ///
    /// Fails with [`MonitorError::Fetch`] on transport errors or a non-2xx
    /// status and [`MonitorError::Parse`] on a malformed body.
    async fn fetch(&self) -> Result<PhishingConfig, MonitorError>;
}

/// Fetches the list over HTTP with caching disabled
pub struct HttpListSource {
    url: String,
    client: Client,
}

impl HttpListSource {
    pub fn new(config: &SourceConfig) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("phishing-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MonitorError::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }
}

#[async_trait]
impl ListSource for HttpListSource {
    async fn fetch(&self) -> Result<PhishingConfig, MonitorError> {
        let response = self
            .client
            .get(&self.url)
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| MonitorError::fetch(&self.url, e))?;

        if !response.status().is_success() {
            return Err(MonitorError::fetch(
                &self.url,
                format!("HTTP {}", response.status()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| MonitorError::fetch(&self.url, e))?;
        debug!("Fetched {} bytes from {}", body.len(), self.url);

        Ok(PhishingConfig::from_slice(&body)?)
    }
}
