/*!
Best-effort corroboration of new identifiers against an abuse-report site
*/

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use reqwest::{Client, header};
use tracing::{debug, info, warn};

use phishing_list::{
    LookupResult, ReportExtractor,
    reports::lookup_url,
};

use crate::core::{config::LookupConfig, error::MonitorError};

/// Corroboration lookup for one identifier.
///
/// Implementations never fail: every problem collapses into
/// [`LookupResult::not_found`].
#[async_trait]
pub trait ReportLookup: Send + Sync {
    async fn lookup(&self, identifier: &str) -> LookupResult;
}

/// Scrapes report counts from ChainAbuse-style domain pages
pub struct ChainAbuseLookup {
    base_url: String,
    client: Client,
    extractor: ReportExtractor,
}

impl ChainAbuseLookup {
    pub fn new(config: &LookupConfig) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| MonitorError::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            client,
            extractor: ReportExtractor::new(config.site_marker.clone()),
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl ReportLookup for ChainAbuseLookup {
    async fn lookup(&self, identifier: &str) -> LookupResult {
        let url = lookup_url(&self.base_url, identifier);
        debug!("🔍 Checking reports for {} at {}", identifier, url);

        let html = match self.fetch_page(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("❌ Report lookup failed for {}: {}", identifier, e);
                return LookupResult::not_found(identifier);
            }
        };

        let result = self.extractor.extract(identifier, &html);
        if result.found {
            info!("✅ {} reports for {}", result.report_count, identifier);
        } else {
            debug!("❓ No report page found for {}", identifier);
        }
        result
    }
}

/// Lookup used when enrichment is switched off
pub struct NoLookup;

#[async_trait]
impl ReportLookup for NoLookup {
    async fn lookup(&self, identifier: &str) -> LookupResult {
        LookupResult::not_found(identifier)
    }
}

/// Aggregate of all lookups made for one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub results: Vec<LookupResult>,
    pub total_reports: u64,
}

/// Runs lookups for every identifier and waits for all of them to settle.
///
/// At most `max_concurrent` lookups are in flight; each is cut off after
/// `timeout` so one stalled page cannot hold the tick.
pub struct Enricher {
    lookup: Arc<dyn ReportLookup>,
    timeout: Duration,
    max_concurrent: usize,
}

impl Enricher {
    pub fn new(lookup: Arc<dyn ReportLookup>, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            lookup,
            timeout,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Look up every identifier. Each lookup owns its identifier so the
    /// returned future stays `Send` and can run inside a spawned task.
    pub async fn enrich(&self, identifiers: Vec<String>) -> Enrichment {
        let tasks: Vec<_> = identifiers
            .into_iter()
            .map(|identifier| {
                let lookup = self.lookup.clone();
                let timeout = self.timeout;
                async move {
                    match tokio::time::timeout(timeout, lookup.lookup(&identifier)).await {
                        Ok(result) => result,
                        Err(_) => {
                            let err = MonitorError::LookupTimeout {
                                identifier: identifier.clone(),
                                after: timeout,
                            };
                            warn!("⏱️ {}", err);
                            LookupResult::not_found(identifier)
                        }
                    }
                }
            })
            .collect();

        let results: Vec<LookupResult> = stream::iter(tasks)
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        // Counts are scraped from untrusted pages
        let total_reports = results
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.report_count));
        Enrichment {
            results,
            total_reports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLookup;

    #[async_trait]
    impl ReportLookup for FixedLookup {
        async fn lookup(&self, identifier: &str) -> LookupResult {
            match identifier {
                "slow.example" => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    LookupResult::found(identifier, 100)
                }
                "known.example" => LookupResult::found(identifier, 5),
                "listed.example" => LookupResult::found(identifier, 0),
                "huge.example" => LookupResult::found(identifier, u64::MAX),
                "one.example" => LookupResult::found(identifier, 1),
                _ => LookupResult::not_found(identifier),
            }
        }
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_sums_counts_and_tolerates_timeouts() {
        let enricher = Enricher::new(Arc::new(FixedLookup), Duration::from_millis(50), 4);
        let identifiers = ids(&["slow.example", "known.example", "listed.example", "x.example"]);

        let enrichment = enricher.enrich(identifiers).await;
        assert_eq!(enrichment.total_reports, 5);
        assert_eq!(enrichment.results.len(), 4);

        let slow = enrichment
            .results
            .iter()
            .find(|r| r.identifier == "slow.example")
            .unwrap();
        assert!(!slow.found);
        assert_eq!(slow.report_count, 0);
    }

    #[tokio::test]
    async fn test_no_identifiers() {
        let enricher = Enricher::new(Arc::new(FixedLookup), Duration::from_millis(50), 4);
        let enrichment = enricher.enrich(Vec::new()).await;
        assert_eq!(enrichment, Enrichment::default());
    }

    #[tokio::test]
    async fn test_disabled_lookup_reports_nothing() {
        let enricher = Enricher::new(Arc::new(NoLookup), Duration::from_secs(1), 1);
        let enrichment = enricher.enrich(ids(&["known.example"])).await;
        assert_eq!(enrichment.total_reports, 0);
        assert!(!enrichment.results[0].found);
    }

    #[tokio::test]
    async fn test_report_total_saturates() {
        let enricher = Enricher::new(Arc::new(FixedLookup), Duration::from_secs(1), 2);
        let enrichment = enricher
            .enrich(ids(&["huge.example", "one.example"]))
            .await;
        assert_eq!(enrichment.total_reports, u64::MAX);
        assert_eq!(enrichment.results.len(), 2);
    }

    #[tokio::test]
    async fn test_enrichment_runs_in_spawned_task() {
        let enricher = Enricher::new(Arc::new(FixedLookup), Duration::from_secs(1), 2);
        let identifiers = ids(&["known.example", "x.example"]);
        let enrichment = tokio::spawn(async move { enricher.enrich(identifiers).await })
            .await
            .unwrap();
        assert_eq!(enrichment.total_reports, 5);
    }

    #[tokio::test]
    async fn test_unreachable_site_yields_not_found() {
        let config = LookupConfig {
            base_url: "http://127.0.0.1:9/domain/".to_string(),
            timeout_secs: 2,
            ..LookupConfig::default()
        };
        let lookup = ChainAbuseLookup::new(&config).unwrap();
        let result = lookup.lookup("evil.example").await;
        assert_eq!(result, LookupResult::not_found("evil.example"));
    }
}
