/*!
Model of the `eth-phishing-detect` `config.json` document
*/

use serde::{Deserialize, Serialize};

use crate::{error::FeedError, snapshot::FlaggedSet};

/// The published phishing configuration.
///
/// Only `blacklist` and `fuzzylist` are required; the remaining fields are
/// carried for logging and default when absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PhishingConfig {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub tolerance: u64,
    pub blacklist: Option<Vec<String>>,
    pub fuzzylist: Option<Vec<String>>,
    #[serde(default)]
    pub whitelist: Vec<String>,
}

impl PhishingConfig {
    /// Parse a response body
    pub fn from_slice(body: &[u8]) -> Result<Self, FeedError> {
        let config: Self = serde_json::from_slice(body)?;
        config.validate()
    }

    /// Parse a response body that has already been decoded to text
    pub fn parse(body: &str) -> Result<Self, FeedError> {
        Self::from_slice(body.as_bytes())
    }

    fn validate(self) -> Result<Self, FeedError> {
        if self.blacklist.is_none() {
            return Err(FeedError::MissingField("blacklist"));
        }
        if self.fuzzylist.is_none() {
            return Err(FeedError::MissingField("fuzzylist"));
        }
        Ok(self)
    }

    pub fn blacklist(&self) -> &[String] {
        self.blacklist.as_deref().unwrap_or_default()
    }

    pub fn fuzzylist(&self) -> &[String] {
        self.fuzzylist.as_deref().unwrap_or_default()
    }

    /// Union of the exact and fuzzy lists.
    ///
    /// An identifier present in both lists appears once.
    pub fn flagged_set(&self) -> FlaggedSet {
        self.blacklist()
            .iter()
            .chain(self.fuzzylist())
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    }
}
