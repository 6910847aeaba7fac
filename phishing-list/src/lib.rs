/*!
Parsers and tools for working with the `eth-phishing-detect` configuration document.

The crate has no I/O of its own: callers hand it response bodies and get back
normalized values.

- [`feed`] deserializes the published `config.json`
- [`snapshot`] keeps the last observed set of flagged identifiers and diffs new fetches against it
- [`reports`] turns an abuse-report page into a [`reports::LookupResult`]
*/

pub mod error;
pub mod feed;
pub mod reports;
pub mod snapshot;

pub use error::FeedError;
pub use feed::PhishingConfig;
pub use reports::{LookupResult, ReportExtractor};
pub use snapshot::{FlaggedSet, NewItems, Snapshot};
