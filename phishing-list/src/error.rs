/*!
Errors produced while reading the published list document
*/

/// Error type for list document parsing
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Invalid list document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("List document is missing the `{0}` field")]
    MissingField(&'static str),
}
