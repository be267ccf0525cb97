//! Discovery error types.

use thiserror::Error;

use crate::index::IndexError;

/// Errors returned to discovery callers for malformed input.
///
/// Search failures are not errors here; they surface as
/// [`crate::index::SearchStatus::Failed`].
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Invalid URI '{uri}': {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Not a file URI: {0}")]
    NotFileUri(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed test node: {0}")]
    MalformedNode(#[from] serde_json::Error),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}
