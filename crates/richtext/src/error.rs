// ABOUTME: Error types for HTML to document-tree conversion.
// ABOUTME: Provides ConvertError with TooDeep and InvalidBaseUrl variants.

use thiserror::Error;

/// Errors that can occur while converting post markup.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The markup nests elements deeper than the walker is willing to recurse.
    #[error("markup nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    /// The base URL used to resolve relative image sources could not be parsed.
    #[error("invalid base url {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ConvertError {
    pub fn too_deep(limit: usize) -> Self {
        ConvertError::TooDeep { limit }
    }
}
