/// Error types for the explorer core
use thiserror::Error;

/// Main error type for core operations
#[derive(Error, Debug)]
pub enum EdxError {
    /// HTTP request failed
    #[cfg(feature = "api")]
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Bad response status {status}: {body}")]
    BadStatus { status: u16, body: String },

    /// Failed to parse HTTP response
    #[error("Failed to parse HTTP response: {0}")]
    ResponseParse(String),

    /// Corpus file exists but could not be read
    #[error("Failed to read corpus for {state}: {source}")]
    CorpusRead {
        state: String,
        #[source]
        source: std::io::Error,
    },

    /// No corpus is available for the state
    #[error("No data file for {0}.")]
    CorpusNotFound(String),
}

/// Type alias for Results using EdxError
pub type Result<T> = std::result::Result<T, EdxError>;
