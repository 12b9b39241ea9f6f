/*!
 * Error types for the reflective-translate library.
 *
 * Each boundary the translation pipeline talks to (tokenizer, text splitter,
 * completion provider) has its own error enum. The orchestrator wraps all of
 * them into a single `TranslationError` before handing it to the caller.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider answered but the answer carried no text
    #[error("Provider returned an empty response: {0}")]
    EmptyResponse(String),

    /// A JSON-mode completion did not contain valid JSON
    #[error("JSON mode response could not be parsed: {0}")]
    JsonMode(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and its body to the matching error variant
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }

    /// Whether sending the same request again may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RequestFailed(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors raised by the token counting boundary
#[derive(Error, Debug)]
pub enum TokenizerError {
    /// The requested encoding is not one we know how to load
    #[error("Unsupported token encoding: {0}")]
    UnsupportedEncoding(String),

    /// The encoding is known but its tables could not be loaded
    #[error("Failed to initialize token encoding {encoding}: {message}")]
    Initialization {
        /// Encoding name
        encoding: String,
        /// Underlying failure
        message: String,
    },
}

/// Errors raised by the text splitting boundary
#[derive(Error, Debug)]
pub enum SplitterError {
    /// Target chunk size must be strictly positive
    #[error("Invalid chunk size: {0} (must be greater than zero)")]
    InvalidChunkSize(usize),

    /// Overlap must be smaller than the chunk size
    #[error("Invalid chunk overlap: {overlap} (must be smaller than chunk size {chunk_size})")]
    InvalidOverlap {
        /// Requested overlap
        overlap: usize,
        /// Requested chunk size
        chunk_size: usize,
    },

    /// Overlapping chunks cannot be concatenated back into the source text
    #[error("Chunk overlap of {0} is not supported by a lossless splitter")]
    OverlapUnsupported(usize),

    /// Measuring a piece of text failed
    #[error("Failed to measure chunk size: {0}")]
    Sizer(#[from] TokenizerError),
}

/// Root cause of a failed translation
#[derive(Error, Debug)]
pub enum TranslationFailure {
    /// Token counting failed
    #[error("tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    /// Splitting the source text failed
    #[error("splitter error: {0}")]
    Splitter(#[from] SplitterError),

    /// A completion call failed
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Any failure inside the pipeline, wrapped at the orchestrator
    #[error("Translation failed: {0}")]
    Failed(#[source] TranslationFailure),

    /// The request itself was rejected before any work started
    #[error("Invalid translation request: {0}")]
    InvalidRequest(String),
}

impl TranslationError {
    /// The underlying pipeline failure, if any
    pub fn failure(&self) -> Option<&TranslationFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            Self::InvalidRequest(_) => None,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error in the configuration file or its values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::Config(error.to_string())
    }
}
