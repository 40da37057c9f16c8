use thiserror::Error;

/// Local SDK errors.
///
/// Provider-reported failures never show up here; they travel inside the
/// result envelopes as `ErrorInfo`.
#[derive(Debug, Error)]
pub enum AuthSdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configured URL could not be parsed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP client could not be built (only with `gotrue` feature)
    #[cfg(feature = "gotrue")]
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Called outside of a tokio runtime
    #[error("Runtime error: {0}")]
    Runtime(String),
}
