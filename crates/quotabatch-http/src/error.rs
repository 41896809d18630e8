/// Errors that can occur while issuing a request through [`crate::Client`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never got a response: DNS failure, connection reset,
    /// TLS error, or similar.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server returned a 4xx or 5xx status other than 429.
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    /// The server kept returning 429 past the configured retry budget.
    #[error("rate limit exhausted after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
