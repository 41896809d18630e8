/// Errors that can occur while reading or writing the job store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Any failure surfaced by the underlying SQLite connection, including
    /// a lock-contention failure to begin the immediate-mode transaction
    /// used by `claim_next`.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
