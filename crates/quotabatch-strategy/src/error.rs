/// Errors raised while a [`crate::JobStrategy`] builds a request or
/// interprets a response.
///
/// A `StrategyError` always terminal-fails the row with no HTTP call made
/// (for `InvalidRow`) or without retrying the store write (for `Store`);
/// per spec it is captured by the processor's worker loop and never
/// propagates past one item.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// The row is missing a field the strategy requires, or holds a value
    /// the strategy cannot interpret (e.g. a category with no matching
    /// mapping during an `UpdateEntity` run phase).
    #[error("invalid row {id}: {message}")]
    InvalidRow { id: i64, message: String },

    /// The underlying store failed while reading or writing strategy state.
    #[error("store error: {0}")]
    Store(#[from] quotabatch_store::StoreError),
}

/// Result type for strategy operations.
pub type Result<T> = std::result::Result<T, StrategyError>;
