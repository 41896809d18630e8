/// Errors that can stop a single worker outright, as opposed to a
/// per-item outcome (which is always recorded, never propagated).
///
/// A worker that returns one of these logs it and exits; per spec, the
/// Processor does not abort the remaining workers.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("store error: {0}")]
    Store(#[from] quotabatch_store::StoreError),

    #[error("strategy error: {0}")]
    Strategy(#[from] quotabatch_strategy::StrategyError),
}

/// Result type for processor operations.
pub type Result<T> = std::result::Result<T, ProcessorError>;
