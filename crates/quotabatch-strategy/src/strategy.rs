use crate::error::Result;
use crate::request::ApiRequest;
use quotabatch_store::{ClaimOrder, JobItem, Store};
use serde_json::Value;

/// Outcome of a [`JobStrategy::prepare`] pass: how many pending rows were
/// classified into each bucket.
///
/// `CreateEntity` has no offline classification phase (rows are ready the
/// moment they're inserted), so its `prepare` returns all zeros; only
/// `UpdateEntity`'s two-phase design populates this meaningfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareSummary {
    pub total: u64,
    pub ready: u64,
    pub skipped: u64,
    pub unmapped: u64,
}

/// The capability set a job kind must provide the processor: how to find
/// claimable rows, how to turn one into an HTTP call, and how to record
/// what happened.
///
/// This replaces the Python original's class-inheritance design (`BaseBatchProcessor`
/// subclassed by `BatchTicketImporter`/`BatchTicketCategoryUpdater`) with a
/// single trait object the processor holds and dispatches through by
/// method call, never by downcasting or matching on a kind tag.
pub trait JobStrategy: Send + Sync {
    /// The job table this strategy claims rows from.
    fn table_name(&self) -> &str;

    /// The SQL predicate (no placeholders; a trusted constant expression
    /// owned by the strategy, not untrusted input) identifying claimable
    /// rows in `table_name()`.
    fn ready_predicate(&self) -> &str;

    /// Claim ordering; both reference strategies default to descending id.
    fn claim_order(&self) -> ClaimOrder {
        ClaimOrder::Descending
    }

    /// DDL for this strategy's job table and any auxiliary lookup tables,
    /// executed idempotently by `create-tables`.
    fn create_tables_ddl(&self) -> &str;

    /// Offline classification pass. Strategies without one (e.g.
    /// `CreateEntity`) accept the default no-op.
    fn prepare(&self, _store: &Store) -> Result<PrepareSummary> {
        Ok(PrepareSummary::default())
    }

    /// Builds the request for a claimed row.
    fn build_request(&self, item: &JobItem) -> Result<ApiRequest>;

    /// Records success-side columns (e.g. a newly assigned foreign id)
    /// after a successful call, transitioning the row to a terminal state.
    fn interpret_success(&self, store: &Store, item: &JobItem, status: u16, response: &Value) -> Result<()>;

    /// Records a terminal failure: status (if one was received) and an
    /// error message, always leaving the row in `failed`.
    fn interpret_failure(&self, store: &Store, item: &JobItem, status: Option<u16>, message: &str) -> Result<()>;

    /// Resets rows this strategy considers retryable and returns how many
    /// were touched. Per the resolved ambiguity in SPEC_FULL §4.6, the two
    /// reference strategies disagree on both the filter and the reset
    /// target, so this is entirely strategy-owned rather than a single
    /// `state = 'failed'` primitive in the store.
    fn retry_failed(&self, store: &Store) -> Result<u64>;
}
