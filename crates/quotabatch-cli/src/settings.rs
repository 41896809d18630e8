use std::path::PathBuf;

/// Resolved configuration the core consumes, with no I/O of its own.
///
/// Building one from environment variables, a `.env` file, and CLI flags is
/// entirely this crate's job (per SPEC_FULL §4.7); every other crate in the
/// workspace only ever sees an already-built [`Settings`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub domain: String,
    pub db_path: PathBuf,
    pub headroom: u32,
    pub max_retries: u32,
    pub retry_after_default_secs: u64,
    pub strategy: StrategyKind,
}

/// Which reference [`quotabatch_strategy::JobStrategy`] to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StrategyKind {
    /// `CreateEntityStrategy::tickets()` — one-phase ticket import.
    CreateTicket,
    /// `UpdateEntityStrategy::ticket_categories()` — two-phase category remediation.
    UpdateTicketCategory,
}

impl Settings {
    /// Base URL for the ticketing API, per spec.md §6's wire contract.
    pub fn base_url(&self) -> String {
        format!("https://{}/api/v2", self.domain)
    }
}
