/// Errors the CLI binary can return from `main`.
///
/// Displayed with `{:#}`-style chaining so an operator sees the proximate
/// cause, not just "something failed" (matching the teacher workspace's
/// convention of no `anyhow`/`eyre` anywhere — see SPEC_FULL §4.9).
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("missing required environment variable or flag: {0}")]
    MissingSetting(&'static str),

    #[error(transparent)]
    Processor(#[from] quotabatch_processor::ProcessorError),
}
