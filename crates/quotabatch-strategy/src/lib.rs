//! Pluggable job strategies.
//!
//! A [`JobStrategy`] is the capability set a job kind provides the batch
//! processor: where to find claimable rows, how to turn one into an HTTP
//! call, and how to record what happened. Two reference strategies are
//! included, both grounded in `examples/original_source`'s Freshservice
//! ticket automation: [`CreateEntityStrategy`] (ticket import, one-phase)
//! and [`UpdateEntityStrategy`] (category remediation, two-phase with an
//! offline `prepare()` classification pass).

pub mod create_entity;
pub mod error;
pub mod request;
pub mod strategy;
pub mod update_entity;

pub use create_entity::CreateEntityStrategy;
pub use error::{Result, StrategyError};
pub use request::ApiRequest;
pub use strategy::{JobStrategy, PrepareSummary};
pub use update_entity::UpdateEntityStrategy;
