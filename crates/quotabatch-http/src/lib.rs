//! Blocking HTTP client for the quota-limited ticketing API.
//!
//! Every request is admitted through a shared [`quotabatch_quota::Coordinator`]
//! before it is sent, and every response (success, 429, or transport failure)
//! is fed back to the coordinator so it can adjust pacing for the next call.

pub mod client;
pub mod config;
pub mod error;
pub mod response;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::ClientError;
pub use response::ApiResponse;
