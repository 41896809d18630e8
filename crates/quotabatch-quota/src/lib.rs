//! Adaptive rate-limit coordinator.
//!
//! Paces a pool of workers against a server-advertised request budget:
//! smooth pacing while quota is plentiful, a single designated prober near
//! exhaustion, and a global pause when the server asks for one explicitly
//! via `Retry-After`. See [`Coordinator`] for the two operations callers need.

pub mod config;
pub mod coordinator;
pub mod events;
pub mod headers;
pub mod snapshot;

pub use config::{CoordinatorConfig, CoordinatorConfigBuilder};
pub use coordinator::Coordinator;
pub use events::QuotaEvent;
pub use headers::ResponseHeaders;
pub use snapshot::QuotaSnapshot;
