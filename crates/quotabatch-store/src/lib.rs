//! Durable job queue backed by a single SQLite file.
//!
//! Every row is one [`JobItem`]; [`Store::claim_next`] is the sole atomic
//! primitive that transitions a row from ready to in-progress, enforced by
//! SQLite's own write-ahead lock rather than any lock this crate holds
//! itself. A [`Store`] wraps exactly one connection and is owned by exactly
//! one worker for that worker's lifetime — see the workspace's locking
//! discipline for why connections are never shared across threads.

pub mod error;
pub mod item;
pub mod store;

pub use error::{Result, StoreError};
pub use item::JobItem;
pub use store::{ClaimOrder, Store};
