//! Shared infrastructure for the quotabatch workspace.
//!
//! This crate provides the one piece of plumbing every other crate in the
//! workspace needs: a small observability event system used to report
//! admission decisions, store transitions, and per-item outcomes without
//! coupling producers to a specific logging or metrics backend.

pub mod events;

pub use events::{BatchEvent, BoxedEventListener, EventListener, EventListeners, FnListener};
