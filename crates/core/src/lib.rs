//! # Batchwire Core
//!
//! Deferred-operation batching engine - no infrastructure dependencies.
//!
//! This crate contains:
//! - The [`Batcher`] that queues operations and commits them in one round
//!   trip
//! - [`DeferredHandle`]s returned in place of immediate results
//! - Placeholder-based dependency inference between queued operations
//! - The [`BatchSubmitter`] port implemented by the HTTP adapter
//!
//! ## Architecture Principles
//! - Only depends on `batchwire-common` and `batchwire-domain`
//! - No network, filesystem or platform code
//! - The batch endpoint is reached through a trait

pub mod batch;

// Re-export specific items to avoid ambiguity
pub use batch::current;
pub use batch::{
    resolve, BatchError, BatchSubmitter, Batcher, CommitSummary, DeferredHandle, HandleValue,
    Operation, RawText,
};
