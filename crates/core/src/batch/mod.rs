//! Deferred-operation batching
//!
//! Callers queue logical API calls on a [`Batcher`] and receive
//! [`DeferredHandle`]s. A handle's placeholder text can be embedded in the
//! body or variables of later operations; the batcher detects those
//! placeholders, records the dependency edges and ships the whole graph to
//! the batch endpoint in a single request on commit.

pub mod batcher;
pub mod current;
pub mod errors;
pub mod handle;
pub mod operation;
pub mod placeholder;
pub mod ports;
pub mod scanner;

pub use batcher::{Batcher, CommitSummary};
pub use errors::BatchError;
pub use handle::{resolve, DeferredHandle, HandleValue, RawText};
pub use operation::Operation;
pub use ports::BatchSubmitter;
