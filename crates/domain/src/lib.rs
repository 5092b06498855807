//! # Batchwire Domain
//!
//! Wire types and configuration structures for the batching client.
//!
//! This crate contains:
//! - Batch request/response envelopes exchanged with the core service
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Protocol constants
//!
//! ## Architecture
//! - No dependencies on other Batchwire crates
//! - Only external dependencies allowed
//! - Pure data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
