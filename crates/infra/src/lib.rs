//! # Batchwire Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The core service batch endpoint client
//! - An HTTP client that retries refused connections and sends each delivered request once
//! - Configuration loading from the environment and files
//! - Logging bootstrap
//!
//! ## Architecture
//! - Implements traits defined in `batchwire-core`
//! - Contains all "impure" code (network, filesystem, process environment)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{batcher_from_config, CoreBatchClient};
pub use errors::InfraError;
pub use http::HttpClient;
pub use observability::init_logging;
