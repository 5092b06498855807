//! Core service API adapters

pub mod batch_client;

pub use batch_client::{batch_endpoint, batcher_from_config, CoreBatchClient};
