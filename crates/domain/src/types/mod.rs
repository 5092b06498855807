//! Domain types and models

pub mod batch;

pub use batch::{BatchRequest, BatchResponse, FailurePolicy, OperationOutcome, OperationRecord};
