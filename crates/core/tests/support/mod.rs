//! Shared test helpers for `batchwire-core` integration tests.
//!
//! These helpers provide an in-memory batch endpoint so that batching tests
//! can focus on behaviour instead of boilerplate.

pub mod submitter;
