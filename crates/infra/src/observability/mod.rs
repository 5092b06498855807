//! Observability infrastructure
//!
//! Structured logging bootstrap for processes embedding the client. Library
//! code only emits `tracing` events; installing a subscriber is left to the
//! application through [`init_logging`].

pub mod logging;

pub use logging::{build_filter, init_logging};
