//! Batch-specific error types

use std::time::Duration;

use batchwire_common::error::{ErrorClassification, ErrorSeverity};
use batchwire_domain::BatchwireError;
use thiserror::Error;

/// Errors raised by the batcher and its handles
///
/// Usage errors (`AlreadyCommitted`, `UnknownOperation`, `SelfDependency`,
/// `NotResolved`) are detected locally and never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("batch already committed")]
    AlreadyCommitted,

    #[error("operation '{alias}' is not queued in this batcher")]
    UnknownOperation { alias: String },

    #[error("operation '{alias}' cannot depend on itself")]
    SelfDependency { alias: String },

    #[error("result of '{alias}' is not set")]
    NotResolved { alias: String },

    #[error("batch validation failed for '{alias}': {message}")]
    Validation { alias: String, message: String },

    /// A sub-operation came back with a status code >= 400; displays as the
    /// server's raw error text
    #[error("{message}")]
    OperationFailed { alias: String, code: u16, message: String },

    #[error("failed to serialize body for '{kind}': {message}")]
    Serialization { kind: String, message: String },

    /// The batch request itself failed; nothing in the batch was resolved
    #[error(transparent)]
    Submit(#[from] BatchwireError),
}

impl BatchError {
    /// True for local API misuse rather than remote or data failures
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyCommitted
                | Self::UnknownOperation { .. }
                | Self::SelfDependency { .. }
                | Self::NotResolved { .. }
        )
    }
}

impl ErrorClassification for BatchError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Submit(BatchwireError::Network(_)))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            _ if self.is_usage_error() => ErrorSeverity::Critical,
            Self::Submit(BatchwireError::Network(_)) => ErrorSeverity::Warning,
            Self::Submit(BatchwireError::Internal(_)) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}
