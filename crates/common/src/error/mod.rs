//! Error classification shared by the batching client
//!
//! This module provides the classification vocabulary that Batchwire error
//! enums implement:
//!
//! 1. **`ErrorClassification` trait**: a standard interface for classifying
//!    errors by retryability, severity and criticality
//!
//! 2. **`ErrorSeverity` enum**: a single severity scale used when logging
//!
//! 3. **`log_classified`**: logs a classified error at the level its
//!    severity asks for (`observability` feature)
//!
//! ## Severity Levels
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Unknown alias in a response |
//! | **Warning** | Degraded but operational | Refused connections, 5xx from the batch endpoint |
//! | **Error** | Failure requiring attention | Invalid config, malformed payloads |
//! | **Critical** | Invariant violated | Internal errors, API misuse |

use std::fmt;
use std::time::Duration;

/// Error classification trait for consistent error handling across crates
///
/// Implemented by every error enum that can surface from a batch commit so
/// callers can decide whether starting a fresh batch is worthwhile.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient transport issues: timeouts, refused
    /// connections, 5xx responses from the batch endpoint.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Emit a classified error through `tracing`, picking the level from its
/// severity.
///
/// `operation` names what failed (for example `"batch_commit"`).
#[cfg(feature = "observability")]
pub fn log_classified<E>(operation: &str, err: &E)
where
    E: ErrorClassification + fmt::Display + ?Sized,
{
    let retryable = err.is_retryable();
    match err.severity() {
        ErrorSeverity::Info => tracing::info!(operation, retryable, error = %err, "operation failed"),
        ErrorSeverity::Warning => {
            tracing::warn!(operation, retryable, error = %err, "operation failed")
        }
        ErrorSeverity::Error | ErrorSeverity::Critical => {
            tracing::error!(
                operation,
                retryable,
                critical = err.is_critical(),
                error = %err,
                "operation failed"
            )
        }
    }
}
