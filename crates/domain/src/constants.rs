//! Protocol constants
//!
//! Values shared by the batching engine and the HTTP adapter.

// Batch endpoint
pub const BATCH_ENDPOINT: &str = "api/v1/batch/";
pub const USER_AGENT: &str = "batchwire user agent";

// Placeholder tokens: `$$BatchPlaceholder_<batcher>_<index>$$`
pub const PLACEHOLDER_PREFIX: &str = "$$BatchPlaceholder_";
pub const PLACEHOLDER_SUFFIX: &str = "$$";
pub const PLACEHOLDER_INDEX_WIDTH: usize = 3;
pub const ALIAS_PREFIX: &str = "BatchAlias";

/// Status codes at or above this value mark a sub-operation as failed.
pub const FAILURE_STATUS_THRESHOLD: u16 = 400;

// HTTP defaults
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_BASE_BACKOFF_MS: u64 = 200;
