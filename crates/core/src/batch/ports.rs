//! Port interfaces for batch submission

use async_trait::async_trait;
use batchwire_domain::{BatchRequest, BatchResponse, Result};

/// Transport for a committed batch
///
/// Implementations send every record in one request and return one outcome
/// per record, in any order. Substituting resolved upstream values into
/// downstream payloads happens on the server, driven by each record's
/// `dependencies` and `placeholders`.
#[async_trait]
pub trait BatchSubmitter: Send + Sync {
    /// Submit the whole queue in a single round trip
    async fn submit(&self, request: &BatchRequest) -> Result<BatchResponse>;
}
