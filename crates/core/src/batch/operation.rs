//! Enqueue requests

use std::collections::BTreeMap;
use std::fmt::Display;

use batchwire_domain::FailurePolicy;
use serde::Serialize;

use super::errors::BatchError;
use super::handle::DeferredHandle;

/// Description of one call to queue on a [`Batcher`](super::Batcher)
///
/// ```
/// use batchwire_core::Operation;
///
/// let op = Operation::new("postCollectionByDocs")
///     .with_var("name", "orders")
///     .with_var("limit", 10);
/// assert_eq!(op.variables()["limit"], "10");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    kind: String,
    body: Option<String>,
    variables: BTreeMap<String, String>,
    failure_policy: Option<FailurePolicy>,
}

impl Operation {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), body: None, variables: BTreeMap::new(), failure_policy: None }
    }

    /// Serialize a structured body to JSON.
    pub fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, BatchError> {
        let json = serde_json::to_string(body).map_err(|err| BatchError::Serialization {
            kind: self.kind.clone(),
            message: err.to_string(),
        })?;
        self.body = Some(json);
        Ok(self)
    }

    /// Use an already-encoded body as is.
    pub fn with_raw_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a variable, stringified with `Display`.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.variables.insert(name.into(), value.to_string());
        self
    }

    /// Add a variable holding another queued operation's placeholder.
    pub fn with_handle_var<T>(self, name: impl Into<String>, handle: &DeferredHandle<T>) -> Self {
        let placeholder = handle.placeholder().to_string();
        self.with_var(name, placeholder)
    }

    /// Override the batcher's failure policy for this operation's handle.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn failure_policy(&self) -> Option<FailurePolicy> {
        self.failure_policy
    }

    pub(crate) fn into_parts(
        self,
    ) -> (String, Option<String>, BTreeMap<String, String>, Option<FailurePolicy>) {
        (self.kind, self.body, self.variables, self.failure_policy)
    }
}
