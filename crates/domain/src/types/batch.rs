//! Batch wire model
//!
//! Field names follow the core service's batch controller: an operation's
//! kind travels as `type`, its serialized body as `data` and its named
//! variables as `vars`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::FAILURE_STATUS_THRESHOLD;
use crate::errors::BatchwireError;

/// One queued remote call awaiting batch submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Logical operation name, mapped to a server-side handler
    #[serde(rename = "type")]
    pub kind: String,
    /// Serialized request payload
    #[serde(rename = "data")]
    pub body: Option<String>,
    /// Named scalar parameters, already stringified
    #[serde(rename = "vars", default)]
    pub variables: BTreeMap<String, String>,
    pub alias: String,
    /// Aliases that must resolve before this operation runs. Never contains
    /// `alias` itself.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    /// Advisory barrier counter
    #[serde(default)]
    pub stage: u32,
    /// Exact placeholder occurrences → alias of the operation they stand for
    #[serde(default)]
    pub placeholders: BTreeMap<String, String>,
}

impl OperationRecord {
    /// Every string the server will see for this record: the body first,
    /// then variable values.
    pub fn payload_texts(&self) -> impl Iterator<Item = &str> {
        self.body.as_deref().into_iter().chain(self.variables.values().map(String::as_str))
    }
}

/// Request envelope posted to the batch endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub data: Vec<OperationRecord>,
}

/// Result of one sub-operation, matched back to its handle by alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub alias: String,
    pub data: String,
    pub code: u16,
}

impl OperationOutcome {
    pub fn is_ok(&self) -> bool {
        self.code < FAILURE_STATUS_THRESHOLD
    }
}

/// Response envelope returned by the batch endpoint, in arbitrary order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub data: Vec<OperationOutcome>,
}

/// When a failed sub-operation surfaces as an error to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// `commit()` fails with the first failing operation's error text
    #[default]
    RaiseOnCommit,
    /// Reading a failed handle returns its error text as an error
    RaiseOnAccess,
    /// Failures are only visible through `ok()`
    NeverRaise,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RaiseOnCommit => "raise_on_commit",
            Self::RaiseOnAccess => "raise_on_access",
            Self::NeverRaise => "never_raise",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = BatchwireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "raise_on_commit" => Ok(Self::RaiseOnCommit),
            "raise_on_access" => Ok(Self::RaiseOnAccess),
            "never_raise" => Ok(Self::NeverRaise),
            other => Err(BatchwireError::InvalidInput(format!("unknown failure policy: {other}"))),
        }
    }
}
