//! Deferred handles
//!
//! A [`DeferredHandle`] stands in for the result of a queued operation. It is
//! pending until the batch commits, then resolved exactly once with the
//! status code and payload the server reported for its alias.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use batchwire_domain::constants::FAILURE_STATUS_THRESHOLD;
use batchwire_domain::FailurePolicy;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use super::errors::BatchError;

/// Raw payload handed back when it does not parse as the requested shape
#[derive(Debug)]
pub struct RawText {
    pub text: String,
    pub error: serde_json::Error,
}

/// Parse a successful raw payload into `T`, returning the text untouched on
/// failure.
pub fn resolve<T: DeserializeOwned>(raw: String) -> Result<T, RawText> {
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(error) => Err(RawText { text: raw, error }),
    }
}

pub(crate) type Parser<T> = fn(String) -> Result<T, RawText>;

/// Resolved value of a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleValue<T> {
    /// Successful payload parsed into the requested shape
    Parsed(T),
    /// Unparsed text: untyped handles, failed operations, or payloads that
    /// did not match the requested shape
    Raw(String),
}

impl<T> HandleValue<T> {
    pub fn parsed(&self) -> Option<&T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Parsed(_) => None,
            Self::Raw(text) => Some(text),
        }
    }

    pub fn into_parsed(self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

impl<T: Serialize> HandleValue<T> {
    /// Text form: raw text as is, parsed values re-encoded as JSON.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Parsed(value) => serde_json::to_string(value),
            Self::Raw(text) => Ok(text.clone()),
        }
    }
}

enum HandleState<T> {
    Pending,
    Resolved { code: u16, value: HandleValue<T> },
}

struct HandleInner<T> {
    batcher_id: u64,
    alias: String,
    placeholder: String,
    policy: FailurePolicy,
    parser: Option<Parser<T>>,
    state: Mutex<HandleState<T>>,
}

/// Type-erased view of a handle used by the batcher during commit
pub(crate) trait ResolveSlot: Send + Sync {
    /// Store the outcome; false if the handle was already resolved.
    fn resolve(&self, code: u16, raw: String) -> bool;

    fn is_pending(&self) -> bool;

    fn policy(&self) -> FailurePolicy;

    /// `(code, error text)` when resolved with a failing status
    fn failure(&self) -> Option<(u16, String)>;
}

impl<T: Send + 'static> ResolveSlot for HandleInner<T> {
    fn resolve(&self, code: u16, raw: String) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, HandleState::Pending) {
            return false;
        }

        let value = match self.parser {
            Some(parse) if code < FAILURE_STATUS_THRESHOLD => match parse(raw) {
                Ok(parsed) => HandleValue::Parsed(parsed),
                Err(RawText { text, error: err }) => {
                    error!(
                        alias = %self.alias,
                        descriptor = type_name::<T>(),
                        error = %err,
                        "failed to parse batch result, keeping raw text"
                    );
                    HandleValue::Raw(text)
                }
            },
            _ => HandleValue::Raw(raw),
        };

        *state = HandleState::Resolved { code, value };
        true
    }

    fn is_pending(&self) -> bool {
        matches!(*self.state.lock(), HandleState::Pending)
    }

    fn policy(&self) -> FailurePolicy {
        self.policy
    }

    fn failure(&self) -> Option<(u16, String)> {
        match &*self.state.lock() {
            HandleState::Resolved { code, value: HandleValue::Raw(text) }
                if *code >= FAILURE_STATUS_THRESHOLD =>
            {
                Some((*code, text.clone()))
            }
            _ => None,
        }
    }
}

/// Lazy result of a queued operation
///
/// Untyped handles (`DeferredHandle<String>`, from
/// [`Batcher::add`](super::Batcher::add)) always resolve to
/// [`HandleValue::Raw`]. Typed handles try to parse successful payloads.
pub struct DeferredHandle<T = String> {
    inner: Arc<HandleInner<T>>,
}

impl<T> Clone for DeferredHandle<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> fmt::Debug for DeferredHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = matches!(*self.inner.state.lock(), HandleState::Pending);
        f.debug_struct("DeferredHandle")
            .field("alias", &self.inner.alias)
            .field("placeholder", &self.inner.placeholder)
            .field("policy", &self.inner.policy)
            .field("pending", &pending)
            .finish()
    }
}

impl<T: Send + 'static> DeferredHandle<T> {
    pub(crate) fn pending(
        batcher_id: u64,
        alias: String,
        placeholder: String,
        policy: FailurePolicy,
        parser: Option<Parser<T>>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                batcher_id,
                alias,
                placeholder,
                policy,
                parser,
                state: Mutex::new(HandleState::Pending),
            }),
        }
    }

    pub(crate) fn slot(&self) -> Arc<dyn ResolveSlot> {
        Arc::clone(&self.inner) as Arc<dyn ResolveSlot>
    }
}

impl<T> DeferredHandle<T> {
    pub fn alias(&self) -> &str {
        &self.inner.alias
    }

    /// Text to embed in dependent payloads before the batch commits
    pub fn placeholder(&self) -> &str {
        &self.inner.placeholder
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.inner.policy
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.inner.state.lock(), HandleState::Pending)
    }

    pub(crate) fn batcher_id(&self) -> u64 {
        self.inner.batcher_id
    }

    /// Whether the operation succeeded (status code < 400)
    pub fn ok(&self) -> Result<bool, BatchError> {
        self.code().map(|code| code < FAILURE_STATUS_THRESHOLD)
    }

    /// Raw status code reported by the server
    pub fn code(&self) -> Result<u16, BatchError> {
        match &*self.inner.state.lock() {
            HandleState::Pending => Err(self.not_resolved()),
            HandleState::Resolved { code, .. } => Ok(*code),
        }
    }

    fn not_resolved(&self) -> BatchError {
        BatchError::NotResolved { alias: self.inner.alias.clone() }
    }

    fn check_policy(&self, code: u16, value: &HandleValue<T>) -> Result<(), BatchError> {
        if self.inner.policy != FailurePolicy::RaiseOnAccess || code < FAILURE_STATUS_THRESHOLD {
            return Ok(());
        }
        let message = match value {
            HandleValue::Raw(text) => text.clone(),
            HandleValue::Parsed(_) => String::new(),
        };
        Err(BatchError::OperationFailed { alias: self.inner.alias.clone(), code, message })
    }
}

impl<T: Clone> DeferredHandle<T> {
    /// Resolved value, subject to the handle's failure policy
    ///
    /// Under [`FailurePolicy::RaiseOnAccess`] a failed operation returns
    /// [`BatchError::OperationFailed`] carrying the server's error text;
    /// otherwise the error text comes back as [`HandleValue::Raw`].
    pub fn get(&self) -> Result<HandleValue<T>, BatchError> {
        match &*self.inner.state.lock() {
            HandleState::Pending => Err(self.not_resolved()),
            HandleState::Resolved { code, value } => {
                self.check_policy(*code, value)?;
                Ok(value.clone())
            }
        }
    }
}

impl<T: Serialize> DeferredHandle<T> {
    /// String conversion: the placeholder while pending, the resolved value
    /// afterwards (subject to the failure policy).
    pub fn to_text(&self) -> Result<String, BatchError> {
        match &*self.inner.state.lock() {
            HandleState::Pending => Ok(self.inner.placeholder.clone()),
            HandleState::Resolved { code, value } => {
                self.check_policy(*code, value)?;
                value.to_text().map_err(|err| BatchError::Serialization {
                    kind: self.inner.alias.clone(),
                    message: err.to_string(),
                })
            }
        }
    }
}
