//! Ambient batcher scope
//!
//! [`Batcher::scope`] installs a batcher as the current one for the task
//! running a future. Wrapper functions consult it through
//! [`try_enqueue`]: inside a scope the call is queued and a handle comes
//! back, outside one the caller performs the request directly.
//!
//! Nested scopes shadow the outer batcher and restore it on exit. The
//! closures passed to [`with_current`] must not call back into this module.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::batcher::{commit_shared, Batcher, CommitSummary};
use super::errors::BatchError;
use super::handle::DeferredHandle;
use super::operation::Operation;

tokio::task_local! {
    static CURRENT: Arc<Mutex<Batcher>>;
}

impl Batcher {
    /// Run `future` with this batcher installed as the current one.
    ///
    /// When the future returns `Ok` the batcher is committed and a commit
    /// error replaces the value. When it returns `Err` (or panics) the queue
    /// is discarded without any network call and every handle stays
    /// pending.
    pub async fn scope<F, T, E>(self, future: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<BatchError>,
    {
        let shared = Arc::new(Mutex::new(self));
        let value = match CURRENT.scope(Arc::clone(&shared), future).await {
            Ok(value) => value,
            Err(err) => {
                let (id, discarded) = {
                    let batcher = shared.lock();
                    (batcher.id(), batcher.len())
                };
                debug!(batcher = id, discarded, "batch scope failed, discarding queued operations");
                return Err(err);
            }
        };

        commit_shared(&shared).await?;
        Ok(value)
    }
}

/// Whether a batcher scope is live on this task
pub fn is_active() -> bool {
    CURRENT.try_with(|_| ()).is_ok()
}

/// Run `f` against the current batcher, `None` outside a scope.
pub fn with_current<R>(f: impl FnOnce(&mut Batcher) -> R) -> Option<R> {
    CURRENT.try_with(|shared| f(&mut shared.lock())).ok()
}

/// Queue `op` on the current batcher.
///
/// Returns `Ok(None)` outside a scope so the caller can send `op` itself.
pub fn try_enqueue(op: &Operation) -> Result<Option<DeferredHandle>, BatchError> {
    with_current(|batcher| batcher.add(op.clone())).transpose()
}

/// Typed variant of [`try_enqueue`]
pub fn try_enqueue_typed<T>(op: &Operation) -> Result<Option<DeferredHandle<T>>, BatchError>
where
    T: DeserializeOwned + Send + 'static,
{
    with_current(|batcher| batcher.add_typed::<T>(op.clone())).transpose()
}

/// Commit the current batcher before the scope ends.
///
/// Leaving the scope normally afterwards reports
/// [`BatchError::AlreadyCommitted`].
pub async fn commit() -> Option<Result<CommitSummary, BatchError>> {
    let shared = CURRENT.try_with(Arc::clone).ok()?;
    Some(commit_shared(&shared).await)
}
