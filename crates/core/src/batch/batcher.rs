//! The batcher: queue, manual ordering controls and the commit protocol

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use batchwire_common::error::log_classified;
use batchwire_domain::{
    BatchConfig, BatchRequest, BatchResponse, FailurePolicy, OperationRecord,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::errors::BatchError;
use super::handle::{resolve, DeferredHandle, Parser, ResolveSlot};
use super::operation::Operation;
use super::placeholder::{next_batcher_id, PlaceholderAllocator};
use super::ports::BatchSubmitter;
use super::scanner::scan;

/// Per-commit tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Operations sent in the batch request
    pub submitted: usize,
    /// Handles resolved with a status code below 400
    pub succeeded: usize,
    /// Handles resolved with a status code of 400 or above
    pub failed: usize,
    /// Handles the response did not mention; they stay pending
    pub unresolved: usize,
}

/// Single-use queue of deferred operations
///
/// Operations are queued with [`add`](Self::add) or
/// [`add_typed`](Self::add_typed) and sent together by
/// [`commit`](Self::commit). A batcher commits at most once; every call
/// after that fails with [`BatchError::AlreadyCommitted`].
pub struct Batcher {
    id: u64,
    queue: Vec<OperationRecord>,
    positions: HashMap<String, usize>,
    slots: HashMap<String, Arc<dyn ResolveSlot>>,
    allocator: PlaceholderAllocator,
    stage: u32,
    config: BatchConfig,
    submitter: Arc<dyn BatchSubmitter>,
    committed: bool,
}

impl fmt::Debug for Batcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batcher")
            .field("id", &self.id)
            .field("queued", &self.queue.len())
            .field("stage", &self.stage)
            .field("config", &self.config)
            .field("committed", &self.committed)
            .finish()
    }
}

impl Batcher {
    /// Create a batcher sending through `submitter`
    pub fn new(submitter: Arc<dyn BatchSubmitter>, config: BatchConfig) -> Self {
        let id = next_batcher_id();
        debug!(batcher = id, policy = %config.failure_policy, "created batcher");
        Self {
            id,
            queue: Vec::new(),
            positions: HashMap::new(),
            slots: HashMap::new(),
            allocator: PlaceholderAllocator::new(id),
            stage: 0,
            config,
            submitter,
            committed: false,
        }
    }

    /// Create a batcher with the default [`BatchConfig`]
    pub fn with_defaults(submitter: Arc<dyn BatchSubmitter>) -> Self {
        Self::new(submitter, BatchConfig::default())
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current barrier stage
    pub fn stage(&self) -> u32 {
        self.stage
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Batcher-wide default failure policy
    pub fn failure_policy(&self) -> FailurePolicy {
        self.config.failure_policy
    }

    /// Queued records in enqueue order
    pub fn records(&self) -> &[OperationRecord] {
        &self.queue
    }

    pub fn record(&self, alias: &str) -> Option<&OperationRecord> {
        self.positions.get(alias).map(|&idx| &self.queue[idx])
    }

    /// Queue an operation whose result is kept as raw text.
    pub fn add(&mut self, op: Operation) -> Result<DeferredHandle, BatchError> {
        self.enqueue(op, None)
    }

    /// Queue an operation whose successful result is parsed as `T`.
    ///
    /// A payload that does not parse is logged and kept as raw text.
    pub fn add_typed<T>(&mut self, op: Operation) -> Result<DeferredHandle<T>, BatchError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.enqueue(op, Some(resolve::<T> as Parser<T>))
    }

    fn enqueue<T: Send + 'static>(
        &mut self,
        op: Operation,
        parser: Option<Parser<T>>,
    ) -> Result<DeferredHandle<T>, BatchError> {
        if self.committed {
            return Err(BatchError::AlreadyCommitted);
        }

        let (kind, body, variables, policy) = op.into_parts();
        let allocation = self.allocator.allocate();
        let mut record = OperationRecord {
            kind,
            body,
            variables,
            alias: allocation.alias.clone(),
            dependencies: BTreeSet::new(),
            stage: self.stage,
            placeholders: BTreeMap::new(),
        };
        let found = scan(&self.allocator, record.payload_texts(), &record.alias);
        record.dependencies = found.dependencies;
        record.placeholders = found.placeholders;

        debug!(
            batcher = self.id,
            alias = %record.alias,
            kind = %record.kind,
            stage = self.stage,
            dependencies = record.dependencies.len(),
            "queued batch operation"
        );

        let handle = DeferredHandle::pending(
            self.id,
            allocation.alias.clone(),
            allocation.placeholder,
            policy.unwrap_or(self.config.failure_policy),
            parser,
        );

        self.slots.insert(allocation.alias.clone(), handle.slot());
        self.positions.insert(allocation.alias, self.queue.len());
        self.queue.push(record);

        Ok(handle)
    }

    /// Start a new stage; later operations are tagged with it.
    pub fn barrier(&mut self) -> Result<u32, BatchError> {
        if self.committed {
            return Err(BatchError::AlreadyCommitted);
        }
        self.stage += 1;
        debug!(batcher = self.id, stage = self.stage, "batch barrier");
        Ok(self.stage)
    }

    /// Force `op` to depend on `dep`. Both must be queued on this batcher.
    pub fn dependency<T, U>(
        &mut self,
        op: &DeferredHandle<T>,
        dep: &DeferredHandle<U>,
    ) -> Result<(), BatchError> {
        if self.committed {
            return Err(BatchError::AlreadyCommitted);
        }
        let idx = self.position_of(op.batcher_id(), op.alias())?;
        self.position_of(dep.batcher_id(), dep.alias())?;
        if op.alias() == dep.alias() {
            return Err(BatchError::SelfDependency { alias: op.alias().to_string() });
        }

        self.queue[idx].dependencies.insert(dep.alias().to_string());
        Ok(())
    }

    fn position_of(&self, batcher_id: u64, alias: &str) -> Result<usize, BatchError> {
        match self.positions.get(alias) {
            Some(&idx) if batcher_id == self.id => Ok(idx),
            _ => Err(BatchError::UnknownOperation { alias: alias.to_string() }),
        }
    }

    /// Send every queued operation in one request and resolve the handles.
    ///
    /// An empty queue completes without a network call. A transport failure
    /// is returned as [`BatchError::Submit`] and leaves every handle pending.
    pub async fn commit(&mut self) -> Result<CommitSummary, BatchError> {
        let Some(request) = self.prepare_commit()? else {
            return Ok(CommitSummary::default());
        };
        let submitter = Arc::clone(&self.submitter);
        let response = submit(self.id, submitter.as_ref(), &request).await?;
        self.apply_response(response)
    }

    /// First commit phase: mark the batcher committed, validate, and build
    /// the request. `None` means there is nothing to send.
    pub fn prepare_commit(&mut self) -> Result<Option<BatchRequest>, BatchError> {
        if self.committed {
            return Err(BatchError::AlreadyCommitted);
        }
        self.committed = true;

        if self.queue.is_empty() {
            debug!(batcher = self.id, "nothing queued, skipping batch request");
            return Ok(None);
        }
        if self.config.validate {
            self.validate()?;
        }

        Ok(Some(BatchRequest { data: self.queue.clone() }))
    }

    fn validate(&self) -> Result<(), BatchError> {
        for record in &self.queue {
            if record.kind.trim().is_empty() {
                return Err(BatchError::Validation {
                    alias: record.alias.clone(),
                    message: "operation kind is empty".to_string(),
                });
            }
            if let Some(missing) =
                record.dependencies.iter().find(|dep| !self.positions.contains_key(*dep))
            {
                return Err(BatchError::Validation {
                    alias: record.alias.clone(),
                    message: format!("depends on unknown operation '{missing}'"),
                });
            }
        }
        Ok(())
    }

    /// Last commit phase: resolve handles from the response, then apply the
    /// raise-on-commit sweep in enqueue order.
    pub fn apply_response(&mut self, response: BatchResponse) -> Result<CommitSummary, BatchError> {
        let mut summary = CommitSummary { submitted: self.queue.len(), ..CommitSummary::default() };

        for outcome in response.data {
            let Some(slot) = self.slots.get(&outcome.alias) else {
                warn!(batcher = self.id, alias = %outcome.alias, "ignoring result for unknown alias");
                continue;
            };
            let ok = outcome.is_ok();
            if !slot.resolve(outcome.code, outcome.data) {
                warn!(batcher = self.id, alias = %outcome.alias, "ignoring duplicate result");
                continue;
            }
            if ok {
                summary.succeeded += 1;
            } else {
                debug!(batcher = self.id, alias = %outcome.alias, status = outcome.code, "operation failed");
                summary.failed += 1;
            }
        }

        summary.unresolved = self.slots.values().filter(|slot| slot.is_pending()).count();
        if summary.unresolved > 0 {
            warn!(
                batcher = self.id,
                count = summary.unresolved,
                "batch response omitted queued operations, their handles stay pending"
            );
        }

        info!(
            batcher = self.id,
            submitted = summary.submitted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch committed"
        );

        for record in &self.queue {
            let Some(slot) = self.slots.get(&record.alias) else { continue };
            if slot.policy() != FailurePolicy::RaiseOnCommit {
                continue;
            }
            if let Some((code, message)) = slot.failure() {
                return Err(BatchError::OperationFailed { alias: record.alias.clone(), code, message });
            }
        }

        Ok(summary)
    }
}

/// Commit a batcher shared with an ambient scope without holding its lock
/// across the network call.
pub(crate) async fn commit_shared(shared: &Mutex<Batcher>) -> Result<CommitSummary, BatchError> {
    let (id, submitter, request) = {
        let mut batcher = shared.lock();
        match batcher.prepare_commit()? {
            Some(request) => (batcher.id, Arc::clone(&batcher.submitter), request),
            None => return Ok(CommitSummary::default()),
        }
    };
    let response = submit(id, submitter.as_ref(), &request).await?;
    shared.lock().apply_response(response)
}

async fn submit(
    batcher: u64,
    submitter: &dyn BatchSubmitter,
    request: &BatchRequest,
) -> Result<BatchResponse, BatchError> {
    debug!(batcher, count = request.data.len(), "submitting batch");
    submitter.submit(request).await.map_err(|err| {
        let err = BatchError::Submit(err);
        log_classified("batch_commit", &err);
        err
    })
}
