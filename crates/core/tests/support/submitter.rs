//! In-memory mock for the `BatchSubmitter` port

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use batchwire_core::BatchSubmitter;
use batchwire_domain::{
    BatchRequest, BatchResponse, BatchwireError, OperationOutcome, Result as DomainResult,
};
use parking_lot::Mutex;

/// Mock batch endpoint that records every request.
///
/// Each operation is answered from a per-kind script; unscripted kinds echo
/// their kind with status 200. Outcomes are returned in reverse order to
/// exercise alias matching.
#[derive(Default, Clone)]
pub struct RecordingSubmitter {
    script: Arc<HashMap<String, (String, u16)>>,
    requests: Arc<Mutex<Vec<BatchRequest>>>,
    failure: Option<BatchwireError>,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer operations of `kind` with `data` and `code`.
    pub fn with_outcome(mut self, kind: &str, data: &str, code: u16) -> Self {
        Arc::make_mut(&mut self.script).insert(kind.to_string(), (data.to_string(), code));
        self
    }

    /// Fail the whole request with a transport error.
    pub fn failing(mut self, err: BatchwireError) -> Self {
        self.failure = Some(err);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<BatchRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn shared(&self) -> Arc<dyn BatchSubmitter> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl BatchSubmitter for RecordingSubmitter {
    async fn submit(&self, request: &BatchRequest) -> DomainResult<BatchResponse> {
        self.requests.lock().push(request.clone());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let data = request
            .data
            .iter()
            .rev()
            .map(|record| {
                let (data, code) = self
                    .script
                    .get(&record.kind)
                    .cloned()
                    .unwrap_or_else(|| (record.kind.clone(), 200));
                OperationOutcome { alias: record.alias.clone(), data, code }
            })
            .collect();
        Ok(BatchResponse { data })
    }
}
