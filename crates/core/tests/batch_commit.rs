//! End-to-end commit behaviour against an in-memory batch endpoint

mod support;

use std::collections::BTreeSet;

use batchwire_core::{BatchError, Batcher, HandleValue, Operation};
use batchwire_domain::{BatchConfig, BatchwireError, FailurePolicy};
use serde::Deserialize;
use support::submitter::RecordingSubmitter;

fn batcher(submitter: &RecordingSubmitter, policy: FailurePolicy) -> Batcher {
    Batcher::new(submitter.shared(), BatchConfig { failure_policy: policy, validate: true })
}

#[tokio::test]
async fn dependent_operation_resolves_after_single_request() {
    let submitter = RecordingSubmitter::new()
        .with_outcome("createThing", "123", 200)
        .with_outcome("useThing", "ok", 200);
    let mut batcher = batcher(&submitter, FailurePolicy::RaiseOnCommit);

    let a = batcher.add(Operation::new("createThing")).unwrap();
    let b = batcher
        .add(Operation::new("useThing").with_var("id", a.to_text().unwrap()))
        .unwrap();
    batcher.commit().await.unwrap();

    assert_eq!(a.get().unwrap(), HandleValue::Raw("123".into()));
    assert_eq!(b.get().unwrap(), HandleValue::Raw("ok".into()));
    assert_eq!(
        batcher.record(b.alias()).unwrap().dependencies,
        BTreeSet::from([a.alias().to_string()])
    );
    assert_eq!(submitter.calls(), 1);
}

#[tokio::test]
async fn request_carries_dependencies_and_placeholder_occurrences() {
    let submitter = RecordingSubmitter::new();
    let mut batcher = batcher(&submitter, FailurePolicy::NeverRaise);

    let collection = batcher.add(Operation::new("postCollection")).unwrap();
    batcher.barrier().unwrap();
    let body = format!(r#"{{"collection":"{}"}}"#, collection.placeholder());
    let run = batcher
        .add(
            Operation::new("runPipeline")
                .with_raw_body(body)
                .with_handle_var("again", &collection),
        )
        .unwrap();
    batcher.commit().await.unwrap();

    let request = submitter.last_request().unwrap();
    assert_eq!(request.data.len(), 2);
    assert_eq!(request.data[0].alias, collection.alias());
    let record = &request.data[1];
    assert_eq!(record.alias, run.alias());
    assert_eq!(record.stage, 1);
    assert_eq!(record.dependencies.len(), 1);
    assert_eq!(record.placeholders[collection.placeholder()], collection.alias());
}

#[tokio::test]
async fn every_handle_resolves_after_commit() {
    let submitter = RecordingSubmitter::new().with_outcome("missing", "not found", 404);
    let mut batcher = batcher(&submitter, FailurePolicy::NeverRaise);

    let handles: Vec<_> = ["a", "missing", "b", "c"]
        .into_iter()
        .map(|kind| batcher.add(Operation::new(kind)).unwrap())
        .collect();
    let summary = batcher.commit().await.unwrap();

    assert_eq!(summary.submitted, 4);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.unresolved, 0);
    assert!(handles.iter().all(|handle| !handle.is_pending()));
}

#[tokio::test]
async fn raise_on_commit_surfaces_error_text() {
    let submitter = RecordingSubmitter::new().with_outcome("explode", "internal failure", 500);
    let mut batcher = batcher(&submitter, FailurePolicy::RaiseOnCommit);

    batcher.add(Operation::new("fine")).unwrap();
    let x = batcher.add(Operation::new("explode")).unwrap();
    let err = batcher.commit().await.unwrap_err();

    assert_eq!(err.to_string(), "internal failure");
    assert!(matches!(err, BatchError::OperationFailed { ref alias, code: 500, .. } if alias == x.alias()));
}

#[tokio::test]
async fn raise_on_access_defers_failure_to_the_handle() {
    let submitter = RecordingSubmitter::new().with_outcome("explode", "internal failure", 500);
    let mut batcher = batcher(&submitter, FailurePolicy::RaiseOnAccess);

    let x = batcher.add(Operation::new("explode")).unwrap();
    batcher.commit().await.unwrap();

    let err = x.get().unwrap_err();
    assert_eq!(err.to_string(), "internal failure");
    assert_eq!(x.ok(), Ok(false));
    assert!(x.to_text().is_err());
}

#[tokio::test]
async fn never_raise_reports_failure_only_through_ok() {
    let submitter = RecordingSubmitter::new().with_outcome("explode", "internal failure", 500);
    let mut batcher = batcher(&submitter, FailurePolicy::NeverRaise);

    let x = batcher.add(Operation::new("explode")).unwrap();
    let y = batcher.add(Operation::new("fine")).unwrap();
    batcher.commit().await.unwrap();

    assert_eq!(x.ok(), Ok(false));
    assert_eq!(x.get().unwrap(), HandleValue::Raw("internal failure".into()));
    assert_eq!(y.ok(), Ok(true));
}

#[tokio::test]
async fn double_commit_never_reaches_the_network() {
    let submitter = RecordingSubmitter::new();
    let mut batcher = batcher(&submitter, FailurePolicy::RaiseOnCommit);
    batcher.add(Operation::new("a")).unwrap();

    batcher.commit().await.unwrap();
    let err = batcher.commit().await.unwrap_err();

    assert_eq!(err, BatchError::AlreadyCommitted);
    assert!(err.is_usage_error());
    assert_eq!(submitter.calls(), 1);
}

#[tokio::test]
async fn transport_failure_means_nothing_happened() {
    let submitter =
        RecordingSubmitter::new().failing(BatchwireError::Network("timed out".into()));
    let mut batcher = batcher(&submitter, FailurePolicy::RaiseOnCommit);

    let a = batcher.add(Operation::new("a")).unwrap();
    let b = batcher.add(Operation::new("b")).unwrap();
    let err = batcher.commit().await.unwrap_err();

    assert!(matches!(err, BatchError::Submit(BatchwireError::Network(_))));
    assert!(a.is_pending() && b.is_pending());
    assert_eq!(b.get(), Err(BatchError::NotResolved { alias: b.alias().to_string() }));
}

#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
struct Collection {
    id: String,
    docs: Vec<String>,
}

#[tokio::test]
async fn typed_results_parse_or_fall_back_to_raw_text() {
    let submitter = RecordingSubmitter::new()
        .with_outcome("getCollection", r#"{"id":"c1","docs":["d1"]}"#, 200)
        .with_outcome("getBroken", "<html>", 200);
    let mut batcher = batcher(&submitter, FailurePolicy::RaiseOnCommit);

    let good = batcher.add_typed::<Collection>(Operation::new("getCollection")).unwrap();
    let bad = batcher.add_typed::<Collection>(Operation::new("getBroken")).unwrap();
    batcher.commit().await.unwrap();

    let collection = good.get().unwrap().into_parsed().unwrap();
    assert_eq!(collection, Collection { id: "c1".into(), docs: vec!["d1".into()] });
    assert_eq!(bad.get().unwrap(), HandleValue::Raw("<html>".into()));
}
