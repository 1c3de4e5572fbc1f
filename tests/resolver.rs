//! Workflow Resolution Integration Tests
//!
//! Tests for filename passthrough, name/id lookup and caching.

mod common;

use std::sync::Arc;

use tokio_test::{assert_err, assert_ok};
use wfdispatch::domain::WorkflowId;
use wfdispatch::{ErrorKind, WorkflowResolver};

use common::{repo, workflow, FakeGitHub};

fn resolver(api: &Arc<FakeGitHub>, reference: &str) -> WorkflowResolver {
    WorkflowResolver::new(api.clone(), repo(), reference.into())
}

#[tokio::test]
async fn test_filename_needs_no_lookup() {
    let api = Arc::new(FakeGitHub::new().with_workflows(vec![workflow(1, "CI")]));

    for reference in ["release.yml", "deploy.yaml"] {
        let id = assert_ok!(resolver(&api, reference).resolve().await);
        assert_eq!(id, WorkflowId::Filename(reference.to_string()));
    }

    assert_eq!(api.list_workflows_calls(), 0);
}

#[tokio::test]
async fn test_resolve_by_name_and_by_id() {
    let api = Arc::new(
        FakeGitHub::new().with_workflows(vec![workflow(7, "Lint"), workflow(42, "Build & Deploy")]),
    );

    let by_name = assert_ok!(resolver(&api, "Build & Deploy").resolve().await);
    assert_eq!(by_name, WorkflowId::Numeric(42));

    let by_id = assert_ok!(resolver(&api, "7").resolve().await);
    assert_eq!(by_id, WorkflowId::Numeric(7));
}

#[tokio::test]
async fn test_unknown_reference_is_not_found() {
    let api = Arc::new(FakeGitHub::new().with_workflows(vec![workflow(7, "Lint")]));

    let err = assert_err!(resolver(&api, "Release").resolve().await);
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "Unable to find workflow 'Release' in octo/app");
}

#[tokio::test]
async fn test_resolution_is_cached() {
    let api = Arc::new(FakeGitHub::new().with_workflows(vec![workflow(42, "Build & Deploy")]));
    let resolver = resolver(&api, "42");

    let first = assert_ok!(resolver.resolve().await);
    let second = assert_ok!(resolver.resolve().await);

    assert_eq!(first, second);
    assert_eq!(resolver.cached(), Some(&WorkflowId::Numeric(42)));
    assert_eq!(api.list_workflows_calls(), 1);
}

#[tokio::test]
async fn test_concurrent_resolution_lists_once() {
    let api = Arc::new(FakeGitHub::new().with_workflows(vec![workflow(42, "Build & Deploy")]));
    let resolver = resolver(&api, "Build & Deploy");

    let (a, b) = tokio::join!(resolver.resolve(), resolver.resolve());

    assert_eq!(assert_ok!(a), WorkflowId::Numeric(42));
    assert_eq!(assert_ok!(b), WorkflowId::Numeric(42));
    assert_eq!(api.list_workflows_calls(), 1);
}

#[tokio::test]
async fn test_failed_resolution_is_not_cached() {
    let api = Arc::new(FakeGitHub::new());
    let resolver = resolver(&api, "Nightly");

    assert_err!(resolver.resolve().await);
    assert!(resolver.cached().is_none());

    api.workflows.lock().unwrap().push(workflow(99, "Nightly"));

    let id = assert_ok!(resolver.resolve().await);
    assert_eq!(id, WorkflowId::Numeric(99));
    assert_eq!(api.list_workflows_calls(), 2);
}
