//! Cancelled parses keep the previous tree and are retried.

use std::sync::Arc;

use tessera::project::{LifecycleState, SharedWorkspace, WorkspaceBuilder, WorkspaceConfig};

use crate::helpers::{CUSTOMER, TestWorkspace, loc};

const CUSTOMER_V2: &str = "entity:\n    id: Customer\n    attributes:\n      - id: Id\n      - id: Name\n      - id: Email\n";

#[test]
fn test_cancelled_parse_keeps_previous_tree_and_requeues() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[]).file("/ws/a/customer.cm", CUSTOMER);
    ws.build();

    let location = loc("/ws/a/customer.cm");
    ws.file("/ws/a/customer.cm", CUSTOMER_V2);
    ws.builder.cancel_registry().cancel(&location);
    let report = ws.change(&["/ws/a/customer.cm"]);

    assert_eq!(report.cancelled, vec![location.clone()]);
    assert!(report.parsed.is_empty());
    assert_eq!(ws.builder.pending().collect::<Vec<_>>(), vec![&location]);
    let unit = ws.builder.documents().get(&location).unwrap();
    assert_eq!(unit.text, CUSTOMER);
    assert_eq!(unit.state(), LifecycleState::Validated);
    assert!(ws.entry("a.Customer.Name").is_some());
    assert!(ws.entry("a.Customer.Email").is_none());

    // The next update picks it up without being told
    let report = ws.builder.update([], []).unwrap();
    assert_eq!(report.parsed, vec![location.clone()]);
    assert!(report.cancelled.is_empty());
    assert_eq!(ws.builder.pending().count(), 0);
    assert!(ws.entry("a.Customer.Email").is_some());
}

#[test]
fn test_cancelled_new_file_is_not_tracked_until_parsed() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[]);
    ws.build();

    let location = loc("/ws/a/customer.cm");
    ws.file("/ws/a/customer.cm", CUSTOMER);
    ws.builder.cancel_registry().cancel(&location);
    let report = ws.change(&["/ws/a/customer.cm"]);
    assert_eq!(report.cancelled, vec![location.clone()]);
    assert!(!ws.builder.documents().contains(&location));

    let report = ws.builder.update([], []).unwrap();
    assert_eq!(report.validated, vec![location]);
}

#[test]
fn test_deleting_pending_location_drops_retry() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[]).file("/ws/a/customer.cm", CUSTOMER);
    ws.build();

    ws.builder.cancel_registry().cancel(&loc("/ws/a/customer.cm"));
    ws.change(&["/ws/a/customer.cm"]);
    assert_eq!(ws.builder.pending().count(), 1);

    let report = ws.delete(&["/ws/a/customer.cm"]);
    assert_eq!(ws.builder.pending().count(), 0);
    assert!(report.parsed.is_empty());
    assert!(ws.entry("a.Customer").is_none());
}

#[test]
fn test_worker_cancellation() {
    let mut ws = TestWorkspace::with_config(WorkspaceConfig::default().with_parse_workers(1));
    ws.manifest("/ws/a", "a", &[]).file("/ws/a/customer.cm", CUSTOMER);
    ws.builder.cancel_registry().cancel(&loc("/ws/a/customer.cm"));
    let report = ws.build();
    assert_eq!(report.cancelled, vec![loc("/ws/a/customer.cm")]);

    let report = ws.builder.update([], []).unwrap();
    assert_eq!(report.parsed, vec![loc("/ws/a/customer.cm")]);
}

#[test]
fn test_shared_workspace_cancel_handle() {
    let ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[]).file("/ws/a/customer.cm", CUSTOMER);
    let fs = ws.fs.clone();
    let shared = Arc::new(SharedWorkspace::new(WorkspaceBuilder::new(
        WorkspaceConfig::default(),
        fs,
    )));

    shared.cancel_registry().cancel(&loc("/ws/a/customer.cm"));
    let report = shared.update(vec![loc("/ws")], vec![]).unwrap();
    assert_eq!(report.cancelled.len(), 1);

    let report = shared.update(vec![], vec![]).unwrap();
    assert_eq!(report.parsed, vec![loc("/ws/a/customer.cm")]);
    shared.with_builder(|builder| assert!(builder.index().contains("a.Customer")));
}
