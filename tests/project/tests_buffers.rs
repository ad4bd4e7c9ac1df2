//! Editor buffers take precedence over the file system text.

use tessera::project::LifecycleState;

use crate::helpers::{CUSTOMER, ORDERS, TestWorkspace, loc};

const CUSTOMER_EDITED: &str = "entity:\n    id: Client\n    attributes:\n      - id: Id\n";

#[test]
fn test_open_buffer_overrides_disk_text() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[]).file("/ws/a/customer.cm", CUSTOMER);
    ws.build();

    let location = loc("/ws/a/customer.cm");
    let report = ws
        .builder
        .open_buffer(location.clone(), CUSTOMER_EDITED.to_string())
        .unwrap();
    assert_eq!(report.parsed, vec![location.clone()]);
    assert!(ws.builder.buffers().is_open(&location));
    assert!(ws.entry("a.Client").is_some());
    assert!(ws.entry("a.Customer").is_none());

    let report = ws
        .builder
        .change_buffer(&location, CUSTOMER.to_string())
        .unwrap();
    assert_eq!(report.parsed, vec![location.clone()]);
    assert!(ws.entry("a.Customer").is_some());
}

#[test]
fn test_close_buffer_reverts_to_disk() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[]).file("/ws/a/customer.cm", CUSTOMER);
    ws.build();

    let location = loc("/ws/a/customer.cm");
    ws.builder
        .open_buffer(location.clone(), CUSTOMER_EDITED.to_string())
        .unwrap();
    let report = ws.builder.close_buffer(&location).unwrap();
    assert_eq!(report.parsed, vec![location.clone()]);
    assert!(!ws.builder.buffers().is_open(&location));
    assert_eq!(ws.builder.documents().get(&location).unwrap().text, CUSTOMER);
    assert!(ws.entry("a.Customer").is_some());
    assert!(ws.entry("a.Client").is_none());
}

#[test]
fn test_buffer_without_file_on_disk() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[]).file("/ws/a/customer.cm", CUSTOMER);
    ws.build();

    let location = loc("/ws/a/orders.cm");
    ws.builder
        .open_buffer(location.clone(), ORDERS.to_string())
        .unwrap();
    let unit = ws.builder.documents().get(&location).unwrap();
    assert_eq!(unit.state(), LifecycleState::Validated);
    assert_eq!(ws.target_of("/ws/a/orders.cm", "parent").as_deref(), Some("a.Customer"));

    // Nothing to fall back to
    let report = ws.builder.close_buffer(&location).unwrap();
    assert_eq!(report.deleted, vec![location.clone()]);
    assert!(!ws.builder.documents().contains(&location));
}

#[test]
fn test_deleting_unit_closes_its_buffer() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[]).file("/ws/a/customer.cm", CUSTOMER);
    ws.build();

    let location = loc("/ws/a/customer.cm");
    ws.builder
        .open_buffer(location.clone(), CUSTOMER_EDITED.to_string())
        .unwrap();
    ws.delete(&["/ws/a/customer.cm"]);
    assert!(!ws.builder.buffers().is_open(&location));
    assert!(ws.builder.buffers().is_empty());
}

#[test]
fn test_unopened_buffer_edits_are_ignored() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[]).file("/ws/a/customer.cm", CUSTOMER);
    ws.build();

    let location = loc("/ws/a/customer.cm");
    let report = ws
        .builder
        .change_buffer(&location, CUSTOMER_EDITED.to_string())
        .unwrap();
    assert!(report.is_empty());
    let report = ws.builder.close_buffer(&location).unwrap();
    assert!(report.is_empty());
    assert!(ws.entry("a.Customer").is_some());
}
