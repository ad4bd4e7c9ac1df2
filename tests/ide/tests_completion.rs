//! Completion candidates for reference properties.

use tessera::syntax::{ElementKind, ElementPath};

use crate::helpers::{CUSTOMER, ORDER, ORDERS, TestWorkspace, loc};

fn workspace() -> TestWorkspace {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/customer.cm", CUSTOMER)
        .manifest("/ws/b", "b", &[("a", "*")])
        .file("/ws/b/order.cm", ORDER)
        .file("/ws/b/orders.cm", ORDERS)
        .manifest("/ws/c", "c", &[])
        .file("/ws/c/hidden.cm", "entity:\n    id: Hidden\n");
    ws.build();
    ws
}

fn labels(ws: &TestWorkspace, location: &str, path: &ElementPath, property: &str) -> Vec<String> {
    ws.builder
        .analysis()
        .completions(&loc(location), path, property)
        .into_iter()
        .map(|item| item.label.to_string())
        .collect()
}

#[test]
fn test_own_package_sorts_before_dependencies() {
    let ws = workspace();
    let items = ws
        .builder
        .analysis()
        .completions(&loc("/ws/b/orders.cm"), &ElementPath::root(), "parent");
    let labels: Vec<&str> = items.iter().map(|i| &*i.label).collect();
    assert_eq!(labels, vec!["Order", "Customer"]);
    assert!(items.iter().all(|i| i.kind == ElementKind::Entity));
    assert!(items[0].sort_priority < items[1].sort_priority);
    assert_eq!(items[1].detail.as_deref(), Some("entity in a"));
    assert_eq!(&*items[1].global_id, "a.Customer");
}

#[test]
fn test_invisible_packages_are_not_offered() {
    let ws = workspace();
    let offered = labels(&ws, "/ws/b/orders.cm", &ElementPath::root(), "child");
    assert!(!offered.iter().any(|l| l.contains("Hidden")));
}

#[test]
fn test_anchored_property_offers_anchor_members() {
    let ws = workspace();
    let attribute = ElementPath::root().child("attributes", 0);
    assert_eq!(labels(&ws, "/ws/b/orders.cm", &attribute, "parent"), vec!["Id", "Name"]);
    assert_eq!(labels(&ws, "/ws/b/orders.cm", &attribute, "child"), vec!["CustomerId"]);
}

#[test]
fn test_shadowed_names_complete_with_global_id() {
    let mut ws = workspace();
    // b now declares its own Customer, hiding a.Customer by local name
    ws.file("/ws/b/customer.cm", CUSTOMER);
    ws.change(&["/ws/b/customer.cm"]);

    let offered = labels(&ws, "/ws/b/orders.cm", &ElementPath::root(), "parent");
    assert_eq!(offered, vec!["Customer", "Order", "a.Customer"]);
}

#[test]
fn test_unknown_property_or_location_has_no_candidates() {
    let ws = workspace();
    assert!(labels(&ws, "/ws/b/orders.cm", &ElementPath::root(), "id").is_empty());
    assert!(labels(&ws, "/ws/b/missing.cm", &ElementPath::root(), "parent").is_empty());
    assert!(
        labels(&ws, "/ws/b/orders.cm", &ElementPath::root().child("attributes", 7), "parent")
            .is_empty()
    );
}

fn labels_at(ws: &TestWorkspace, location: &str, text: &str, line: u32, col: u32) -> Vec<String> {
    ws.builder
        .analysis()
        .completions_at(&loc(location), text, line, col)
        .into_iter()
        .map(|item| item.label.to_string())
        .collect()
}

#[test]
fn test_unterminated_inline_list_completes_typed_prefix() {
    let ws = workspace();
    let text = "entity:\n    id: Draft\n    superEntities: [Cu";
    assert_eq!(labels_at(&ws, "/ws/b/draft.cm", text, 2, 22), vec!["Customer"]);
}

#[test]
fn test_empty_value_at_end_of_buffer() {
    let ws = workspace();
    let text = "relationship:\n    id: R\n    parent: ";
    assert_eq!(labels_at(&ws, "/ws/b/draft.cm", text, 2, 12), vec!["Order", "Customer"]);
}

#[test]
fn test_open_list_item_completes_anchor_members() {
    let ws = workspace();
    let text = "relationship:\n    id: R\n    parent: Customer\n    attributes:\n      - parent: N";
    assert_eq!(labels_at(&ws, "/ws/b/draft.cm", text, 4, 17), vec!["Name"]);
}

#[test]
fn test_cursor_outside_a_reference_has_no_candidates() {
    let ws = workspace();
    let text = "entity:\n    id: Dra";
    assert!(labels_at(&ws, "/ws/b/draft.cm", text, 1, 11).is_empty());
    assert!(labels_at(&ws, "/ws/b/draft.cm", text, 9, 0).is_empty());
}
