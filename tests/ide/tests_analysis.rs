//! Read-only queries over a built workspace.

use tessera::syntax::{ElementKind, ElementPath};

use crate::helpers::{CUSTOMER, ORDER, ORDERS, TestWorkspace, loc};

fn workspace() -> TestWorkspace {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/customer.cm", CUSTOMER)
        .manifest("/ws/b", "b", &[("a", "*")])
        .file("/ws/b/order.cm", ORDER)
        .file("/ws/b/orders.cm", ORDERS);
    ws.build();
    ws
}

#[test]
fn test_get_element_by_id_filters_by_kind() {
    let ws = workspace();
    let analysis = ws.builder.analysis();
    assert!(analysis.get_element_by_id("a.Customer", None).is_some());
    assert!(analysis.get_element_by_id("a.Customer", Some(ElementKind::Entity)).is_some());
    assert!(analysis.get_element_by_id("a.Customer", Some(ElementKind::Relationship)).is_none());
    assert!(analysis.get_element_by_id("a.Missing", None).is_none());

    let id = analysis
        .get_element_by_id("a.Customer.Id", Some(ElementKind::Attribute))
        .unwrap();
    assert_eq!(&*id.local_name, "Customer.Id");
    assert_eq!(id.container.as_deref(), Some("a.Customer"));
}

#[test]
fn test_resolve_element_follows_live_units() {
    let mut ws = workspace();
    let entry = ws.entry("a.Customer.Name").unwrap();
    {
        let analysis = ws.builder.analysis();
        let element = analysis.resolve_element(&entry).unwrap();
        assert_eq!(element.kind, ElementKind::Attribute);
        assert_eq!(element.id.as_deref(), Some("Name"));

        let root = analysis
            .resolve_semantic_element(&loc("/ws/a/customer.cm"))
            .unwrap();
        assert_eq!(root.kind, ElementKind::Entity);
    }

    ws.delete(&["/ws/a/customer.cm"]);
    let analysis = ws.builder.analysis();
    assert!(analysis.resolve_element(&entry).is_none());
    assert!(analysis.resolve_semantic_element(&loc("/ws/a/customer.cm")).is_none());
}

#[test]
fn test_element_at_returns_deepest_element() {
    let ws = workspace();
    let analysis = ws.builder.analysis();
    let orders = loc("/ws/b/orders.cm");

    let (path, element) = analysis.element_at(&orders, 5, 16).unwrap();
    assert_eq!(path, ElementPath::root().child("attributes", 0));
    assert_eq!(element.kind, ElementKind::RelationshipAttribute);

    let (path, element) = analysis.element_at(&orders, 1, 8).unwrap();
    assert_eq!(path, ElementPath::root());
    assert_eq!(element.kind, ElementKind::Relationship);

    assert!(analysis.element_at(&orders, 40, 0).is_none());
    assert!(analysis.element_at(&loc("/ws/b/missing.cm"), 0, 0).is_none());
}

#[test]
fn test_goto_definition_across_packages() {
    let ws = workspace();
    let analysis = ws.builder.analysis();

    let result = analysis.goto_definition(&loc("/ws/b/orders.cm"), 2, 14);
    assert_eq!(result.targets.len(), 1);
    let target = &result.targets[0];
    assert_eq!(&*target.global_id, "a.Customer");
    assert_eq!(target.location, loc("/ws/a/customer.cm"));
    assert_eq!(target.kind, ElementKind::Entity);
    // Lands on the declared id
    assert_eq!(target.span.start.line, 1);
    assert_eq!(&CUSTOMER[target.range], "Customer");

    // Anchored member reference
    let result = analysis.goto_definition(&loc("/ws/b/orders.cm"), 5, 16);
    assert_eq!(&*result.targets[0].global_id, "a.Customer.Id");

    // Not on a reference
    assert!(analysis.goto_definition(&loc("/ws/b/orders.cm"), 1, 8).is_empty());
}

#[test]
fn test_goto_definition_on_unresolved_reference_is_empty() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/r.cm", "relationship:\n    id: R\n    parent: Nowhere\n");
    ws.build();
    assert!(ws.builder.analysis().goto_definition(&loc("/ws/a/r.cm"), 2, 14).is_empty());
}

#[test]
fn test_referrers_span_units() {
    let ws = workspace();
    let analysis = ws.builder.analysis();

    let referrers = analysis.referrers("a.Customer");
    assert_eq!(referrers.len(), 1);
    assert_eq!(*referrers[0].0, loc("/ws/b/orders.cm"));
    assert_eq!(referrers[0].1.property, "parent");

    let referrers = analysis.referrers("b.Order");
    assert_eq!(referrers.len(), 1);
    assert_eq!(referrers[0].1.property, "child");
    assert!(analysis.referrers("b.Orders").is_empty());
}

#[test]
fn test_package_of() {
    let ws = workspace();
    let analysis = ws.builder.analysis();
    assert_eq!(analysis.package_of(&loc("/ws/b/orders.cm")).unwrap().name, "b");
    assert!(analysis.package_of(&loc("/elsewhere/x.cm")).is_none());
    assert!(analysis.diagnostics(&loc("/elsewhere/x.cm")).is_empty());
    assert!(analysis.references(&loc("/elsewhere/x.cm")).is_empty());
}
