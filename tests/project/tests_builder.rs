//! Builder pipeline: parse, index, link and validate across change batches.

use rstest::rstest;
use tessera::hir::codes;
use tessera::project::{LifecycleState, WorkspaceConfig};
use tessera::syntax::{ElementKind, ElementPath};

use crate::helpers::{CUSTOMER, DIAGRAM, ORDER, ORDERS, TestWorkspace, loc};

fn two_packages(config: WorkspaceConfig) -> TestWorkspace {
    let mut ws = TestWorkspace::with_config(config);
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/customer.cm", CUSTOMER)
        .manifest("/ws/b", "b", &[("a", "*")])
        .file(
            "/ws/b/orders.cm",
            "relationship:\n    id: Orders\n    parent: Customer\n    child: Customer\n",
        );
    ws.build();
    ws
}

#[rstest]
#[case::inline(WorkspaceConfig::default())]
#[case::sequential(WorkspaceConfig::default().with_parallel(false))]
#[case::worker(WorkspaceConfig::default().with_parse_workers(2))]
fn test_end_to_end_two_packages(#[case] config: WorkspaceConfig) {
    let mut ws = two_packages(config);
    assert_eq!(ws.target_of("/ws/b/orders.cm", "parent").as_deref(), Some("a.Customer"));
    assert!(ws.codes("/ws/b/orders.cm").is_empty());

    let report = ws.delete(&["/ws/a"]);
    assert!(report.deleted.contains(&loc("/ws/a/customer.cm")));
    assert!(report.deleted.contains(&loc("/ws/a/package.json")));
    assert!(ws.builder.packages().by_name("a").is_none());
    assert!(ws.builder.index().entries_in_package("a").next().is_none());

    assert_eq!(ws.target_of("/ws/b/orders.cm", "parent"), None);
    let diagnostics = ws.diagnostics("/ws/b/orders.cm");
    assert_eq!(
        diagnostics
            .iter()
            .filter(|d| d.code.as_deref() == Some(codes::UNDEFINED_REFERENCE))
            .count(),
        2
    );
    assert!(ws.codes("/ws/b/package.json").contains(&codes::UNKNOWN_DEPENDENCY.to_string()));
}

#[test]
fn test_every_unit_reaches_validated() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/customer.cm", CUSTOMER)
        .file("/ws/a/order.cm", ORDER)
        .file("/ws/a/orders.cm", ORDERS)
        .file("/ws/a/overview.cm", DIAGRAM);
    let report = ws.build();
    assert_eq!(report.parsed.len(), 5);
    assert_eq!(report.indexed.len(), 4);
    assert_eq!(report.validated.len(), 4);
    for unit in ws.builder.documents().iter() {
        assert_eq!(unit.state(), LifecycleState::Validated, "{}", unit.location);
        assert!(!unit.has_errors(), "{}: {:?}", unit.location, unit.diagnostics);
    }
}

#[test]
fn test_directory_delete_then_readd_creates_fresh_unit() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/model/customer.cm", CUSTOMER)
        .file("/ws/a/model/order.cm", ORDER);
    ws.build();
    assert_eq!(ws.builder.index().len(), 5);

    let report = ws.delete(&["/ws/a/model"]);
    assert_eq!(report.deleted.len(), 2);
    assert_eq!(ws.builder.index().len(), 0);
    assert!(ws.builder.packages().by_name("a").is_some());

    ws.file("/ws/a/model/customer.cm", CUSTOMER);
    let report = ws.change(&["/ws/a/model/customer.cm"]);
    assert_eq!(report.parsed, vec![loc("/ws/a/model/customer.cm")]);
    // The root keeps its declared name: nothing stale claims it
    assert!(ws.entry("a.Customer").is_some());
    assert!(ws.entry("a.Customer1").is_none());
    assert_eq!(ws.builder.index().len(), 3);
}

#[test]
fn test_removing_dependency_unresolves_reference() {
    let mut ws = two_packages(WorkspaceConfig::default());
    assert!(ws.target_of("/ws/b/orders.cm", "parent").is_some());

    ws.manifest("/ws/b", "b", &[]);
    let report = ws.change(&["/ws/b/package.json"]);
    assert!(report.linked.contains(&loc("/ws/b/orders.cm")));
    assert_eq!(ws.target_of("/ws/b/orders.cm", "parent"), None);

    // The element still exists; only visibility changed
    assert!(ws.entry("a.Customer").is_some());

    ws.manifest("/ws/b", "b", &[("a", "*")]);
    ws.change(&["/ws/b/package.json"]);
    assert_eq!(ws.target_of("/ws/b/orders.cm", "parent").as_deref(), Some("a.Customer"));
}

#[test]
fn test_root_collision_in_one_package_is_suffixed() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/one.cm", CUSTOMER)
        .file("/ws/a/two.cm", CUSTOMER);
    ws.build();
    assert_eq!(ws.entry("a.Customer").unwrap().location, loc("/ws/a/one.cm"));
    let renamed = ws.entry("a.Customer1").unwrap();
    assert_eq!(renamed.location, loc("/ws/a/two.cm"));
    assert!(ws.entry("a.Customer1.Name").is_some());
}

#[test]
fn test_root_named_like_package_gets_bare_id() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/sales", "sales", &[])
        .file("/ws/sales/sales.cm", "entity:\n    id: sales\n    attributes:\n      - id: Id\n");
    ws.build();
    let entry = ws.entry("sales").unwrap();
    assert_eq!(entry.kind, ElementKind::Entity);
    assert!(ws.entry("sales.sales").is_none());
    assert!(ws.entry("sales.sales.Id").is_some());
}

#[test]
fn test_changing_entity_recomputes_diagram_implicit_members() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/customer.cm", CUSTOMER)
        .file("/ws/a/order.cm", ORDER)
        .file("/ws/a/orders.cm", ORDERS)
        .file("/ws/a/overview.cm", DIAGRAM);
    ws.build();

    let members = |ws: &TestWorkspace| -> Vec<String> {
        let node = ElementPath::root().child("nodes", 0);
        ws.builder
            .analysis()
            .implicit_members(&loc("/ws/a/overview.cm"))
            .iter()
            .filter(|m| m.owner == node)
            .map(|m| m.member.local_id.to_string())
            .collect()
    };
    assert_eq!(members(&ws), vec!["Id", "Name"]);

    ws.file(
        "/ws/a/customer.cm",
        "entity:\n    id: Customer\n    attributes:\n      - id: Id\n      - id: Name\n      - id: Email\n",
    );
    let report = ws.change(&["/ws/a/customer.cm"]);
    assert!(report.linked.contains(&loc("/ws/a/overview.cm")));
    assert!(report.linked.contains(&loc("/ws/a/orders.cm")));
    assert_eq!(members(&ws), vec!["Id", "Name", "Email"]);
}

#[test]
fn test_new_same_package_element_shadows_dependency() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/customer.cm", CUSTOMER)
        .manifest("/ws/b", "b", &[("a", "*")])
        .file("/ws/b/orders.cm", ORDERS)
        .manifest("/ws/c", "c", &[])
        .file("/ws/c/order.cm", ORDER);
    ws.build();
    assert_eq!(ws.target_of("/ws/b/orders.cm", "parent").as_deref(), Some("a.Customer"));

    ws.file("/ws/b/customer.cm", CUSTOMER);
    let report = ws.change(&["/ws/b/customer.cm"]);
    assert!(report.linked.contains(&loc("/ws/b/orders.cm")));
    assert!(!report.linked.contains(&loc("/ws/c/order.cm")));
    assert_eq!(ws.target_of("/ws/b/orders.cm", "parent").as_deref(), Some("b.Customer"));

    // Removing the shadowing element falls back to the dependency
    let report = ws.delete(&["/ws/b/customer.cm"]);
    assert!(report.linked.contains(&loc("/ws/b/orders.cm")));
    assert_eq!(ws.target_of("/ws/b/orders.cm", "parent").as_deref(), Some("a.Customer"));
}

#[test]
fn test_unresolved_reference_heals_when_target_appears() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/orders.cm", ORDERS)
        .file("/ws/a/customer.cm", CUSTOMER);
    ws.build();
    assert_eq!(ws.target_of("/ws/a/orders.cm", "child"), None);
    assert!(ws.codes("/ws/a/orders.cm").contains(&codes::UNDEFINED_REFERENCE.to_string()));

    ws.file("/ws/a/order.cm", ORDER);
    ws.change(&["/ws/a/order.cm"]);
    assert_eq!(ws.target_of("/ws/a/orders.cm", "child").as_deref(), Some("a.Order"));
    assert!(ws.codes("/ws/a/orders.cm").is_empty());
}

#[test]
fn test_syntax_errors_do_not_block_siblings() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/broken.cm", "entity:\n    id: Broken\n  oops: 1\n")
        .file("/ws/a/customer.cm", CUSTOMER);
    let report = ws.build();
    assert_eq!(report.validated.len(), 2);
    assert!(ws.codes("/ws/a/broken.cm").contains(&codes::INVALID_INDENTATION.to_string()));
    assert!(ws.codes("/ws/a/customer.cm").is_empty());
    assert!(ws.entry("a.Customer").is_some());
}

#[test]
fn test_vanished_file_reported_as_changed_is_deleted() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[]).file("/ws/a/customer.cm", CUSTOMER);
    ws.build();
    ws.fs.remove("/ws/a/customer.cm");
    let report = ws.change(&["/ws/a/customer.cm"]);
    assert_eq!(report.deleted, vec![loc("/ws/a/customer.cm")]);
    assert!(ws.entry("a.Customer").is_none());
}
