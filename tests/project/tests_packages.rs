//! Package manifests: visibility, diagnostics, discovery and ownership.

use tessera::hir::{DependencyScope, Severity, codes};
use tessera::project::WorkspaceConfig;

use crate::helpers::{CUSTOMER, TestWorkspace, loc, manifest};

const REFERS_TO_CUSTOMER: &str = "relationship:\n    id: R\n    parent: Customer\n";

fn chain(scope: DependencyScope) -> TestWorkspace {
    let mut ws = TestWorkspace::with_config(WorkspaceConfig::default().with_dependency_scope(scope));
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/customer.cm", CUSTOMER)
        .manifest("/ws/b", "b", &[("a", "*")])
        .manifest("/ws/c", "c", &[("b", "*")])
        .file("/ws/c/r.cm", REFERS_TO_CUSTOMER);
    ws.build();
    ws
}

#[test]
fn test_direct_scope_hides_dependencies_of_dependencies() {
    let ws = chain(DependencyScope::Direct);
    assert_eq!(ws.target_of("/ws/c/r.cm", "parent"), None);
}

#[test]
fn test_transitive_scope_follows_the_graph() {
    let ws = chain(DependencyScope::Transitive);
    assert_eq!(ws.target_of("/ws/c/r.cm", "parent").as_deref(), Some("a.Customer"));
}

#[test]
fn test_fully_qualified_reference_respects_visibility() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/customer.cm", CUSTOMER)
        .manifest("/ws/b", "b", &[])
        .file("/ws/b/r.cm", "relationship:\n    id: R\n    parent: a.Customer\n");
    ws.build();
    assert_eq!(ws.target_of("/ws/b/r.cm", "parent"), None);

    ws.manifest("/ws/b", "b", &[("a", "^1.0.0")]);
    ws.change(&["/ws/b/package.json"]);
    assert_eq!(ws.target_of("/ws/b/r.cm", "parent").as_deref(), Some("a.Customer"));
    assert!(ws.codes("/ws/b/package.json").is_empty());
}

#[test]
fn test_same_local_id_in_two_packages() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/customer.cm", CUSTOMER)
        .manifest("/ws/b", "b", &[("a", "*")])
        .file("/ws/b/customer.cm", CUSTOMER)
        .file("/ws/b/r.cm", REFERS_TO_CUSTOMER);
    ws.build();
    assert!(ws.entry("a.Customer").is_some());
    assert!(ws.entry("b.Customer").is_some());
    // Own package wins over dependencies
    assert_eq!(ws.target_of("/ws/b/r.cm", "parent").as_deref(), Some("b.Customer"));
}

#[test]
fn test_manifest_diagnostics() {
    let mut ws = TestWorkspace::new();
    ws.file("/ws/a/package.json", &manifest("a", "2.0.0", &[("b", "*")]))
        .file("/ws/b/package.json", &manifest("b", "1.0.0", &[("a", "^1.0.0")]))
        .file("/ws/c/package.json", &manifest("c", "1.0.0", &[("ghost", "*")]));
    ws.build();

    let a = ws.codes("/ws/a/package.json");
    assert_eq!(a, vec![codes::CIRCULAR_DEPENDENCY.to_string()]);

    let mut b = ws.codes("/ws/b/package.json");
    b.sort();
    assert_eq!(
        b,
        vec![codes::CIRCULAR_DEPENDENCY.to_string(), codes::VERSION_MISMATCH.to_string()]
    );

    let c = ws.diagnostics("/ws/c/package.json");
    assert_eq!(c.len(), 1);
    assert_eq!(c[0].severity, Severity::Warning);
    assert_eq!(c[0].code.as_deref(), Some(codes::UNKNOWN_DEPENDENCY));
}

#[test]
fn test_new_package_root_is_scanned() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[]).file("/ws/a/customer.cm", CUSTOMER);
    ws.build();

    // Files already on disk before the manifest appears
    ws.file("/ws/b/r.cm", REFERS_TO_CUSTOMER)
        .file("/ws/b/nested/more.cm", "entity:\n    id: More\n")
        .manifest("/ws/b", "b", &[("a", "*")]);
    let report = ws.change(&["/ws/b/package.json"]);
    assert!(report.parsed.contains(&loc("/ws/b/r.cm")));
    assert!(report.parsed.contains(&loc("/ws/b/nested/more.cm")));
    assert_eq!(ws.target_of("/ws/b/r.cm", "parent").as_deref(), Some("a.Customer"));
}

#[test]
fn test_deleting_manifest_drops_units_outside_packages() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[])
        .file("/ws/a/customer.cm", CUSTOMER)
        .manifest("/ws/a/inner", "inner", &[])
        .file("/ws/a/inner/x.cm", "entity:\n    id: X\n");
    ws.build();
    assert_eq!(ws.builder.analysis().package_of(&loc("/ws/a/inner/x.cm")).unwrap().name, "inner");

    // The inner package dissolves into the outer one
    let report = ws.delete(&["/ws/a/inner/package.json"]);
    assert!(report.deleted.contains(&loc("/ws/a/inner/package.json")));
    assert!(ws.entry("a.X").is_some());
    assert!(ws.entry("inner.X").is_none());

    // Without any package the units are dropped
    let report = ws.delete(&["/ws/a/package.json"]);
    assert!(report.deleted.contains(&loc("/ws/a/customer.cm")));
    assert!(report.deleted.contains(&loc("/ws/a/inner/x.cm")));
    assert!(ws.builder.documents().is_empty());
    assert!(ws.builder.index().is_empty());
}

#[test]
fn test_malformed_manifest_removes_package() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/a", "a", &[]).file("/ws/a/customer.cm", CUSTOMER);
    ws.build();

    ws.file("/ws/a/package.json", "{ \"version\": \"1.0.0\" }");
    ws.change(&["/ws/a/package.json"]);
    assert_eq!(ws.codes("/ws/a/package.json"), vec![codes::MALFORMED_MANIFEST.to_string()]);
    assert!(ws.builder.packages().is_empty());
    assert!(!ws.builder.documents().contains(&loc("/ws/a/customer.cm")));
}
