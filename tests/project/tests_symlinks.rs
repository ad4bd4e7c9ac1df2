//! Locations reached through links map to one unit.

use tessera::Location;
use tessera::project::{WorkspaceBuilder, WorkspaceConfig};

use crate::helpers::{CUSTOMER, ORDERS, TestWorkspace, loc, manifest};

#[test]
fn test_aliased_package_is_tracked_at_its_real_location() {
    let mut ws = TestWorkspace::new();
    ws.manifest("/ws/b", "b", &[("a", "*")])
        .file("/ws/b/orders.cm", ORDERS)
        .file("/shared/a/package.json", &manifest("a", "1.0.0", &[]))
        .file("/shared/a/customer.cm", CUSTOMER);
    ws.fs.alias("/ws/linked", "/shared/a");

    ws.builder
        .update([loc("/ws"), loc("/ws/linked")], [])
        .unwrap();
    assert_eq!(ws.builder.packages().by_name("a").unwrap().root, loc("/shared/a"));
    assert!(ws.builder.documents().contains(&loc("/shared/a/customer.cm")));
    assert!(!ws.builder.documents().contains(&loc("/ws/linked/customer.cm")));
    assert_eq!(ws.target_of("/ws/b/orders.cm", "parent").as_deref(), Some("a.Customer"));

    // An edit reported through the alias updates the same unit
    ws.file("/shared/a/customer.cm", "entity:\n    id: Customer\n");
    let report = ws.change(&["/ws/linked/customer.cm"]);
    assert_eq!(report.parsed, vec![loc("/shared/a/customer.cm")]);
    assert_eq!(ws.builder.index().entries_in_package("a").count(), 1);
}

#[test]
fn test_deleting_through_alias() {
    let mut ws = TestWorkspace::new();
    ws.file("/shared/a/package.json", &manifest("a", "1.0.0", &[]))
        .file("/shared/a/customer.cm", CUSTOMER);
    ws.fs.alias("/ws/linked", "/shared/a");
    ws.change(&["/ws/linked"]);
    assert!(ws.entry("a.Customer").is_some());

    ws.fs.remove("/shared/a/customer.cm");
    let report = ws
        .builder
        .update([], [loc("/ws/linked/customer.cm")])
        .unwrap();
    assert_eq!(report.deleted, vec![loc("/shared/a/customer.cm")]);
    assert!(ws.entry("a.Customer").is_none());
}

#[cfg(unix)]
#[test]
fn test_os_symlinked_directory_yields_one_unit() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    let root = std::fs::canonicalize(dir.path()).unwrap();
    let package = root.join("ws/a");
    std::fs::create_dir_all(package.join("model")).unwrap();
    std::fs::write(package.join("package.json"), manifest("a", "1.0.0", &[])).unwrap();
    std::fs::write(package.join("model/customer.cm"), CUSTOMER).unwrap();
    symlink(package.join("model"), package.join("link")).unwrap();

    let mut builder = WorkspaceBuilder::with_os_file_system(WorkspaceConfig::default());
    let report = builder
        .update([Location::from_path(&root.join("ws"))], [])
        .unwrap();

    let real = Location::from_path(&package.join("model/customer.cm"));
    assert_eq!(report.validated, vec![real.clone()]);
    assert_eq!(builder.documents().len(), 2);
    assert!(builder.index().contains("a.Customer"));
    assert!(!builder.index().contains("a.Customer1"));

    let report = builder
        .update([Location::from_path(&package.join("link/customer.cm"))], [])
        .unwrap();
    assert_eq!(report.parsed, vec![real]);
    assert_eq!(builder.documents().len(), 2);
}

#[cfg(unix)]
#[test]
fn test_os_deleted_file_reported_through_symlink() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    let root = std::fs::canonicalize(dir.path()).unwrap();
    let real = root.join("real/a");
    std::fs::create_dir_all(&real).unwrap();
    std::fs::write(real.join("package.json"), manifest("a", "1.0.0", &[])).unwrap();
    std::fs::write(real.join("customer.cm"), CUSTOMER).unwrap();
    symlink(root.join("real"), root.join("link")).unwrap();

    let mut builder = WorkspaceBuilder::with_os_file_system(WorkspaceConfig::default());
    builder
        .update([Location::from_path(&root.join("link"))], [])
        .unwrap();
    assert!(builder.index().contains("a.Customer"));

    std::fs::remove_file(real.join("customer.cm")).unwrap();
    let report = builder
        .update([], [Location::from_path(&root.join("link/a/customer.cm"))])
        .unwrap();
    assert_eq!(report.deleted, vec![Location::from_path(&real.join("customer.cm"))]);
    assert!(!builder.index().contains("a.Customer"));
    assert_eq!(builder.documents().len(), 1);
}
