//! Shared fixtures for workspace tests.

#![allow(dead_code)]

pub mod workspace;

pub use workspace::{TestWorkspace, loc};

pub const CUSTOMER: &str = "\
entity:
    id: Customer
    attributes:
      - id: Id
      - id: Name
";

pub const ORDER: &str = "\
entity:
    id: Order
    attributes:
      - id: CustomerId
";

pub const ORDERS: &str = "\
relationship:
    id: Orders
    parent: Customer
    child: Order
    attributes:
      - parent: Id
        child: CustomerId
";

pub const DIAGRAM: &str = "\
diagram:
    id: Overview
    nodes:
      - id: CustomerNode
        entity: Customer
      - id: OrderNode
        entity: Order
    edges:
      - id: OrdersEdge
        relationship: Orders
        sourceNode: CustomerNode
        targetNode: OrderNode
";

/// A manifest for package `name` depending on `deps` (name, version).
pub fn manifest(name: &str, version: &str, deps: &[(&str, &str)]) -> String {
    let deps = deps
        .iter()
        .map(|(n, v)| format!("\"{n}\": \"{v}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{ \"name\": \"{name}\", \"version\": \"{version}\", \"dependencies\": {{ {deps} }} }}")
}
