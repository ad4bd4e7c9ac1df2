//! High-level IR (HIR): identifiers, the global index, and linking.
//!
//! ## Key Types
//!
//! - [`IdentifierProvider`] - local ids and qualified names for one tree
//! - [`GlobalIndex`] - workspace-wide map from global id to element location
//! - [`PackageGraph`] - packages, ownership by root, dependency visibility
//! - [`Linker`] - resolves references under package-visibility rules
//! - [`Diagnostic`] - problems attached to source units
//!
//! ## Pass Order
//!
//! ```text
//! ParsedDocument (per unit)
//!     │
//!     ▼
//! UnitPlan::new            ← ids for one unit (pure, parallel)
//!     │
//!     ▼
//! GlobalIndex::insert_unit ← global ids, collisions settled (sequential)
//!     │
//!     ▼
//! Linker::link             ← references + implicit members (pure, parallel)
//!     │
//!     ▼
//! validate_unit            ← diagnostics
//! ```

mod diagnostics;
mod ids;
mod index;
mod packages;
mod resolve;

pub use diagnostics::{
    Diagnostic, DiagnosticCollector, DiagnosticKind, Severity, codes, validate_unit,
};
pub use ids::{
    IdError, IdentifierProvider, LocalName, find_next_global_id, find_next_id, find_next_id_by,
    global_id, is_synthetic_id, is_valid_id, package_id, qualified_name_of, synthetic_id,
};
pub use index::{GlobalIndex, IndexEntry, UnitPlan};
pub use packages::{
    Dependency, DependencyScope, Package, PackageGraph, PackageManifest, PackageProblem,
    version_satisfies,
};
pub use resolve::{
    ImplicitMember, LinkResult, LinkedReference, Linker, Resolution, ScopeCandidate,
};
