//! # tessera-base
//!
//! Core library for the Tessera modeling language: indentation-aware lexing,
//! incremental workspace building, a global index and cross-package linking.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide       → Read-only queries (lookup, goto-def, completion)
//!   ↓
//! project   → Workspace builder, document store, packages on disk
//!   ↓
//! hir       → Identifiers, global index, package graph, linker
//!   ↓
//! syntax    → Element tree and schema, ParsedDocument
//!   ↓
//! parser    → Logos lexer, indentation, recursive-descent parser
//!   ↓
//! base      → Primitives (Location, LineIndex, TextRange)
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → syntax → hir → project → ide)
// ============================================================================

/// Foundation types: Location, LineIndex, TextRange
pub mod base;

/// Parser: Logos lexer, indent stack, recursive-descent parser
pub mod parser;

/// Syntax: element tree, structural schema, parsed documents
pub mod syntax;

/// High-level IR: identifiers, global index, packages, linking
pub mod hir;

/// Project management: workspace builder, document store, file system
pub mod project;

/// IDE features: element lookup, goto-definition, completion
pub mod ide;

// Re-export foundation types
pub use base::{LineCol, LineIndex, Location, Position, Span, TextRange, TextSize};

// Re-export the main entry points
pub use ide::Analysis;
pub use project::{BuildReport, WorkspaceBuilder, WorkspaceConfig, WorkspaceError};
