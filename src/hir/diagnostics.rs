//! Diagnostics: error reporting attached to source units.
//!
//! User-input problems (lexical, syntactic, linking, package) are never
//! returned as `Err`: they become [`Diagnostic`]s on the unit they concern.

use std::sync::Arc;

use rowan::{TextRange, TextSize};
use serde::{Deserialize, Serialize};

use super::ids::is_valid_id;
use super::resolve::LinkedReference;
use crate::parser::{LexError, SyntaxError};
use crate::syntax::{Element, ParsedDocument};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// The stage that produced a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    Lexical,
    Syntactic,
    Linking,
    Validation,
    Package,
}

/// A diagnostic message anchored at a byte range of its unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub range: TextRange,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Error/warning code (e.g., "E0001").
    pub code: Option<Arc<str>>,
    pub message: Arc<str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(kind: DiagnosticKind, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            kind,
            code: None,
            message: message.into(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(kind: DiagnosticKind, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(kind, range, message)
        }
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn from_lex_error(error: &LexError) -> Self {
        Self::error(DiagnosticKind::Lexical, error.range, error.message.as_str())
            .with_code(codes::INVALID_INDENTATION)
    }

    pub fn from_syntax_error(error: &SyntaxError) -> Self {
        Self::error(DiagnosticKind::Syntactic, error.range, error.message.as_str())
            .with_code(codes::SYNTAX_ERROR)
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Standard diagnostic codes.
///
/// ## Error Code Ranges
///
/// - **E0001-E0099**: Semantic errors (resolution, identifiers, packages)
/// - **E01xx**: Lexical errors
/// - **E02xx**: Structural (syntax) errors
/// - **W0001-W0099**: Warnings
pub mod codes {
    /// Undefined reference (name not found or not visible).
    pub const UNDEFINED_REFERENCE: &str = "E0001";
    /// Missing required element (a root without an id).
    pub const MISSING_REQUIRED: &str = "E0005";
    /// Circular package dependency.
    pub const CIRCULAR_DEPENDENCY: &str = "E0007";
    /// Declared id outside the identifier charset.
    pub const INVALID_IDENTIFIER: &str = "E0015";
    /// Manifest that is not valid JSON or lacks a name.
    pub const MALFORMED_MANIFEST: &str = "E0016";

    /// Dedent to a column that was never opened.
    pub const INVALID_INDENTATION: &str = "E0105";

    /// Parser error.
    pub const SYNTAX_ERROR: &str = "E0201";

    /// Dependency on a package that is not in the workspace.
    pub const UNKNOWN_DEPENDENCY: &str = "W0004";
    /// Dependency whose version requirement the workspace package does not meet.
    pub const VERSION_MISMATCH: &str = "W0005";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during validation.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// Finish collecting, ordered by position.
    pub fn finish(mut self) -> Vec<Diagnostic> {
        self.diagnostics
            .sort_by_key(|d| (d.range.start(), d.range.end()));
        self.diagnostics
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Validate a linked model unit.
///
/// Reports the unit's lexical and syntactic errors, unresolved references,
/// a missing root id and declared ids outside the identifier charset.
pub fn validate_unit(document: &ParsedDocument, links: &[LinkedReference]) -> Vec<Diagnostic> {
    let mut collector = DiagnosticCollector::new();
    collector.extend(document.lex_errors.iter().map(Diagnostic::from_lex_error));
    collector.extend(document.syntax_errors.iter().map(Diagnostic::from_syntax_error));

    if let Some(root) = &document.root {
        check_ids(root, &mut collector);
    }

    for link in links.iter().filter(|l| !l.is_resolved()) {
        collector.add(
            Diagnostic::error(
                DiagnosticKind::Linking,
                link.range,
                format!(
                    "could not resolve {} reference `{}`",
                    link.expected, link.text
                ),
            )
            .with_code(codes::UNDEFINED_REFERENCE),
        );
    }

    collector.finish()
}

fn check_ids(root: &Element, collector: &mut DiagnosticCollector) {
    if root.id.is_none() {
        let range = TextRange::at(root.range.start(), TextSize::new(0));
        collector.add(
            Diagnostic::error(
                DiagnosticKind::Validation,
                range,
                format!("{} has no id and cannot be referenced", root.kind),
            )
            .with_code(codes::MISSING_REQUIRED),
        );
    }
    root.visit(&mut |_, element| {
        let (Some(id), Some(range)) = (&element.id, element.id_range) else {
            return;
        };
        if !is_valid_id(id) {
            collector.add(
                Diagnostic::error(
                    DiagnosticKind::Validation,
                    range,
                    format!("`{id}` is not a valid identifier"),
                )
                .with_code(codes::INVALID_IDENTIFIER),
            );
        }
    });
}
