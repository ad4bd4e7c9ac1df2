//! Go-to-definition results.

use std::sync::Arc;

use crate::base::{Location, Span, TextRange};
use crate::syntax::ElementKind;

/// Result of a go-to-definition request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GotoResult {
    pub targets: Vec<GotoTarget>,
}

impl GotoResult {
    /// Create an empty result (no targets found).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(target: GotoTarget) -> Self {
        Self {
            targets: vec![target],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// A definition to jump to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GotoTarget {
    pub location: Location,
    /// The declared id if there is one, otherwise the whole element.
    pub range: TextRange,
    /// `range` as 0-indexed lines and columns.
    pub span: Span,
    pub kind: ElementKind,
    pub global_id: Arc<str>,
}
