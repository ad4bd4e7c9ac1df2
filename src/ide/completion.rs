//! Completion suggestions for reference properties.

use std::sync::Arc;

use crate::base::constants::COMPLETION_MARKER;
use crate::base::{Location, TextSize};
use crate::syntax::{Element, ElementKind, ElementPath, ParsedDocument};

use super::analysis::Analysis;

/// A completion suggestion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionItem {
    /// The text to insert; resolves to `global_id` from the query position.
    pub label: Arc<str>,
    pub global_id: Arc<str>,
    pub kind: ElementKind,
    /// Detail text (shown after label).
    pub detail: Option<Arc<str>>,
    /// Sort priority (lower = higher priority).
    pub sort_priority: u32,
}

impl CompletionItem {
    pub fn new(label: impl Into<Arc<str>>, global_id: impl Into<Arc<str>>, kind: ElementKind) -> Self {
        Self {
            label: label.into(),
            global_id: global_id.into(),
            kind,
            detail: None,
            sort_priority: 100,
        }
    }

    /// Set the detail text.
    pub fn with_detail(mut self, detail: impl Into<Arc<str>>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the sort priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.sort_priority = priority;
        self
    }
}

/// Candidates for `property` on the element at `path` of the unit at `location`.
///
/// Same-file candidates sort first, then the unit's own package, then
/// dependencies. Never mutates the index.
pub fn completions(
    analysis: &Analysis<'_>,
    location: &Location,
    path: &ElementPath,
    property: &str,
) -> Vec<CompletionItem> {
    let Some(root) = analysis.resolve_semantic_element(location) else {
        return Vec::new();
    };
    items(analysis, location, root, path, property, "")
}

/// Candidates for the reference being typed at `offset` of `text`, the live
/// buffer contents of the unit at `location`.
///
/// Only the text before the cursor is parsed, so unterminated blocks and
/// lists (`superEntities: [Cu`) still complete. Candidates are filtered by
/// the partial reference already typed.
pub fn completions_at(
    analysis: &Analysis<'_>,
    location: &Location,
    text: &str,
    offset: TextSize,
) -> Vec<CompletionItem> {
    let Some(prefix) = text.get(..usize::from(offset)) else {
        return Vec::new();
    };
    let document = ParsedDocument::parse_for_completion(&format!("{prefix}{COMPLETION_MARKER}"));
    let Some(root) = document.root.as_ref() else {
        return Vec::new();
    };
    let marker_end = offset + TextSize::of(COMPLETION_MARKER);
    let site = root.descendants().into_iter().find_map(|(path, element)| {
        element
            .references
            .iter()
            .find(|site| site.range.end() == marker_end)
            .map(|site| (path, site))
    });
    let Some((path, site)) = site else {
        tracing::trace!("[COMPLETION] no reference at {}:{:?}", location, offset);
        return Vec::new();
    };
    let Some(typed) = prefix.get(usize::from(site.range.start())..) else {
        return Vec::new();
    };
    items(analysis, location, root, &path, &site.property, typed)
}

fn items(
    analysis: &Analysis<'_>,
    location: &Location,
    root: &Element,
    path: &ElementPath,
    property: &str,
    typed: &str,
) -> Vec<CompletionItem> {
    let mut items: Vec<CompletionItem> = analysis
        .linker()
        .scope_candidates(location, root, path, property)
        .into_iter()
        .filter(|candidate| candidate.label.starts_with(typed))
        .map(|candidate| {
            let entry = candidate.entry;
            CompletionItem::new(candidate.label, entry.global_id.clone(), entry.kind)
                .with_detail(format!("{} in {}", entry.kind, entry.package))
                .with_priority(u32::from(candidate.distance))
        })
        .collect();
    items.sort_by(|a, b| {
        a.sort_priority
            .cmp(&b.sort_priority)
            .then_with(|| a.label.cmp(&b.label))
    });
    items
}
