//! Analysis: read-only snapshot of a built workspace.
//!
//! [`crate::project::WorkspaceBuilder`] owns all mutable state; `analysis()`
//! hands out an `Analysis` borrowing it, so every query in one snapshot sees
//! the same index.
//!
//! ## Usage
//!
//! ```ignore
//! let mut builder = WorkspaceBuilder::with_os_file_system(WorkspaceConfig::default());
//! builder.update([Location::new("/ws")], [])?;
//!
//! let analysis = builder.analysis();
//! let customer = analysis.get_element_by_id("sales.Customer", Some(ElementKind::Entity));
//! let target = analysis.goto_definition(&location, line, col);
//! ```

use crate::base::{LineCol, LineIndex, Location, TextSize};
use crate::hir::{
    Diagnostic, DependencyScope, GlobalIndex, ImplicitMember, IndexEntry, LinkedReference, Linker,
    Package, PackageGraph,
};
use crate::project::{DocumentStore, SourceUnit};
use crate::syntax::{Element, ElementKind, ElementPath};

use super::completion::{CompletionItem, completions, completions_at};
use super::goto::{GotoResult, GotoTarget};

/// An immutable snapshot of the workspace.
#[derive(Clone, Copy)]
pub struct Analysis<'a> {
    documents: &'a DocumentStore,
    index: &'a GlobalIndex,
    packages: &'a PackageGraph,
    scope: DependencyScope,
}

impl<'a> Analysis<'a> {
    pub fn new(
        documents: &'a DocumentStore,
        index: &'a GlobalIndex,
        packages: &'a PackageGraph,
        scope: DependencyScope,
    ) -> Self {
        Self {
            documents,
            index,
            packages,
            scope,
        }
    }

    pub fn index(&self) -> &'a GlobalIndex {
        self.index
    }

    pub fn packages(&self) -> &'a PackageGraph {
        self.packages
    }

    pub fn documents(&self) -> &'a DocumentStore {
        self.documents
    }

    pub fn linker(&self) -> Linker<'a> {
        Linker::new(self.index, self.packages, self.scope)
    }

    pub fn unit(&self, location: &Location) -> Option<&'a SourceUnit> {
        self.documents.get(location)
    }

    // ==================== Index queries ====================

    /// Look up an element by global id, optionally requiring a kind.
    pub fn get_element_by_id(&self, global_id: &str, kind: Option<ElementKind>) -> Option<&'a IndexEntry> {
        self.index.get_element_by_id(global_id, kind)
    }

    /// The live element an index entry points at, or `None` if its unit is
    /// gone or no longer has an element at that path.
    pub fn resolve_element(&self, entry: &IndexEntry) -> Option<&'a Element> {
        self.resolve_semantic_element(&entry.location)?
            .walk(&entry.path)
    }

    /// The root element of the unit at `location`.
    pub fn resolve_semantic_element(&self, location: &Location) -> Option<&'a Element> {
        self.unit(location)?.document.root.as_ref()
    }

    // ==================== Per-unit queries ====================

    pub fn diagnostics(&self, location: &Location) -> &'a [Diagnostic] {
        self.unit(location)
            .map(|unit| unit.diagnostics.as_slice())
            .unwrap_or_default()
    }

    /// Linked references of a unit, in document order.
    pub fn references(&self, location: &Location) -> &'a [LinkedReference] {
        self.unit(location)
            .map(|unit| unit.links.references.as_slice())
            .unwrap_or_default()
    }

    /// Members derived for a unit's diagram nodes and mapping objects.
    pub fn implicit_members(&self, location: &Location) -> &'a [ImplicitMember] {
        self.unit(location)
            .map(|unit| unit.links.implicit.as_slice())
            .unwrap_or_default()
    }

    pub fn package_of(&self, location: &Location) -> Option<&'a Package> {
        self.packages.package_for(location)
    }

    /// Every linked reference, across units, whose target is `global_id`.
    pub fn referrers(&self, global_id: &str) -> Vec<(&'a Location, &'a LinkedReference)> {
        self.documents
            .model_units()
            .flat_map(|unit| {
                unit.links
                    .references
                    .iter()
                    .filter(move |r| r.target().is_some_and(|e| &*e.global_id == global_id))
                    .map(move |r| (&unit.location, r))
            })
            .collect()
    }

    // ==================== Position queries ====================

    fn offset(&self, location: &Location, line: u32, col: u32) -> Option<(&'a SourceUnit, TextSize)> {
        let unit = self.unit(location)?;
        let offset = unit.line_index.offset(LineCol::new(line, col))?;
        Some((unit, offset))
    }

    /// Deepest element whose range contains the position (0-indexed).
    pub fn element_at(&self, location: &Location, line: u32, col: u32) -> Option<(ElementPath, &'a Element)> {
        let (unit, offset) = self.offset(location, line, col)?;
        let root = unit.document.root.as_ref()?;
        root.descendants()
            .into_iter()
            .filter(|(_, element)| element.range.contains_inclusive(offset))
            .max_by_key(|(path, _)| path.steps().len())
    }

    /// Where the reference at the position points.
    pub fn goto_definition(&self, location: &Location, line: u32, col: u32) -> GotoResult {
        let Some((unit, offset)) = self.offset(location, line, col) else {
            return GotoResult::empty();
        };
        let Some(entry) = unit
            .links
            .references
            .iter()
            .find(|r| r.range.contains_inclusive(offset))
            .and_then(LinkedReference::target)
        else {
            return GotoResult::empty();
        };
        match self.goto_target(entry) {
            Some(target) => GotoResult::single(target),
            None => GotoResult::empty(),
        }
    }

    fn goto_target(&self, entry: &IndexEntry) -> Option<GotoTarget> {
        let unit = self.unit(&entry.location)?;
        let element = self.resolve_element(entry)?;
        let range = element.id_range.unwrap_or(element.range);
        Some(GotoTarget {
            location: entry.location.clone(),
            range,
            span: unit.line_index.span(range),
            kind: entry.kind,
            global_id: entry.global_id.clone(),
        })
    }

    /// Completion candidates for `property` on the element at `path`.
    pub fn completions(&self, location: &Location, path: &ElementPath, property: &str) -> Vec<CompletionItem> {
        completions(self, location, path, property)
    }

    /// Completion for the reference being typed at `(line, col)` of `text`,
    /// the unsaved buffer contents of the unit at `location`.
    pub fn completions_at(&self, location: &Location, text: &str, line: u32, col: u32) -> Vec<CompletionItem> {
        let Some(offset) = LineIndex::new(text).offset(LineCol::new(line, col)) else {
            return Vec::new();
        };
        completions_at(self, location, text, offset)
    }
}
