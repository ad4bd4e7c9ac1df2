//! Source units and the document store.
//!
//! A [`SourceUnit`] is the in-memory form of one tracked file: its text, the
//! parsed document, the links computed for it and its diagnostics, plus a
//! [`LifecycleState`] recording how far the current rebuild got. Units are
//! replaced wholesale on every re-parse.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::base::{LineIndex, Location};
use crate::hir::{Diagnostic, LinkResult, PackageManifest};
use crate::syntax::ParsedDocument;

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Rebuild progress of a unit. Ordered: each state implies all earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Unbuilt,
    Parsed,
    IndexedContent,
    Linked,
    Validated,
}

impl LifecycleState {
    /// The state that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Unbuilt => Some(Self::Parsed),
            Self::Parsed => Some(Self::IndexedContent),
            Self::IndexedContent => Some(Self::Linked),
            Self::Linked => Some(Self::Validated),
            Self::Validated => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unbuilt => "unbuilt",
            Self::Parsed => "parsed",
            Self::IndexedContent => "indexed",
            Self::Linked => "linked",
            Self::Validated => "validated",
        };
        f.write_str(name)
    }
}

/// An illegal lifecycle transition. Indicates a builder bug, not bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("{location}: cannot advance from {from} to {to}")]
    Skip {
        location: Location,
        from: LifecycleState,
        to: LifecycleState,
    },
    #[error("{location}: cannot reset from {from} up to {to}")]
    Upward {
        location: Location,
        from: LifecycleState,
        to: LifecycleState,
    },
}

// ============================================================================
// SOURCE UNIT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Model,
    /// A package manifest: tracked for dependency bookkeeping, never
    /// parsed into the model and never validated.
    Manifest,
}

#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub location: Location,
    pub kind: UnitKind,
    pub text: String,
    pub line_index: LineIndex,
    pub document: ParsedDocument,
    /// The parsed manifest, for manifest units that are well formed.
    pub manifest: Option<PackageManifest>,
    pub links: LinkResult,
    pub diagnostics: Vec<Diagnostic>,
    state: LifecycleState,
}

impl SourceUnit {
    pub fn new(location: Location, kind: UnitKind, text: String) -> Self {
        Self {
            location,
            kind,
            line_index: LineIndex::new(&text),
            text,
            document: ParsedDocument::default(),
            manifest: None,
            links: LinkResult::default(),
            diagnostics: Vec::new(),
            state: LifecycleState::Unbuilt,
        }
    }

    /// A fresh model unit holding an already parsed document.
    pub fn parsed(location: Location, text: String, document: ParsedDocument) -> Self {
        Self {
            document,
            state: LifecycleState::Parsed,
            ..Self::new(location, UnitKind::Model, text)
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_manifest(&self) -> bool {
        self.kind == UnitKind::Manifest
    }

    /// Move one step forward. Skipping a stage is an error.
    pub fn advance(&mut self, to: LifecycleState) -> Result<(), LifecycleError> {
        if self.state.next() != Some(to) {
            return Err(LifecycleError::Skip {
                location: self.location.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Force the state down to `to` (or leave it where it is).
    pub fn reset_to(&mut self, to: LifecycleState) -> Result<(), LifecycleError> {
        if to > self.state {
            return Err(LifecycleError::Upward {
                location: self.location.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Drop the links computed for this unit.
    ///
    /// Units whose root holds implicit substructure fall back to
    /// [`LifecycleState::IndexedContent`] so the substructure is recomputed.
    /// Returns whether the state was forced down.
    pub fn unlink(&mut self) -> bool {
        self.links = LinkResult::default();
        let implicit = self
            .document
            .root
            .as_ref()
            .is_some_and(|root| root.kind.has_implicit_substructure());
        if implicit && self.state > LifecycleState::IndexedContent {
            self.state = LifecycleState::IndexedContent;
            return true;
        }
        false
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

// ============================================================================
// DOCUMENT STORE
// ============================================================================

/// Every tracked unit, keyed by canonical location.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    units: BTreeMap<Location, SourceUnit>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.units.contains_key(location)
    }

    pub fn get(&self, location: &Location) -> Option<&SourceUnit> {
        self.units.get(location)
    }

    pub fn get_mut(&mut self, location: &Location) -> Option<&mut SourceUnit> {
        self.units.get_mut(location)
    }

    /// Insert or replace a unit. Returns the replaced unit.
    pub fn insert(&mut self, unit: SourceUnit) -> Option<SourceUnit> {
        self.units.insert(unit.location.clone(), unit)
    }

    pub fn remove(&mut self, location: &Location) -> Option<SourceUnit> {
        self.units.remove(location)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceUnit> {
        self.units.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SourceUnit> {
        self.units.values_mut()
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.units.keys()
    }

    pub fn model_units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.iter().filter(|unit| unit.kind == UnitKind::Model)
    }

    /// Tracked locations equal to `dir` or below it.
    pub fn locations_within(&self, dir: &Location) -> Vec<Location> {
        self.units
            .keys()
            .filter(|location| location.is_within(dir))
            .cloned()
            .collect()
    }
}

// ============================================================================
// TEXT BUFFERS
// ============================================================================

/// Open-editor overlays. Buffer text takes precedence over the file system.
#[derive(Debug, Clone, Default)]
pub struct TextBuffers {
    buffers: FxHashMap<Location, String>,
}

impl TextBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, location: Location, text: String) {
        tracing::debug!("[BUILD] opened buffer for {}", location);
        self.buffers.insert(location, text);
    }

    /// Replace the text of an open buffer. Returns `false` if it is not open.
    pub fn change(&mut self, location: &Location, text: String) -> bool {
        match self.buffers.get_mut(location) {
            Some(buffer) => {
                *buffer = text;
                true
            }
            None => false,
        }
    }

    pub fn close(&mut self, location: &Location) -> bool {
        self.buffers.remove(location).is_some()
    }

    pub fn get(&self, location: &Location) -> Option<&str> {
        self.buffers.get(location).map(String::as_str)
    }

    pub fn is_open(&self, location: &Location) -> bool {
        self.buffers.contains_key(location)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
