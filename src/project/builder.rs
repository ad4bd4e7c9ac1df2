//! Workspace builder: the single mutation entry point.
//!
//! [`WorkspaceBuilder::update`] takes a batch of changed and deleted
//! locations (files or directories), brings the document store and package
//! graph up to date, then drives every affected unit through
//! parse → index → link → validate.
//!
//! ## Pipeline
//!
//! ```text
//! deleted ──► remove units / packages below directories
//! changed ──► flatten directories, canonicalize
//!                 │
//!                 ▼
//!           manifests ──► package graph (new roots are scanned)
//!                 │
//!                 ▼
//!           parse (rayon or ParseWorker, cancellable)
//!                 │
//!                 ▼
//!           plan ids (parallel) ──► GlobalIndex::insert_unit (sequential)
//!                 │
//!                 ▼
//!           unlink + link (parallel) ──► validate
//! ```

use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio_util::sync::CancellationToken;

use super::config::WorkspaceConfig;
use super::document_store::{
    DocumentStore, LifecycleError, LifecycleState, SourceUnit, TextBuffers, UnitKind,
};
use super::error::WorkspaceError;
use super::file_system::{FileSystemProvider, OsFileSystem};
use super::worker::ParseWorker;
use crate::base::{LineCol, LineIndex, Location, TextRange, TextSize};
use crate::hir::{
    Diagnostic, DiagnosticKind, GlobalIndex, LinkResult, Linker, Package, PackageGraph,
    PackageManifest, UnitPlan, codes, validate_unit,
};
use crate::ide::Analysis;
use crate::syntax::ParsedDocument;

// ============================================================================
// BUILD REPORT
// ============================================================================

/// What one [`WorkspaceBuilder::update`] did, by stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub parsed: Vec<Location>,
    pub indexed: Vec<Location>,
    pub linked: Vec<Location>,
    pub validated: Vec<Location>,
    pub deleted: Vec<Location>,
    /// Parses that were cancelled; these are retried on the next update.
    pub cancelled: Vec<Location>,
}

impl BuildReport {
    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
            && self.indexed.is_empty()
            && self.linked.is_empty()
            && self.validated.is_empty()
            && self.deleted.is_empty()
            && self.cancelled.is_empty()
    }
}

// ============================================================================
// CANCELLATION
// ============================================================================

#[derive(Debug, Default)]
struct CancelState {
    active: FxHashMap<Location, CancellationToken>,
    requested: FxHashSet<Location>,
}

/// Cancellation handles for in-flight parses, shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelRegistry {
    state: Arc<Mutex<CancelState>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the parse of `location`.
    ///
    /// If no parse of `location` is running, the request is kept and the next
    /// parse of that location starts out cancelled. Returns whether a running
    /// parse was cancelled.
    pub fn cancel(&self, location: &Location) -> bool {
        let mut state = self.state.lock();
        match state.active.get(location) {
            Some(token) => {
                token.cancel();
                true
            }
            None => {
                state.requested.insert(location.clone());
                false
            }
        }
    }

    /// Cancel every running parse.
    pub fn cancel_all(&self) {
        for token in self.state.lock().active.values() {
            token.cancel();
        }
    }

    pub fn is_active(&self, location: &Location) -> bool {
        self.state.lock().active.contains_key(location)
    }

    fn begin(&self, location: &Location) -> CancellationToken {
        let mut state = self.state.lock();
        let token = CancellationToken::new();
        if state.requested.remove(location) {
            token.cancel();
        }
        state.active.insert(location.clone(), token.clone());
        token
    }

    fn finish(&self, location: &Location) {
        self.state.lock().active.remove(location);
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Owns the document store, global index and package graph.
pub struct WorkspaceBuilder {
    config: WorkspaceConfig,
    fs: Arc<dyn FileSystemProvider>,
    documents: DocumentStore,
    index: GlobalIndex,
    packages: PackageGraph,
    buffers: TextBuffers,
    cancel: CancelRegistry,
    worker: Option<ParseWorker>,
    /// Locations whose last parse was cancelled.
    pending: BTreeSet<Location>,
}

/// Text of one location to (re)load, or why it could not be read.
enum Loaded {
    Text(String),
    Missing,
    Unreadable,
}

impl WorkspaceBuilder {
    pub fn new(config: WorkspaceConfig, fs: Arc<dyn FileSystemProvider>) -> Self {
        let worker = (config.parse_workers > 0).then(|| ParseWorker::spawn(config.parse_workers));
        Self {
            config,
            fs,
            documents: DocumentStore::new(),
            index: GlobalIndex::new(),
            packages: PackageGraph::new(),
            buffers: TextBuffers::new(),
            cancel: CancelRegistry::new(),
            worker,
            pending: BTreeSet::new(),
        }
    }

    /// A builder over the real file system.
    pub fn with_os_file_system(config: WorkspaceConfig) -> Self {
        Self::new(config, Arc::new(OsFileSystem))
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn index(&self) -> &GlobalIndex {
        &self.index
    }

    pub fn packages(&self) -> &PackageGraph {
        &self.packages
    }

    pub fn buffers(&self) -> &TextBuffers {
        &self.buffers
    }

    pub fn cancel_registry(&self) -> CancelRegistry {
        self.cancel.clone()
    }

    /// Locations waiting to be re-parsed after a cancellation.
    pub fn pending(&self) -> impl Iterator<Item = &Location> {
        self.pending.iter()
    }

    /// A read-only snapshot for queries.
    pub fn analysis(&self) -> Analysis<'_> {
        Analysis::new(
            &self.documents,
            &self.index,
            &self.packages,
            self.config.dependency_scope,
        )
    }

    // ==================== Text buffers ====================

    /// Open an editor buffer for `location` and rebuild it from the buffer text.
    pub fn open_buffer(&mut self, location: Location, text: String) -> Result<BuildReport, WorkspaceError> {
        let location = self.fs.canonicalize(&location);
        self.buffers.open(location.clone(), text);
        self.update([location], [])
    }

    pub fn change_buffer(&mut self, location: &Location, text: String) -> Result<BuildReport, WorkspaceError> {
        let location = self.fs.canonicalize(location);
        if !self.buffers.change(&location, text) {
            return Ok(BuildReport::default());
        }
        self.update([location], [])
    }

    /// Close a buffer; the unit falls back to the file system text.
    pub fn close_buffer(&mut self, location: &Location) -> Result<BuildReport, WorkspaceError> {
        let location = self.fs.canonicalize(location);
        if !self.buffers.close(&location) {
            return Ok(BuildReport::default());
        }
        self.update([location], [])
    }

    // ==================== Update ====================

    /// Apply one batch of file system changes and rebuild what they affect.
    pub fn update(
        &mut self,
        changed: impl IntoIterator<Item = Location>,
        deleted: impl IntoIterator<Item = Location>,
    ) -> Result<BuildReport, WorkspaceError> {
        let mut report = BuildReport::default();
        let mut packages_changed = false;
        // Units whose content is gone or replaced in this batch
        let mut touched: FxHashSet<Location> = FxHashSet::default();

        // 1. Deletions
        for location in deleted {
            let location = self.fs.canonicalize(&location);
            packages_changed |= self.delete(&location, &mut report, &mut touched);
        }

        // 2. Changed locations, directories flattened
        let mut to_load: BTreeSet<Location> = std::mem::take(&mut self.pending);
        for location in changed {
            let location = self.fs.canonicalize(&location);
            if self.fs.is_dir(&location) {
                to_load.extend(self.scan(&location));
            } else if self.config.is_tracked_file(&location) {
                to_load.insert(location);
            }
        }
        tracing::debug!(
            "[BUILD] update: {} locations to load, {} deleted",
            to_load.len(),
            report.deleted.len()
        );

        // 3. Manifests first: they decide which model files belong to the workspace
        let (manifests, models): (Vec<Location>, Vec<Location>) = to_load
            .into_iter()
            .partition(|location| self.config.is_manifest(location));
        let mut models: BTreeSet<Location> = models.into_iter().collect();
        let mut queued: BTreeSet<Location> = manifests.iter().cloned().collect();
        let mut manifest_queue: Vec<Location> = manifests;
        while let Some(location) = manifest_queue.pop() {
            let (changed, scanned) = self.load_manifest(&location, &mut report, &mut touched)?;
            packages_changed |= changed;
            for found in scanned {
                if self.documents.contains(&found) {
                    continue;
                }
                if !self.config.is_manifest(&found) {
                    models.insert(found);
                } else if queued.insert(found.clone()) {
                    manifest_queue.push(found);
                }
            }
        }

        // 4. Package changes invalidate every model unit's ids and links
        if packages_changed {
            tracing::debug!("[BUILD] package graph changed, re-indexing all units");
            self.reset_for_package_change(&mut report, &mut touched)?;
        }

        // 5. Parse
        let models: Vec<Location> = models
            .into_iter()
            .filter(|location| {
                let owned = self.packages.package_for(location).is_some();
                if !owned {
                    tracing::debug!("[BUILD] {} is outside every package, not tracked", location);
                }
                owned
            })
            .collect();
        self.parse(models, &mut report, &mut touched)?;

        // 6. Index
        self.index_parsed(&mut report)?;

        // 7. Link
        self.relink(packages_changed, &touched, &mut report)?;

        // 8. Manifest diagnostics
        if packages_changed || !report.parsed.is_empty() {
            self.refresh_manifest_diagnostics();
        }

        tracing::info!(
            "[BUILD] parsed {}, indexed {}, linked {}, validated {}, deleted {}, cancelled {}",
            report.parsed.len(),
            report.indexed.len(),
            report.linked.len(),
            report.validated.len(),
            report.deleted.len(),
            report.cancelled.len()
        );
        Ok(report)
    }

    /// Tracked-language files below `dir`, canonicalized.
    fn scan(&self, dir: &Location) -> BTreeSet<Location> {
        self.fs
            .walk(dir)
            .into_iter()
            .map(|file| self.fs.canonicalize(&file))
            .filter(|file| self.config.is_tracked_file(file))
            .collect()
    }

    fn read(&self, location: &Location) -> Loaded {
        if let Some(text) = self.buffers.get(location) {
            return Loaded::Text(text.to_string());
        }
        match self.fs.read_to_string(location) {
            Ok(text) => Loaded::Text(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Loaded::Missing,
            Err(e) => {
                tracing::warn!(
                    "{}",
                    WorkspaceError::Io {
                        location: location.clone(),
                        source: e,
                    }
                );
                Loaded::Unreadable
            }
        }
    }

    /// Delete a location, or everything tracked below it when it has no
    /// extension. Returns whether the package graph changed.
    fn delete(
        &mut self,
        location: &Location,
        report: &mut BuildReport,
        touched: &mut FxHashSet<Location>,
    ) -> bool {
        if location.extension().is_some() {
            let was_manifest = self.remove_unit(location, report, touched);
            let removed_package = was_manifest
                && self
                    .packages
                    .by_manifest(location)
                    .is_some_and(|p| p.manifest == *location);
            if removed_package {
                self.packages.remove_manifest(location);
            }
            return removed_package;
        }

        tracing::debug!("[BUILD] treating {} as a deleted directory", location);
        for unit in self.documents.locations_within(location) {
            self.remove_unit(&unit, report, touched);
        }
        let removed = self.packages.remove_within(location);
        for package in &removed {
            tracing::debug!("[BUILD] removed package '{}' at {}", package.name, package.root);
        }
        !removed.is_empty()
    }

    /// Drop a unit with its index entries and buffer. Returns whether it was a manifest.
    fn remove_unit(
        &mut self,
        location: &Location,
        report: &mut BuildReport,
        touched: &mut FxHashSet<Location>,
    ) -> bool {
        self.buffers.close(location);
        self.pending.remove(location);
        self.index.remove_location(location);
        touched.insert(location.clone());
        match self.documents.remove(location) {
            Some(unit) => {
                report.deleted.push(location.clone());
                unit.is_manifest()
            }
            None => self.config.is_manifest(location),
        }
    }

    /// Load one manifest. Returns whether the package graph changed and the
    /// files found when a new package root was scanned.
    fn load_manifest(
        &mut self,
        location: &Location,
        report: &mut BuildReport,
        touched: &mut FxHashSet<Location>,
    ) -> Result<(bool, BTreeSet<Location>), WorkspaceError> {
        let text = match self.read(location) {
            Loaded::Text(text) => text,
            Loaded::Missing => return Ok((self.delete(location, report, touched), BTreeSet::new())),
            Loaded::Unreadable => return Ok((false, BTreeSet::new())),
        };

        let mut unit = SourceUnit::new(location.clone(), UnitKind::Manifest, text);
        let package = match parse_manifest(location, &unit.text) {
            Ok(manifest) => {
                unit.manifest = Some(manifest.clone());
                Package::from_manifest(location, manifest)
            }
            Err(e) => {
                tracing::warn!("[PACKAGES] {}", e);
                None
            }
        };
        walk_to(&mut unit, LifecycleState::Validated)?;
        self.documents.insert(unit);
        report.parsed.push(location.clone());

        let previous = self.packages.by_manifest(location).cloned();
        let mut scanned = BTreeSet::new();
        let changed = match package {
            Some(package) if previous.as_ref() == Some(&package) => false,
            Some(package) => {
                if previous.is_none() {
                    tracing::debug!("[PACKAGES] new package '{}' at {}", package.name, package.root);
                    scanned = self.scan(&package.root);
                }
                self.packages.insert(package);
                true
            }
            None => self.packages.remove_manifest(location).is_some(),
        };
        Ok((changed, scanned))
    }

    /// Drop units no package owns; send the rest back to `Parsed`.
    fn reset_for_package_change(
        &mut self,
        report: &mut BuildReport,
        touched: &mut FxHashSet<Location>,
    ) -> Result<(), WorkspaceError> {
        let orphans: Vec<Location> = self
            .documents
            .model_units()
            .filter(|unit| self.packages.package_for(&unit.location).is_none())
            .map(|unit| unit.location.clone())
            .collect();
        for location in orphans {
            tracing::debug!("[BUILD] {} no longer belongs to a package, dropping", location);
            self.remove_unit(&location, report, touched);
        }
        for unit in self.documents.iter_mut() {
            if unit.kind == UnitKind::Model && unit.state() > LifecycleState::Parsed {
                unit.unlink();
                unit.reset_to(LifecycleState::Parsed)?;
            }
        }
        Ok(())
    }

    fn parse(
        &mut self,
        models: Vec<Location>,
        report: &mut BuildReport,
        touched: &mut FxHashSet<Location>,
    ) -> Result<(), WorkspaceError> {
        let mut jobs = Vec::with_capacity(models.len());
        for location in models {
            match self.read(&location) {
                Loaded::Text(text) => jobs.push((location, text)),
                Loaded::Missing => {
                    tracing::debug!("[BUILD] {} vanished, deleting", location);
                    self.remove_unit(&location, report, touched);
                }
                Loaded::Unreadable => {}
            }
        }
        if jobs.is_empty() {
            return Ok(());
        }

        let mut texts: FxHashMap<Location, String> = FxHashMap::default();
        let tokens: Vec<(Location, String, CancellationToken)> = jobs
            .into_iter()
            .map(|(location, text)| {
                let token = self.cancel.begin(&location);
                texts.insert(location.clone(), text.clone());
                (location, text, token)
            })
            .collect();
        let locations: Vec<Location> = tokens.iter().map(|(l, _, _)| l.clone()).collect();

        let results = match &self.worker {
            Some(worker) => worker.parse_batch(tokens),
            None => Ok(tokens
                .into_par_iter()
                .map(|(location, text, token)| {
                    let document = ParsedDocument::parse_cancellable(&text, &token);
                    (location, document)
                })
                .collect()),
        };
        for location in &locations {
            self.cancel.finish(location);
        }
        let mut results = results?;
        results.sort_by(|a, b| a.0.cmp(&b.0));

        for (location, document) in results {
            let Some(text) = texts.remove(&location) else {
                continue;
            };
            match document {
                Some(document) => {
                    self.index.remove_location(&location);
                    self.documents
                        .insert(SourceUnit::parsed(location.clone(), text, document));
                    touched.insert(location.clone());
                    report.parsed.push(location);
                }
                None => {
                    tracing::debug!("[BUILD] parse of {} cancelled, keeping previous tree", location);
                    self.pending.insert(location.clone());
                    report.cancelled.push(location);
                }
            }
        }
        Ok(())
    }

    /// Index every model unit in `Parsed`.
    fn index_parsed(&mut self, report: &mut BuildReport) -> Result<(), WorkspaceError> {
        let ready: Vec<Location> = self
            .documents
            .model_units()
            .filter(|unit| unit.state() == LifecycleState::Parsed)
            .map(|unit| unit.location.clone())
            .collect();
        if ready.is_empty() {
            return Ok(());
        }
        for location in &ready {
            self.index.remove_location(location);
        }

        let documents = &self.documents;
        let packages = &self.packages;
        let plan_for = |location: &Location| {
            let unit = documents.get(location)?;
            let root = unit.document.root.as_ref()?;
            let package = packages.package_for(location)?;
            match UnitPlan::new(location.clone(), &package.id, root) {
                Ok(plan) => Some(plan),
                Err(e) => {
                    tracing::debug!("[INDEX] {} not indexed: {}", location, e);
                    None
                }
            }
        };
        let plans: Vec<UnitPlan<'_>> = if self.config.parallel {
            ready.par_iter().filter_map(plan_for).collect()
        } else {
            ready.iter().filter_map(plan_for).collect()
        };
        for plan in plans {
            self.index.insert_unit(plan);
        }

        for location in ready {
            if let Some(unit) = self.documents.get_mut(&location) {
                unit.advance(LifecycleState::IndexedContent)?;
                report.indexed.push(location);
            }
        }
        Ok(())
    }

    /// Link and validate every unit that needs it.
    fn relink(
        &mut self,
        packages_changed: bool,
        touched: &FxHashSet<Location>,
        report: &mut BuildReport,
    ) -> Result<(), WorkspaceError> {
        let affected = self.packages_seeing(touched);
        let mut targets: Vec<Location> = Vec::new();
        for unit in self.documents.iter_mut() {
            if unit.kind != UnitKind::Model {
                continue;
            }
            let needs_link = match unit.state() {
                LifecycleState::IndexedContent => true,
                LifecycleState::Linked | LifecycleState::Validated => {
                    packages_changed
                        || self
                            .packages
                            .package_for(&unit.location)
                            .is_some_and(|p| affected.contains(&p.id))
                }
                LifecycleState::Unbuilt | LifecycleState::Parsed => false,
            };
            if needs_link {
                unit.unlink();
                unit.reset_to(LifecycleState::IndexedContent)?;
                targets.push(unit.location.clone());
            }
        }
        if targets.is_empty() {
            return Ok(());
        }

        let linker = Linker::new(&self.index, &self.packages, self.config.dependency_scope);
        let documents = &self.documents;
        let link = |location: &Location| -> (Location, LinkResult) {
            let result = documents
                .get(location)
                .and_then(|unit| unit.document.root.as_ref())
                .map(|root| linker.link(location, root))
                .unwrap_or_default();
            (location.clone(), result)
        };
        let results: Vec<(Location, LinkResult)> = if self.config.parallel {
            targets.par_iter().map(link).collect()
        } else {
            targets.iter().map(link).collect()
        };

        for (location, links) in results {
            let Some(unit) = self.documents.get_mut(&location) else {
                continue;
            };
            unit.links = links;
            unit.advance(LifecycleState::Linked)?;
            report.linked.push(location.clone());

            unit.diagnostics = validate_unit(&unit.document, &unit.links.references);
            unit.advance(LifecycleState::Validated)?;
            report.validated.push(location);
        }
        Ok(())
    }

    /// Packages that can see an index entry of a unit in `touched`: the
    /// packages owning those units and every package depending on them.
    fn packages_seeing(&self, touched: &FxHashSet<Location>) -> FxHashSet<Arc<str>> {
        let changed: FxHashSet<&str> = touched
            .iter()
            .filter_map(|location| self.packages.package_for(location))
            .map(|package| &*package.id)
            .collect();
        if changed.is_empty() {
            return FxHashSet::default();
        }
        let scope = self.config.dependency_scope;
        let affected: FxHashSet<Arc<str>> = self
            .packages
            .iter()
            .filter(|package| {
                changed.contains(&*package.id)
                    || self
                        .packages
                        .visible_from(package, scope)
                        .iter()
                        .any(|dependency| changed.contains(&*dependency.id))
            })
            .map(|package| package.id.clone())
            .collect();
        tracing::trace!("[LINK] entries changed in {:?}, relinking {:?}", changed, affected);
        affected
    }

    /// Recompute manifest diagnostics from the package graph.
    fn refresh_manifest_diagnostics(&mut self) {
        let mut problems: FxHashMap<Location, Vec<_>> = FxHashMap::default();
        for (manifest, problem) in self.packages.problems() {
            problems.entry(manifest).or_default().push(problem);
        }
        for unit in self.documents.iter_mut().filter(|u| u.is_manifest()) {
            let mut diagnostics = Vec::new();
            if unit.manifest.is_none() {
                if let Err(e) = parse_manifest(&unit.location, &unit.text) {
                    diagnostics.push(malformed_manifest(&unit.text, &e));
                }
            }
            if let Some(found) = problems.get(&unit.location) {
                diagnostics.extend(found.iter().map(|p| p.to_diagnostic(&unit.text)));
            }
            unit.diagnostics = diagnostics;
        }
    }
}

/// Step forward one state at a time up to `target`.
fn walk_to(unit: &mut SourceUnit, target: LifecycleState) -> Result<(), LifecycleError> {
    while unit.state() < target {
        let Some(next) = unit.state().next() else {
            break;
        };
        unit.advance(next)?;
    }
    Ok(())
}

fn parse_manifest(location: &Location, text: &str) -> Result<PackageManifest, WorkspaceError> {
    let manifest = PackageManifest::from_json(text).map_err(|source| WorkspaceError::Manifest {
        location: location.clone(),
        source,
    })?;
    if manifest.name.trim().is_empty() {
        let source = <serde_json::Error as serde::de::Error>::custom("package name is empty");
        return Err(WorkspaceError::Manifest {
            location: location.clone(),
            source,
        });
    }
    Ok(manifest)
}

fn malformed_manifest(text: &str, error: &WorkspaceError) -> Diagnostic {
    let offset = match error {
        WorkspaceError::Manifest { source, .. } if source.line() > 0 => {
            let index = LineIndex::new(text);
            index
                .offset(LineCol::from_one_indexed(
                    source.line() as u32,
                    source.column() as u32,
                ))
                .map(|offset| offset.min(TextSize::of(text)))
                .unwrap_or_default()
        }
        _ => TextSize::new(0),
    };
    let message = match error {
        WorkspaceError::Manifest { source, .. } => format!("malformed package manifest: {source}"),
        other => other.to_string(),
    };
    Diagnostic::error(DiagnosticKind::Package, TextRange::empty(offset), message)
        .with_code(codes::MALFORMED_MANIFEST)
}
