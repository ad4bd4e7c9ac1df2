//! An in-memory workspace driven through the builder.

use std::sync::Arc;

use tessera::Location;
use tessera::hir::{Diagnostic, IndexEntry};
use tessera::project::{BuildReport, MemoryFileSystem, WorkspaceBuilder, WorkspaceConfig};
use tessera::syntax::ElementPath;

pub fn loc(path: &str) -> Location {
    Location::new(path)
}

pub struct TestWorkspace {
    pub fs: Arc<MemoryFileSystem>,
    pub builder: WorkspaceBuilder,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self::with_config(WorkspaceConfig::default())
    }

    pub fn with_config(config: WorkspaceConfig) -> Self {
        let fs = Arc::new(MemoryFileSystem::new());
        let builder = WorkspaceBuilder::new(config, fs.clone());
        Self { fs, builder }
    }

    pub fn file(&self, path: &str, text: &str) -> &Self {
        self.fs.write(path, text);
        self
    }

    pub fn manifest(&self, dir: &str, name: &str, deps: &[(&str, &str)]) -> &Self {
        self.file(&format!("{dir}/package.json"), &super::manifest(name, "1.0.0", deps))
    }

    /// Build everything under `/ws`.
    pub fn build(&mut self) -> BuildReport {
        self.builder.update([loc("/ws")], []).expect("update failed")
    }

    pub fn change(&mut self, paths: &[&str]) -> BuildReport {
        self.builder
            .update(paths.iter().map(|p| loc(p)), [])
            .expect("update failed")
    }

    pub fn delete(&mut self, paths: &[&str]) -> BuildReport {
        for path in paths {
            self.fs.remove(*path);
        }
        self.builder
            .update([], paths.iter().map(|p| loc(p)))
            .expect("update failed")
    }

    /// Global id the first reference of `property` on the element at `path` resolves to.
    pub fn target_at(&self, location: &str, path: &ElementPath, property: &str) -> Option<String> {
        self.builder
            .analysis()
            .references(&loc(location))
            .iter()
            .find(|r| r.path == *path && r.property == property)
            .and_then(|r| r.target())
            .map(|e| e.global_id.to_string())
    }

    pub fn target_of(&self, location: &str, property: &str) -> Option<String> {
        self.target_at(location, &ElementPath::root(), property)
    }

    pub fn diagnostics(&self, location: &str) -> Vec<Diagnostic> {
        self.builder.analysis().diagnostics(&loc(location)).to_vec()
    }

    pub fn codes(&self, location: &str) -> Vec<String> {
        self.diagnostics(location)
            .iter()
            .filter_map(|d| d.code.as_deref().map(str::to_string))
            .collect()
    }

    pub fn entry(&self, global_id: &str) -> Option<IndexEntry> {
        self.builder.index().get(global_id).cloned()
    }
}
