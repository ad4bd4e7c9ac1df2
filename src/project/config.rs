//! Workspace configuration.

use serde::{Deserialize, Serialize};

use super::error::WorkspaceError;
use crate::base::Location;
use crate::base::constants::{MANIFEST_FILE_NAME, MODEL_EXTENSION};
use crate::hir::DependencyScope;

/// Settings for a [`super::WorkspaceBuilder`].
///
/// Deserializes from camelCase JSON; every field is optional:
///
/// ```json
/// { "extensions": ["cm"], "manifestName": "package.json",
///   "dependencyScope": "transitive", "parseWorkers": 2, "parallel": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceConfig {
    /// Extensions of model files, without the dot.
    pub extensions: Vec<String>,
    /// File name of package manifests.
    pub manifest_name: String,
    pub dependency_scope: DependencyScope,
    /// `0` parses on the rayon pool; `n` uses `n` dedicated worker threads.
    pub parse_workers: usize,
    /// Index and link units in parallel.
    pub parallel: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            extensions: vec![MODEL_EXTENSION.to_string()],
            manifest_name: MANIFEST_FILE_NAME.to_string(),
            dependency_scope: DependencyScope::Direct,
            parse_workers: 0,
            parallel: true,
        }
    }
}

impl WorkspaceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, WorkspaceError> {
        serde_json::from_str(text).map_err(WorkspaceError::Config)
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    pub fn with_dependency_scope(mut self, scope: DependencyScope) -> Self {
        self.dependency_scope = scope;
        self
    }

    pub fn with_parse_workers(mut self, workers: usize) -> Self {
        self.parse_workers = workers;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn is_model_file(&self, location: &Location) -> bool {
        location
            .extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    pub fn is_manifest(&self, location: &Location) -> bool {
        location.file_name() == self.manifest_name
    }

    /// Whether the builder tracks `location` as a source unit.
    pub fn is_tracked_file(&self, location: &Location) -> bool {
        self.is_model_file(location) || self.is_manifest(location)
    }
}
