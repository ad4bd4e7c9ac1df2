//! Packages and the package dependency graph.
//!
//! A package is declared by an npm-shaped manifest at its root directory.
//! Packages own the model units below their root (the deepest root wins)
//! and see each other only through declared dependencies.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;
use rowan::{TextRange, TextSize};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::diagnostics::{Diagnostic, DiagnosticKind, codes};
use super::ids::package_id;
use crate::base::Location;

/// Which dependencies a package can see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyScope {
    /// Only the packages named in the manifest.
    #[default]
    Direct,
    /// Everything reachable through the dependency graph.
    Transitive,
}

/// The manifest file contents we use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
}

impl PackageManifest {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    /// Version requirement as written (`*`, `1.2.0`, `^1.0.0`, `~1.2.0`).
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub id: Arc<str>,
    pub name: String,
    pub version: String,
    /// Directory holding the manifest.
    pub root: Location,
    pub manifest: Location,
    pub dependencies: Vec<Dependency>,
}

impl Package {
    pub fn from_manifest(manifest_location: &Location, manifest: PackageManifest) -> Option<Self> {
        let root = manifest_location.parent()?;
        Some(Self {
            id: Arc::from(package_id(&manifest.name)),
            name: manifest.name,
            version: manifest.version,
            root,
            manifest: manifest_location.clone(),
            dependencies: manifest
                .dependencies
                .into_iter()
                .map(|(name, version)| Dependency { name, version })
                .collect(),
        })
    }

    pub fn contains(&self, location: &Location) -> bool {
        location.is_descendant_of(&self.root)
    }
}

/// Whether `version` satisfies `requirement`.
///
/// `*` and the empty string accept anything; `^x` requires the same major
/// version, `~x.y` the same major and minor; anything else must match exactly.
pub fn version_satisfies(requirement: &str, version: &str) -> bool {
    let requirement = requirement.trim();
    if requirement.is_empty() || requirement == "*" {
        return true;
    }
    let parts = |v: &str| -> Vec<String> {
        v.trim_start_matches(['=', 'v'])
            .split('.')
            .map(str::to_string)
            .collect()
    };
    if let Some(rest) = requirement.strip_prefix('^') {
        return parts(rest).first() == parts(version).first();
    }
    if let Some(rest) = requirement.strip_prefix('~') {
        let (want, have) = (parts(rest), parts(version));
        return want.iter().take(2).eq(have.iter().take(2));
    }
    parts(requirement) == parts(version)
}

/// A problem with a package's declarations, reported on its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageProblem {
    UnknownDependency {
        name: String,
    },
    VersionMismatch {
        name: String,
        required: String,
        found: String,
    },
    Cycle {
        members: Vec<String>,
    },
}

impl PackageProblem {
    /// Convert to a diagnostic, anchored at the dependency's name in `manifest_text`.
    pub fn to_diagnostic(&self, manifest_text: &str) -> Diagnostic {
        let anchor = |name: &str| {
            let quoted = format!("\"{name}\"");
            manifest_text
                .rfind(&quoted)
                .map(|start| {
                    TextRange::at(
                        TextSize::new(start as u32),
                        TextSize::new(quoted.len() as u32),
                    )
                })
                .unwrap_or_else(|| TextRange::empty(TextSize::new(0)))
        };
        match self {
            Self::UnknownDependency { name } => Diagnostic::warning(
                DiagnosticKind::Package,
                anchor(name),
                format!("dependency `{name}` is not a package in the workspace"),
            )
            .with_code(codes::UNKNOWN_DEPENDENCY),
            Self::VersionMismatch {
                name,
                required,
                found,
            } => Diagnostic::warning(
                DiagnosticKind::Package,
                anchor(name),
                format!("dependency `{name}` requires version {required}, workspace has {found}"),
            )
            .with_code(codes::VERSION_MISMATCH),
            Self::Cycle { members } => Diagnostic::error(
                DiagnosticKind::Package,
                TextRange::empty(TextSize::new(0)),
                format!("circular package dependency: {}", members.join(" -> ")),
            )
            .with_code(codes::CIRCULAR_DEPENDENCY),
        }
    }
}

/// All known packages, keyed by root directory.
#[derive(Debug, Clone, Default)]
pub struct PackageGraph {
    packages: BTreeMap<Location, Package>,
}

impl PackageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    /// Add or replace the package rooted at `package.root`.
    pub fn insert(&mut self, package: Package) -> Option<Package> {
        self.packages.insert(package.root.clone(), package)
    }

    pub fn remove_manifest(&mut self, manifest: &Location) -> Option<Package> {
        let root = manifest.parent()?;
        self.packages.remove(&root)
    }

    /// Remove every package whose root is `dir` or lies below it.
    pub fn remove_within(&mut self, dir: &Location) -> Vec<Package> {
        let roots: Vec<Location> = self
            .packages
            .keys()
            .filter(|root| root.is_within(dir))
            .cloned()
            .collect();
        roots
            .iter()
            .filter_map(|root| self.packages.remove(root))
            .collect()
    }

    pub fn by_manifest(&self, manifest: &Location) -> Option<&Package> {
        let root = manifest.parent()?;
        self.packages.get(&root)
    }

    /// First package (in root order) with the given manifest name.
    pub fn by_name(&self, name: &str) -> Option<&Package> {
        self.packages.values().find(|p| p.name == name)
    }

    pub fn by_id(&self, id: &str) -> Option<&Package> {
        self.packages.values().find(|p| &*p.id == id)
    }

    /// The package with the deepest root containing `location`.
    pub fn package_for(&self, location: &Location) -> Option<&Package> {
        self.packages
            .values()
            .filter(|p| p.contains(location))
            .max_by_key(|p| p.root.depth())
    }

    /// Packages visible from `package` (excluding itself), in declaration
    /// order, breadth-first for [`DependencyScope::Transitive`].
    pub fn visible_from<'a>(&'a self, package: &'a Package, scope: DependencyScope) -> Vec<&'a Package> {
        let mut visible = Vec::new();
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        seen.insert(&package.id);
        let mut queue: VecDeque<&Package> = VecDeque::from([package]);
        while let Some(current) = queue.pop_front() {
            for dependency in &current.dependencies {
                let Some(target) = self.by_name(&dependency.name) else {
                    continue;
                };
                if !seen.insert(&target.id) {
                    continue;
                }
                visible.push(target);
                if scope == DependencyScope::Transitive {
                    queue.push_back(target);
                }
            }
        }
        visible
    }

    /// Whether elements of package `to` may be referenced from package `from`.
    pub fn is_visible(&self, from: &str, to: &str, scope: DependencyScope) -> bool {
        if from == to {
            return true;
        }
        self.by_id(from).is_some_and(|package| {
            self.visible_from(package, scope)
                .iter()
                .any(|p| &*p.id == to)
        })
    }

    /// Dependency cycles, each as the member names in traversal order.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let packages: Vec<&Package> = self.packages.values().collect();
        let position: FxHashMap<&str, usize> = packages
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.as_str(), i))
            .collect();
        let edges: Vec<Vec<usize>> = packages
            .iter()
            .map(|p| {
                p.dependencies
                    .iter()
                    .filter_map(|d| position.get(d.name.as_str()).copied())
                    .collect()
            })
            .collect();

        let mut tarjan = Tarjan::new(packages.len());
        for node in 0..packages.len() {
            if tarjan.index[node].is_none() {
                tarjan.connect(node, &edges);
            }
        }

        tarjan
            .components
            .into_iter()
            .filter(|c| c.len() > 1 || edges[c[0]].contains(&c[0]))
            .map(|mut c| {
                c.sort_unstable();
                c.into_iter().map(|i| packages[i].name.clone()).collect()
            })
            .collect()
    }

    /// Declaration problems, keyed by manifest location.
    pub fn problems(&self) -> Vec<(Location, PackageProblem)> {
        let mut problems = Vec::new();
        for package in self.packages.values() {
            for dependency in &package.dependencies {
                match self.by_name(&dependency.name) {
                    None => problems.push((
                        package.manifest.clone(),
                        PackageProblem::UnknownDependency {
                            name: dependency.name.clone(),
                        },
                    )),
                    Some(target) if !version_satisfies(&dependency.version, &target.version) => {
                        problems.push((
                            package.manifest.clone(),
                            PackageProblem::VersionMismatch {
                                name: dependency.name.clone(),
                                required: dependency.version.clone(),
                                found: target.version.clone(),
                            },
                        ))
                    }
                    Some(_) => {}
                }
            }
        }
        for members in self.cycles() {
            tracing::warn!("[PACKAGES] dependency cycle: {}", members.join(" -> "));
            for name in &members {
                if let Some(package) = self.by_name(name) {
                    problems.push((
                        package.manifest.clone(),
                        PackageProblem::Cycle {
                            members: members.clone(),
                        },
                    ));
                }
            }
        }
        problems
    }
}

/// Tarjan's strongly connected components.
struct Tarjan {
    counter: usize,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    components: Vec<Vec<usize>>,
}

impl Tarjan {
    fn new(size: usize) -> Self {
        Self {
            counter: 0,
            index: vec![None; size],
            lowlink: vec![0; size],
            on_stack: vec![false; size],
            stack: Vec::new(),
            components: Vec::new(),
        }
    }

    fn connect(&mut self, node: usize, edges: &[Vec<usize>]) {
        self.index[node] = Some(self.counter);
        self.lowlink[node] = self.counter;
        self.counter += 1;
        self.stack.push(node);
        self.on_stack[node] = true;

        for &next in &edges[node] {
            match self.index[next] {
                None => {
                    self.connect(next, edges);
                    self.lowlink[node] = self.lowlink[node].min(self.lowlink[next]);
                }
                Some(next_index) if self.on_stack[next] => {
                    self.lowlink[node] = self.lowlink[node].min(next_index);
                }
                Some(_) => {}
            }
        }

        if Some(self.lowlink[node]) == self.index[node] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack[member] = false;
                component.push(member);
                if member == node {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}
