//! Local and global identifiers.
//!
//! Every element gets a *local id* unique among its siblings: the declared
//! `id`, or a synthetic `<feature>@<index>` for kinds that declare none.
//! Joining local ids from the root gives the *qualified local name*
//! (`Customer.Id`); qualifying that with the package id gives the *global
//! id* (`sales.Customer.Id`).

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::base::constants::{ID_SEPARATOR, SYNTHETIC_ID_SEPARATOR};
use crate::syntax::{Element, ElementKind, ElementPath};

/// Structural faults: asking for an id that the tree cannot produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("no element at path {path}")]
    NoSuchElement { path: ElementPath },
    #[error("root element has no id, so {path} has no qualified name")]
    AnonymousRoot { path: ElementPath },
}

/// Return `base` if it is free, otherwise `base` plus the smallest positive
/// suffix that is free.
///
/// Freed lower suffixes are reused: with `nodeA`, `nodeA1`, `nodeA2` and
/// `nodeA4` taken, the result is `nodeA3`.
pub fn find_next_id<'a>(base: &str, taken: impl IntoIterator<Item = &'a str>) -> String {
    let taken: FxHashSet<&str> = taken.into_iter().collect();
    find_next_id_by(base, |candidate| taken.contains(candidate))
}

/// [`find_next_id`] over an arbitrary membership test.
pub fn find_next_id_by(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    let mut suffix = 1usize;
    loop {
        let candidate = format!("{base}{suffix}");
        if !is_taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Disambiguate a root-level local id so its global id is free.
///
/// Returns the `(local id, global id)` pair that was found.
pub fn find_next_global_id(
    package_id: &str,
    base: &str,
    is_taken: impl Fn(&str) -> bool,
) -> (String, String) {
    let local = find_next_id_by(base, |candidate| is_taken(&global_id(package_id, candidate)));
    let global = global_id(package_id, &local);
    (local, global)
}

/// Qualify a local name with its package.
///
/// A local name equal to the package id maps to the bare package id.
pub fn global_id(package_id: &str, qualified_name: &str) -> String {
    if package_id.is_empty() {
        qualified_name.to_string()
    } else if qualified_name == package_id {
        package_id.to_string()
    } else {
        format!("{package_id}{ID_SEPARATOR}{qualified_name}")
    }
}

/// Package id derived from a manifest name: characters outside
/// `[A-Za-z0-9_]` become `_` (`@acme/sales-model` → `_acme_sales_model`).
pub fn package_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Synthetic local id for an element without a declared id.
pub fn synthetic_id(feature: &str, index: usize) -> String {
    format!("{feature}{SYNTHETIC_ID_SEPARATOR}{index}")
}

pub fn is_synthetic_id(id: &str) -> bool {
    id.contains(SYNTHETIC_ID_SEPARATOR)
}

/// Whether `id` is a valid declared identifier (XID start, then XID continue).
pub fn is_valid_id(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) if first == '_' || unicode_ident::is_xid_start(first) => {
            chars.all(unicode_ident::is_xid_continue)
        }
        _ => false,
    }
}

// ============================================================================
// IDENTIFIER PROVIDER
// ============================================================================

/// The ids assigned to one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalName {
    pub local: String,
    pub qualified: String,
    pub kind: ElementKind,
}

/// Local ids and qualified names for every element of one tree.
///
/// Sibling collisions are settled with [`find_next_id`] in document order,
/// so the first declaration keeps its name.
#[derive(Debug, Clone)]
pub struct IdentifierProvider {
    names: Vec<(ElementPath, LocalName)>,
    by_path: FxHashMap<ElementPath, usize>,
}

impl IdentifierProvider {
    /// Assign ids using the root's declared id.
    pub fn for_root(root: &Element) -> Result<Self, IdError> {
        match root.id.as_deref() {
            Some(id) => Ok(Self::with_root_id(root, id)),
            None => Err(IdError::AnonymousRoot {
                path: ElementPath::root(),
            }),
        }
    }

    /// Assign ids with `root_id` standing in for the root's declared id.
    pub fn with_root_id(root: &Element, root_id: &str) -> Self {
        let mut provider = Self {
            names: Vec::new(),
            by_path: FxHashMap::default(),
        };
        let root_name = LocalName {
            local: root_id.to_string(),
            qualified: root_id.to_string(),
            kind: root.kind,
        };
        provider.assign(root, ElementPath::root(), root_name);
        provider
    }

    fn assign(&mut self, element: &Element, path: ElementPath, name: LocalName) {
        let parent_qualified = name.qualified.clone();
        self.by_path.insert(path.clone(), self.names.len());
        self.names.push((path.clone(), name));

        let mut taken: FxHashSet<String> = FxHashSet::default();
        let mut assigned = Vec::new();
        for (feature, index, child) in element.child_elements() {
            let local = match child.id.as_deref() {
                Some(declared) => find_next_id_by(declared, |c| taken.contains(c)),
                None => synthetic_id(feature, index),
            };
            taken.insert(local.clone());
            assigned.push((path.child(feature, index), child, local));
        }
        for (child_path, child, local) in assigned {
            let qualified = format!("{parent_qualified}{ID_SEPARATOR}{local}");
            let name = LocalName {
                local,
                qualified,
                kind: child.kind,
            };
            self.assign(child, child_path, name);
        }
    }

    fn name(&self, path: &ElementPath) -> Result<&LocalName, IdError> {
        self.by_path
            .get(path)
            .map(|&i| &self.names[i].1)
            .ok_or_else(|| IdError::NoSuchElement { path: path.clone() })
    }

    pub fn local_id(&self, path: &ElementPath) -> Result<&str, IdError> {
        self.name(path).map(|n| n.local.as_str())
    }

    pub fn qualified_name(&self, path: &ElementPath) -> Result<&str, IdError> {
        self.name(path).map(|n| n.qualified.as_str())
    }

    pub fn global_id(&self, package_id: &str, path: &ElementPath) -> Result<String, IdError> {
        self.qualified_name(path).map(|q| global_id(package_id, q))
    }

    /// All assigned names in document order.
    pub fn names(&self) -> impl Iterator<Item = (&ElementPath, &LocalName)> {
        self.names.iter().map(|(p, n)| (p, n))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Qualified local name for `path`, failing on anonymous roots and missing paths.
pub fn qualified_name_of(root: &Element, path: &ElementPath) -> Result<String, IdError> {
    if root.walk(path).is_none() {
        return Err(IdError::NoSuchElement { path: path.clone() });
    }
    let provider = IdentifierProvider::for_root(root).map_err(|_| IdError::AnonymousRoot {
        path: path.clone(),
    })?;
    provider.qualified_name(path).map(str::to_string)
}
