//! Global symbol index.
//!
//! Maps every identifiable element of every indexed unit to its defining
//! location and structural path, keyed by global id. Entries never point at
//! live elements: [`crate::ide::Analysis::resolve_element`] walks the stored
//! path in the current tree, so a replaced unit cannot leave a dangling entry.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use super::ids::{IdError, IdentifierProvider, find_next_global_id, global_id};
use crate::base::Location;
use crate::syntax::{Element, ElementKind, ElementPath};

/// One indexed element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub global_id: Arc<str>,
    /// Local id within the immediate container.
    pub local_id: Arc<str>,
    /// Qualified local name (`Customer.Id`).
    pub local_name: Arc<str>,
    /// Global id of the containing element, `None` for roots.
    pub container: Option<Arc<str>>,
    pub location: Location,
    pub path: ElementPath,
    pub kind: ElementKind,
    pub package: Arc<str>,
}

/// Ids for one unit, computed without touching the index.
///
/// Planning is pure and runs in parallel across a batch; applying a plan
/// with [`GlobalIndex::insert_unit`] is sequential.
#[derive(Clone, Debug)]
pub struct UnitPlan<'a> {
    pub location: Location,
    pub package: Arc<str>,
    root: &'a Element,
    provider: IdentifierProvider,
}

impl<'a> UnitPlan<'a> {
    pub fn new(location: Location, package: &str, root: &'a Element) -> Result<Self, IdError> {
        Ok(Self {
            location,
            package: Arc::from(package),
            root,
            provider: IdentifierProvider::for_root(root)?,
        })
    }

    pub fn provider(&self) -> &IdentifierProvider {
        &self.provider
    }
}

/// The workspace-wide index.
#[derive(Clone, Debug, Default)]
pub struct GlobalIndex {
    /// Entries by global id (insertion order preserved).
    entries: IndexMap<Arc<str>, IndexEntry>,
    by_location: FxHashMap<Location, Vec<Arc<str>>>,
    by_package: FxHashMap<Arc<str>, Vec<Arc<str>>>,
    by_container: FxHashMap<Arc<str>, Vec<Arc<str>>>,
}

impl GlobalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, global_id: &str) -> bool {
        self.entries.contains_key(global_id)
    }

    pub fn get(&self, global_id: &str) -> Option<&IndexEntry> {
        self.entries.get(global_id)
    }

    /// Look up a global id, optionally requiring a structural kind.
    pub fn get_element_by_id(&self, global_id: &str, kind: Option<ElementKind>) -> Option<&IndexEntry> {
        self.get(global_id)
            .filter(|entry| kind.is_none_or(|k| entry.kind == k))
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    fn resolve_ids<'s>(&'s self, ids: Option<&'s Vec<Arc<str>>>) -> impl Iterator<Item = &'s IndexEntry> {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.entries.get(id))
    }

    /// Entries defined in one unit, in document order.
    pub fn entries_in(&self, location: &Location) -> impl Iterator<Item = &IndexEntry> {
        self.resolve_ids(self.by_location.get(location))
    }

    pub fn entries_in_package(&self, package: &str) -> impl Iterator<Item = &IndexEntry> {
        self.resolve_ids(self.by_package.get(package))
    }

    /// Direct children of an indexed element.
    pub fn members_of(&self, container: &str) -> impl Iterator<Item = &IndexEntry> {
        self.resolve_ids(self.by_container.get(container))
    }

    /// The entry of `location` whose qualified local name is `local_name`.
    pub fn find_local(&self, location: &Location, local_name: &str) -> Option<&IndexEntry> {
        self.entries_in(location)
            .find(|entry| &*entry.local_name == local_name)
    }

    /// Locations that currently have entries.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.by_location.keys()
    }

    /// Drop every entry of a unit. Returns the number removed.
    pub fn remove_location(&mut self, location: &Location) -> usize {
        let Some(ids) = self.by_location.remove(location) else {
            return 0;
        };
        let removed: FxHashSet<Arc<str>> = ids.into_iter().collect();
        self.entries.retain(|id, _| !removed.contains(id));
        for list in self.by_package.values_mut() {
            list.retain(|id| !removed.contains(id));
        }
        self.by_package.retain(|_, list| !list.is_empty());
        for id in &removed {
            self.by_container.remove(id);
        }
        for list in self.by_container.values_mut() {
            list.retain(|id| !removed.contains(id));
        }
        removed.len()
    }

    /// Replace a unit's entries with those of `plan`.
    ///
    /// A root whose global id is already taken by another unit is renamed
    /// with the gap-filling suffix scan; entries already in the index keep
    /// their ids. Returns the number of entries inserted.
    pub fn insert_unit(&mut self, plan: UnitPlan<'_>) -> usize {
        self.remove_location(&plan.location);

        let root_path = ElementPath::root();
        let declared = plan
            .provider
            .local_id(&root_path)
            .map(str::to_string)
            .unwrap_or_default();
        let (root_id, _) =
            find_next_global_id(&plan.package, &declared, |g| self.entries.contains_key(g));
        let provider = if root_id == declared {
            plan.provider
        } else {
            tracing::debug!(
                "[INDEX] '{}' already defined in package '{}', indexing {} as '{}'",
                declared,
                plan.package,
                plan.location,
                root_id
            );
            IdentifierProvider::with_root_id(plan.root, &root_id)
        };

        let mut ids = Vec::with_capacity(provider.len());
        let mut globals: FxHashMap<&ElementPath, Arc<str>> = FxHashMap::default();
        for (path, name) in provider.names() {
            let global: Arc<str> = Arc::from(global_id(&plan.package, &name.qualified));
            if self.entries.contains_key(&global) {
                tracing::warn!(
                    "[INDEX] duplicate global id '{}' in {}, skipping",
                    global,
                    plan.location
                );
                continue;
            }
            let container = path
                .parent()
                .and_then(|parent| globals.get(&parent).cloned());
            let entry = IndexEntry {
                global_id: global.clone(),
                local_id: Arc::from(name.local.as_str()),
                local_name: Arc::from(name.qualified.as_str()),
                container: container.clone(),
                location: plan.location.clone(),
                path: path.clone(),
                kind: name.kind,
                package: plan.package.clone(),
            };
            if let Some(container) = container {
                self.by_container
                    .entry(container)
                    .or_default()
                    .push(global.clone());
            }
            self.by_package
                .entry(plan.package.clone())
                .or_default()
                .push(global.clone());
            self.entries.insert(global.clone(), entry);
            globals.insert(path, global.clone());
            ids.push(global);
        }

        let count = ids.len();
        tracing::trace!("[INDEX] {} entries for {}", count, plan.location);
        self.by_location.insert(plan.location, ids);
        count
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_location.clear();
        self.by_package.clear();
        self.by_container.clear();
    }
}
