//! Name resolution: resolving references to index entries.
//!
//! A reference with text `t` and expected kind `K`, made from a unit in
//! package `p`, is tried against, in order:
//!
//! 1. the members of its anchor entity (member references only), or for
//!    qualified references written `o.m`, member `m` of the entity of the
//!    root's object `o`
//! 2. the same file (`t` as a qualified local name, or relative to the root)
//! 3. the same package (`p.t`)
//! 4. visible dependency packages (`d.t`, in declaration order)
//! 5. `t` as a global id, if its package is `p` or visible from `p`
//!
//! Only entries of kind `K` match. Resolution is a pure function of the
//! index and the package graph: nothing is stored on the tree.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::ids::global_id;
use super::index::{GlobalIndex, IndexEntry};
use super::packages::{DependencyScope, Package, PackageGraph};
use crate::base::Location;
use crate::base::constants::ID_SEPARATOR;
use crate::syntax::{Element, ElementKind, ElementPath, ReferenceSite};

// ============================================================================
// RESULTS
// ============================================================================

/// Result of resolving one reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Resolved(IndexEntry),
    Unresolved,
}

impl Resolution {
    pub fn entry(&self) -> Option<&IndexEntry> {
        match self {
            Resolution::Resolved(entry) => Some(entry),
            Resolution::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// A reference site together with its resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkedReference {
    /// Path of the referencing element.
    pub path: ElementPath,
    pub property: String,
    pub index: usize,
    pub text: String,
    pub range: rowan::TextRange,
    pub expected: ElementKind,
    pub resolution: Resolution,
}

impl LinkedReference {
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_resolved()
    }

    pub fn target(&self) -> Option<&IndexEntry> {
        self.resolution.entry()
    }
}

/// A member derived during linking from the entity an element refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImplicitMember {
    /// The element the member is derived for (a diagram node, a mapping object).
    pub owner: ElementPath,
    /// Global id of the entity the member comes from.
    pub entity: Arc<str>,
    pub member: IndexEntry,
}

/// Everything one linking pass produces for a unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkResult {
    pub references: Vec<LinkedReference>,
    pub implicit: Vec<ImplicitMember>,
}

impl LinkResult {
    pub fn unresolved(&self) -> impl Iterator<Item = &LinkedReference> {
        self.references.iter().filter(|r| !r.is_resolved())
    }
}

/// A candidate offered by the scope query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeCandidate {
    /// Text that resolves to `entry` from the query position.
    pub label: String,
    pub entry: IndexEntry,
    /// Which rule makes it visible: 0 anchor/same file, 1 same package, 2 dependency.
    pub distance: u8,
}

// ============================================================================
// LINKER
// ============================================================================

/// Read-only view used to resolve references.
#[derive(Clone, Copy, Debug)]
pub struct Linker<'a> {
    index: &'a GlobalIndex,
    packages: &'a PackageGraph,
    scope: DependencyScope,
}

impl<'a> Linker<'a> {
    pub fn new(index: &'a GlobalIndex, packages: &'a PackageGraph, scope: DependencyScope) -> Self {
        Self {
            index,
            packages,
            scope,
        }
    }

    /// Qualified local name of the root of the unit at `location`, as indexed.
    fn root_name(&self, location: &Location) -> Option<&'a str> {
        self.index
            .entries_in(location)
            .find(|entry| entry.path.is_root())
            .map(|entry| &*entry.local_name)
    }

    /// Resolve every reference of the unit at `location` and derive implicit members.
    pub fn link(&self, location: &Location, root: &Element) -> LinkResult {
        let package = self.packages.package_for(location);
        let root_name = self.root_name(location);
        let mut result = LinkResult::default();
        let mut resolved: FxHashMap<(ElementPath, &str), Resolution> = FxHashMap::default();

        root.visit(&mut |path, element| {
            for site in &element.references {
                let resolution =
                    self.resolve_site(location, package, root_name, root, path, element, site, &resolved);
                if site.index == 0 {
                    resolved.insert((path.clone(), site.property.as_str()), resolution.clone());
                }
                result.references.push(LinkedReference {
                    path: path.clone(),
                    property: site.property.clone(),
                    index: site.index,
                    text: site.text.clone(),
                    range: site.range,
                    expected: site.target,
                    resolution,
                });
            }

            if element.kind.derives_implicit_members() {
                let entity = resolved
                    .get(&(path.clone(), "entity"))
                    .and_then(|r| r.entry())
                    .cloned();
                if let Some(entity) = entity {
                    for member in self.index.members_of(&entity.global_id) {
                        if member.kind == ElementKind::Attribute {
                            result.implicit.push(ImplicitMember {
                                owner: path.clone(),
                                entity: entity.global_id.clone(),
                                member: member.clone(),
                            });
                        }
                    }
                }
            }
        });

        tracing::trace!(
            "[LINK] {}: {} references ({} unresolved), {} implicit members",
            location,
            result.references.len(),
            result.unresolved().count(),
            result.implicit.len()
        );
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_site(
        &self,
        location: &Location,
        package: Option<&Package>,
        root_name: Option<&str>,
        root: &Element,
        path: &ElementPath,
        element: &Element,
        site: &ReferenceSite,
        resolved: &FxHashMap<(ElementPath, &str), Resolution>,
    ) -> Resolution {
        let spec = element.kind.reference(&site.property);
        let qualified = spec.and_then(|spec| spec.qualifier).and_then(|feature| {
            self.resolve_qualified(location, package, root_name, root, feature, &site.text, site.target)
        });
        if let Some(resolution) = qualified {
            return resolution;
        }
        let anchor = spec
            .and_then(|spec| spec.anchor)
            .filter(|_| !site.text.contains(ID_SEPARATOR));
        if let Some(anchor) = anchor {
            let anchor_entity = path
                .parent()
                .and_then(|parent| resolved.get(&(parent, anchor)))
                .and_then(|r| r.entry());
            return match anchor_entity {
                Some(entity) => self.resolve_member(entity, &site.text, site.target),
                None => {
                    tracing::trace!(
                        "[LINK] '{}' unresolved: anchor '{}' of {} is unresolved",
                        site.text,
                        anchor,
                        path
                    );
                    Resolution::Unresolved
                }
            };
        }
        self.resolve_name(&site.text, site.target, location, package, root_name)
    }

    /// Resolve `text` written as `<element id>.<member>`, where the element is
    /// one of the root's `feature` children. `None` when the head names no
    /// such element.
    #[allow(clippy::too_many_arguments)]
    fn resolve_qualified(
        &self,
        location: &Location,
        package: Option<&Package>,
        root_name: Option<&str>,
        root: &Element,
        feature: &str,
        text: &str,
        kind: ElementKind,
    ) -> Option<Resolution> {
        let (head, member) = text.split_once(ID_SEPARATOR)?;
        let object = root
            .containment(feature)?
            .elements
            .iter()
            .find(|e| e.id.as_deref() == Some(head))?;
        let resolution = match self.object_entity(object, location, package, root_name) {
            Some(entity) => self.resolve_member(&entity, member, kind),
            None => {
                tracing::trace!("[LINK] '{}' unresolved: entity of '{}' is unresolved", text, head);
                Resolution::Unresolved
            }
        };
        Some(resolution)
    }

    /// The entity an object element (source object, node) refers to.
    fn object_entity(
        &self,
        object: &Element,
        location: &Location,
        package: Option<&Package>,
        root_name: Option<&str>,
    ) -> Option<IndexEntry> {
        let site = object
            .references
            .iter()
            .find(|r| r.target == ElementKind::Entity)?;
        self.resolve_name(&site.text, site.target, location, package, root_name)
            .entry()
            .cloned()
    }

    /// Resolve `name` as a member of `entity`.
    pub fn resolve_member(&self, entity: &IndexEntry, name: &str, kind: ElementKind) -> Resolution {
        let local_name = format!("{}{ID_SEPARATOR}{name}", entity.local_name);
        match self.index.find_local(&entity.location, &local_name) {
            Some(entry) if entry.kind == kind => Resolution::Resolved(entry.clone()),
            _ => Resolution::Unresolved,
        }
    }

    /// Resolve a textual reference made from the unit at `location`.
    pub fn resolve_name(
        &self,
        name: &str,
        kind: ElementKind,
        location: &Location,
        package: Option<&Package>,
        root_name: Option<&str>,
    ) -> Resolution {
        let matches = |entry: &&IndexEntry| entry.kind == kind;

        // 1. Same file
        let same_file = self
            .index
            .find_local(location, name)
            .filter(matches)
            .or_else(|| {
                let root = root_name?;
                self.index
                    .find_local(location, &format!("{root}{ID_SEPARATOR}{name}"))
                    .filter(matches)
            });
        if let Some(entry) = same_file {
            tracing::trace!("[LINK] '{}' found in same file -> {}", name, entry.global_id);
            return Resolution::Resolved(entry.clone());
        }

        let Some(package) = package else {
            return Resolution::Unresolved;
        };

        // 2. Same package
        if let Some(entry) = self.index.get(&global_id(&package.id, name)).filter(matches) {
            tracing::trace!("[LINK] '{}' found in package '{}' -> {}", name, package.id, entry.global_id);
            return Resolution::Resolved(entry.clone());
        }

        // 3. Dependencies
        let visible = self.packages.visible_from(package, self.scope);
        for dependency in &visible {
            if let Some(entry) = self.index.get(&global_id(&dependency.id, name)).filter(matches) {
                tracing::trace!(
                    "[LINK] '{}' found in dependency '{}' -> {}",
                    name,
                    dependency.id,
                    entry.global_id
                );
                return Resolution::Resolved(entry.clone());
            }
        }

        // 4. Fully qualified, within the visibility boundary
        if let Some(entry) = self.index.get(name).filter(matches) {
            let allowed = entry.package == package.id
                || visible.iter().any(|p| p.id == entry.package);
            if allowed {
                tracing::trace!("[LINK] '{}' found as global id", name);
                return Resolution::Resolved(entry.clone());
            }
            tracing::trace!(
                "[LINK] '{}' exists in package '{}' which '{}' does not depend on",
                name,
                entry.package,
                package.id
            );
        }

        Resolution::Unresolved
    }

    /// Candidates for a reference of `property` on the element at `path`.
    ///
    /// Applies the same visibility rules as resolution and never mutates the
    /// index. Each label resolves back to its entry.
    pub fn scope_candidates(
        &self,
        location: &Location,
        root: &Element,
        path: &ElementPath,
        property: &str,
    ) -> Vec<ScopeCandidate> {
        let Some(element) = root.walk(path) else {
            return Vec::new();
        };
        let Some(spec) = element.kind.reference(property) else {
            return Vec::new();
        };
        let kind = spec.target;
        let package = self.packages.package_for(location);
        let root_name = self.root_name(location);
        let mut candidates = Vec::new();
        let mut seen: FxHashSet<Arc<str>> = FxHashSet::default();

        // Anchored references offer the anchor entity's members by local id
        if let Some(anchor) = spec.anchor {
            let anchor_entry = path.parent().and_then(|parent| {
                let container = root.walk(&parent)?;
                let site = container.references_of(anchor).next()?;
                self.resolve_name(&site.text, site.target, location, package, root_name)
                    .entry()
                    .cloned()
            });
            if let Some(entity) = anchor_entry {
                for member in self.index.members_of(&entity.global_id) {
                    if member.kind == kind && seen.insert(member.global_id.clone()) {
                        candidates.push(ScopeCandidate {
                            label: member.local_id.to_string(),
                            entry: member.clone(),
                            distance: 0,
                        });
                    }
                }
            }
            return candidates;
        }

        // Qualified references offer `<object>.<member>` for each object of the root
        if let Some(feature) = spec.qualifier {
            for object in root.containment(feature).into_iter().flat_map(|c| &c.elements) {
                let Some(object_id) = object.id.as_deref() else {
                    continue;
                };
                let Some(entity) = self.object_entity(object, location, package, root_name) else {
                    continue;
                };
                for member in self.index.members_of(&entity.global_id) {
                    if member.kind == kind && seen.insert(member.global_id.clone()) {
                        candidates.push(ScopeCandidate {
                            label: format!("{object_id}{ID_SEPARATOR}{}", member.local_id),
                            entry: member.clone(),
                            distance: 0,
                        });
                    }
                }
            }
        }

        let relative = |entry: &IndexEntry| -> String {
            root_name
                .and_then(|root| entry.local_name.strip_prefix(root))
                .and_then(|rest| rest.strip_prefix(ID_SEPARATOR))
                .map(str::to_string)
                .unwrap_or_else(|| entry.local_name.to_string())
        };

        for entry in self.index.entries_in(location) {
            if entry.kind == kind && seen.insert(entry.global_id.clone()) {
                candidates.push(ScopeCandidate {
                    label: relative(entry),
                    entry: entry.clone(),
                    distance: 0,
                });
            }
        }

        let Some(package) = package else {
            return candidates;
        };
        let mut groups = vec![(package, 1u8)];
        groups.extend(
            self.packages
                .visible_from(package, self.scope)
                .into_iter()
                .map(|p| (p, 2u8)),
        );
        for (group, distance) in groups {
            for entry in self.index.entries_in_package(&group.id) {
                if entry.kind != kind || !seen.insert(entry.global_id.clone()) {
                    continue;
                }
                // A shorter label would resolve to something else first
                let local = entry.local_name.to_string();
                let label = match self.resolve_name(&local, kind, location, Some(package), root_name) {
                    Resolution::Resolved(found) if found.global_id == entry.global_id => local,
                    _ => entry.global_id.to_string(),
                };
                candidates.push(ScopeCandidate {
                    label,
                    entry: entry.clone(),
                    distance,
                });
            }
        }
        candidates
    }
}
