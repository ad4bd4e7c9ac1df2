//! The element model lowered from the CST.
//!
//! Every model file holds one root [`Element`]. Elements own their
//! contained children per containment feature and record the textual
//! cross-references they make; resolved targets live outside the tree
//! (see `hir::resolve`) so a tree is never mutated after lowering.

use std::fmt;

use rowan::TextRange;
use serde::{Deserialize, Serialize};

use crate::base::constants;

// ============================================================================
// ELEMENT KINDS
// ============================================================================

/// The closed set of structural tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Entity,
    Attribute,
    Relationship,
    RelationshipAttribute,
    SystemDiagram,
    EntityNode,
    RelationshipEdge,
    Mapping,
    SourceObject,
    TargetObject,
    AttributeMapping,
}

/// A containment feature of an element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainmentSpec {
    pub feature: &'static str,
    pub kind: ElementKind,
    /// `false` for single-valued features written as a nested block.
    pub many: bool,
}

/// A reference property of an element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSpec {
    pub property: &'static str,
    pub target: ElementKind,
    pub many: bool,
    /// Property of the containing element whose resolved entity scopes
    /// this reference to its members.
    pub anchor: Option<&'static str>,
    /// Root containment feature whose elements may qualify this reference
    /// as `<element id>.<member>`, naming a member of that element's entity.
    pub qualifier: Option<&'static str>,
}

const fn contain(feature: &'static str, kind: ElementKind, many: bool) -> ContainmentSpec {
    ContainmentSpec {
        feature,
        kind,
        many,
    }
}

const fn refer(property: &'static str, target: ElementKind) -> ReferenceSpec {
    ReferenceSpec {
        property,
        target,
        many: false,
        anchor: None,
        qualifier: None,
    }
}

const fn anchored(
    property: &'static str,
    target: ElementKind,
    anchor: &'static str,
) -> ReferenceSpec {
    ReferenceSpec {
        property,
        target,
        many: false,
        anchor: Some(anchor),
        qualifier: None,
    }
}

const fn qualified(
    property: &'static str,
    target: ElementKind,
    qualifier: &'static str,
) -> ReferenceSpec {
    ReferenceSpec {
        property,
        target,
        many: false,
        anchor: None,
        qualifier: Some(qualifier),
    }
}

impl ElementKind {
    /// Kind of a root element written with `key`.
    pub fn from_root_key(key: &str) -> Option<Self> {
        match key {
            constants::ENTITY_KEYWORD => Some(Self::Entity),
            constants::RELATIONSHIP_KEYWORD => Some(Self::Relationship),
            constants::SYSTEM_DIAGRAM_KEYWORD | constants::DIAGRAM_KEYWORD => Some(Self::SystemDiagram),
            constants::MAPPING_KEYWORD => Some(Self::Mapping),
            _ => None,
        }
    }

    pub fn is_root(self) -> bool {
        matches!(
            self,
            Self::Entity | Self::Relationship | Self::SystemDiagram | Self::Mapping
        )
    }

    /// Whether elements of this kind carry a declared `id` property.
    pub fn has_declared_id(self) -> bool {
        !matches!(
            self,
            Self::RelationshipAttribute | Self::TargetObject | Self::AttributeMapping
        )
    }

    /// Roots whose linked state includes substructure derived from other
    /// elements (diagram node placeholders, mapped attribute lists).
    pub fn has_implicit_substructure(self) -> bool {
        matches!(self, Self::SystemDiagram | Self::Mapping)
    }

    /// Whether linking derives implicit members for elements of this kind.
    pub fn derives_implicit_members(self) -> bool {
        matches!(
            self,
            Self::EntityNode | Self::SourceObject | Self::TargetObject
        )
    }

    pub fn containments(self) -> &'static [ContainmentSpec] {
        use ElementKind::*;
        const ENTITY: &[ContainmentSpec] = &[contain("attributes", Attribute, true)];
        const RELATIONSHIP: &[ContainmentSpec] =
            &[contain("attributes", RelationshipAttribute, true)];
        const SYSTEM_DIAGRAM: &[ContainmentSpec] = &[
            contain("nodes", EntityNode, true),
            contain("edges", RelationshipEdge, true),
        ];
        const MAPPING: &[ContainmentSpec] = &[
            contain("sources", SourceObject, true),
            contain("target", TargetObject, false),
        ];
        const TARGET_OBJECT: &[ContainmentSpec] = &[contain("mappings", AttributeMapping, true)];
        match self {
            Entity => ENTITY,
            Relationship => RELATIONSHIP,
            SystemDiagram => SYSTEM_DIAGRAM,
            Mapping => MAPPING,
            TargetObject => TARGET_OBJECT,
            Attribute | RelationshipAttribute | EntityNode | RelationshipEdge | SourceObject
            | AttributeMapping => &[],
        }
    }

    pub fn references(self) -> &'static [ReferenceSpec] {
        use ElementKind::*;
        const ENTITY: &[ReferenceSpec] = &[ReferenceSpec {
            property: "superEntities",
            target: Entity,
            many: true,
            anchor: None,
            qualifier: None,
        }];
        const RELATIONSHIP: &[ReferenceSpec] = &[refer("parent", Entity), refer("child", Entity)];
        const RELATIONSHIP_ATTRIBUTE: &[ReferenceSpec] = &[
            anchored("parent", Attribute, "parent"),
            anchored("child", Attribute, "child"),
        ];
        const OBJECT: &[ReferenceSpec] = &[refer("entity", Entity)];
        const RELATIONSHIP_EDGE: &[ReferenceSpec] = &[
            refer("relationship", Relationship),
            refer("sourceNode", EntityNode),
            refer("targetNode", EntityNode),
        ];
        const ATTRIBUTE_MAPPING: &[ReferenceSpec] = &[
            anchored("attribute", Attribute, "entity"),
            qualified("source", Attribute, "sources"),
        ];
        match self {
            Entity => ENTITY,
            Relationship => RELATIONSHIP,
            RelationshipAttribute => RELATIONSHIP_ATTRIBUTE,
            EntityNode | SourceObject | TargetObject => OBJECT,
            RelationshipEdge => RELATIONSHIP_EDGE,
            AttributeMapping => ATTRIBUTE_MAPPING,
            Attribute | SystemDiagram | Mapping => &[],
        }
    }

    pub fn containment(self, feature: &str) -> Option<&'static ContainmentSpec> {
        self.containments().iter().find(|c| c.feature == feature)
    }

    pub fn reference(self, property: &str) -> Option<&'static ReferenceSpec> {
        self.references().iter().find(|r| r.property == property)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Attribute => "attribute",
            Self::Relationship => "relationship",
            Self::RelationshipAttribute => "relationship attribute",
            Self::SystemDiagram => "system diagram",
            Self::EntityNode => "entity node",
            Self::RelationshipEdge => "relationship edge",
            Self::Mapping => "mapping",
            Self::SourceObject => "source object",
            Self::TargetObject => "target object",
            Self::AttributeMapping => "attribute mapping",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// PATHS
// ============================================================================

/// One container-relative step: the `index`-th element of `feature`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathStep {
    pub feature: String,
    pub index: usize,
}

/// Structural path from a unit's root to an element. The root's path is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementPath(pub Vec<PathStep>);

impl ElementPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, feature: &str, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep {
            feature: feature.to_string(),
            index,
        });
        Self(steps)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    pub fn last(&self) -> Option<&PathStep> {
        self.0.last()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}@{}", step.feature, step.index)?;
        }
        Ok(())
    }
}

// ============================================================================
// ELEMENTS
// ============================================================================

/// A textual cross-reference made by an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSite {
    pub property: String,
    /// Position within a list-valued property, `0` otherwise.
    pub index: usize,
    pub text: String,
    pub range: TextRange,
    pub target: ElementKind,
}

/// The elements held by one containment feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Containment {
    pub feature: String,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    /// Declared local id, if the source gives one.
    pub id: Option<String>,
    pub id_range: Option<TextRange>,
    pub range: TextRange,
    /// Plain scalar properties in source order.
    pub properties: Vec<(String, String)>,
    pub references: Vec<ReferenceSite>,
    pub children: Vec<Containment>,
}

impl Element {
    pub fn new(kind: ElementKind, range: TextRange) -> Self {
        Self {
            kind,
            id: None,
            id_range: None,
            range,
            properties: Vec::new(),
            references: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn references_of<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a ReferenceSite> {
        self.references.iter().filter(move |r| r.property == property)
    }

    pub fn containment(&self, feature: &str) -> Option<&Containment> {
        self.children.iter().find(|c| c.feature == feature)
    }

    /// Direct children with their path steps, in feature then index order.
    pub fn child_elements(&self) -> impl Iterator<Item = (&str, usize, &Element)> {
        self.children.iter().flat_map(|c| {
            c.elements
                .iter()
                .enumerate()
                .map(move |(i, e)| (c.feature.as_str(), i, e))
        })
    }

    /// Follow `path` from this element.
    pub fn walk(&self, path: &ElementPath) -> Option<&Element> {
        let mut current = self;
        for step in path.steps() {
            current = current
                .containment(&step.feature)?
                .elements
                .get(step.index)?;
        }
        Some(current)
    }

    /// Visit this element and all descendants in document order.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&ElementPath, &'a Element)) {
        fn go<'a>(
            element: &'a Element,
            path: &mut ElementPath,
            f: &mut impl FnMut(&ElementPath, &'a Element),
        ) {
            f(path, element);
            for containment in &element.children {
                for (i, child) in containment.elements.iter().enumerate() {
                    path.0.push(PathStep {
                        feature: containment.feature.clone(),
                        index: i,
                    });
                    go(child, path, f);
                    path.0.pop();
                }
            }
        }
        go(self, &mut ElementPath::root(), f);
    }

    /// All elements with their paths, in document order.
    pub fn descendants(&self) -> Vec<(ElementPath, &Element)> {
        let mut out = Vec::new();
        self.visit(&mut |path, element| out.push((path.clone(), element)));
        out
    }
}
