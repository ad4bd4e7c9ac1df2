//! Lowering from the rowan CST to the element model.
//!
//! The lowering is schema driven: each [`ElementKind`] lists its containment
//! features and reference properties, every other key becomes a plain
//! scalar property. Structural problems are reported as syntax errors and
//! the offending property is skipped.

use rustc_hash::FxHashSet;

use super::model::{Containment, Element, ElementKind, ReferenceSite};
use crate::base::constants::ID_PROPERTY;
use crate::parser::{AstNode, Parse, Property, Scalar, SourceFile, SyntaxError, Value};

/// Lower a parse result to its root element.
///
/// Returns `None` for a file without a (recognized) root.
pub fn lower(parse: &Parse) -> (Option<Element>, Vec<SyntaxError>) {
    let mut lowering = Lowering::default();
    let root = SourceFile::cast(parse.syntax()).and_then(|file| lowering.root(&file));
    (root, lowering.errors)
}

#[derive(Default)]
struct Lowering {
    errors: Vec<SyntaxError>,
}

impl Lowering {
    fn error(&mut self, message: impl Into<String>, node: &impl AstNode) {
        self.errors
            .push(SyntaxError::new(message, node.syntax().text_range()));
    }

    fn error_at_key(&mut self, message: impl Into<String>, property: &Property) {
        let range = property
            .key_token()
            .map(|t| t.text_range())
            .unwrap_or_else(|| property.text_range());
        self.errors.push(SyntaxError::new(message, range));
    }

    fn root(&mut self, file: &SourceFile) -> Option<Element> {
        let property = file.root()?;
        let key = property.key()?;
        let Some(kind) = ElementKind::from_root_key(&key) else {
            self.error_at_key(format!("unknown root element `{key}`"), &property);
            return None;
        };
        let Some(block) = property.block() else {
            self.error_at_key(format!("`{key}` expects an indented block"), &property);
            return Some(Element::new(kind, property.text_range()));
        };
        Some(self.element(kind, property.text_range(), block.properties()))
    }

    fn element(
        &mut self,
        kind: ElementKind,
        range: rowan::TextRange,
        properties: impl Iterator<Item = Property>,
    ) -> Element {
        let mut element = Element::new(kind, range);
        let mut seen = FxHashSet::default();

        for property in properties {
            let Some(key) = property.key() else {
                continue;
            };
            if !seen.insert(key.clone()) {
                self.error_at_key(format!("duplicate property `{key}`"), &property);
                continue;
            }

            if key == ID_PROPERTY && kind.has_declared_id() {
                self.id(&mut element, &property);
            } else if let Some(spec) = kind.containment(&key) {
                let elements = if spec.many {
                    self.list_containment(spec.kind, &property)
                } else {
                    self.single_containment(spec.kind, &property)
                };
                element.children.push(Containment {
                    feature: key,
                    elements,
                });
            } else if let Some(spec) = kind.reference(&key) {
                let scalars = reference_scalars(&property);
                if !spec.many && scalars.len() > 1 {
                    self.error_at_key(format!("`{key}` takes a single reference"), &property);
                }
                let limit = if spec.many { scalars.len() } else { 1 };
                for (index, scalar) in scalars.into_iter().take(limit).enumerate() {
                    element.references.push(ReferenceSite {
                        property: key.clone(),
                        index,
                        text: scalar.text(),
                        range: scalar.text_range(),
                        target: spec.target,
                    });
                }
            } else if let Some(value) = property.value() {
                let text = match value {
                    Value::Scalar(s) => s.text(),
                    Value::List(l) => l.items().map(|s| s.text()).collect::<Vec<_>>().join(", "),
                };
                element.properties.push((key, text));
            }
        }

        element
    }

    fn id(&mut self, element: &mut Element, property: &Property) {
        match property.value() {
            Some(Value::Scalar(scalar)) => {
                element.id = Some(scalar.text());
                element.id_range = Some(scalar.text_range());
            }
            _ => self.error_at_key("`id` expects a single value", property),
        }
    }

    fn list_containment(&mut self, kind: ElementKind, property: &Property) -> Vec<Element> {
        if property.value().is_some() {
            self.error_at_key(
                format!("`{}` expects a list of {kind} items", property.key().unwrap_or_default()),
                property,
            );
            return Vec::new();
        }
        let Some(block) = property.block() else {
            return Vec::new();
        };
        if let Some(stray) = block.properties().next() {
            self.error_at_key("expected a `- ` list item", &stray);
        }
        let mut elements = Vec::new();
        for item in block.list_items() {
            if item.value().is_some() {
                self.error(format!("expected a {kind}, found a plain value"), &item);
                continue;
            }
            elements.push(self.element(kind, item.text_range(), item.properties()));
        }
        elements
    }

    fn single_containment(&mut self, kind: ElementKind, property: &Property) -> Vec<Element> {
        match property.block() {
            Some(block) => vec![self.element(kind, property.text_range(), block.properties())],
            None => {
                self.error_at_key(
                    format!("`{}` expects an indented block", property.key().unwrap_or_default()),
                    property,
                );
                Vec::new()
            }
        }
    }
}

/// Scalars of a reference property: inline (`a` or `[a, b]`) or a block of `- a` items.
fn reference_scalars(property: &Property) -> Vec<Scalar> {
    if let Some(value) = property.value() {
        return value.scalars();
    }
    property
        .block()
        .map(|block| {
            block
                .list_items()
                .filter_map(|item| item.value())
                .flat_map(|value| value.scalars())
                .collect()
        })
        .unwrap_or_default()
}
