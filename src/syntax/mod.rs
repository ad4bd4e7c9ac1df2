//! Element model for model files.
//!
//! - [`model`] - element kinds, the containment/reference schema, structural paths
//! - [`lower`] - CST → element tree
//! - [`file`] - [`ParsedDocument`], the serializable parse result of one unit

pub mod file;
pub mod lower;
pub mod model;

pub use file::{ParsedDocument, TokenInfo};
pub use lower::lower;
pub use model::{
    Containment, ContainmentSpec, Element, ElementKind, ElementPath, PathStep, ReferenceSite,
    ReferenceSpec,
};
