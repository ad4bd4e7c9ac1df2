//! Foundation types for the Tessera toolchain.
//!
//! This module provides fundamental types used throughout the front end:
//! - [`Location`] - Canonical identifier of a source unit or directory
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`Position`], [`Span`] - Line/column positions for model elements
//! - Domain constants (file extensions, manifest name)
//!
//! This module has NO dependencies on other tessera modules.

pub mod constants;
mod location;
mod position;
mod span;

pub use location::Location;
pub use position::{Position, Span};
pub use span::{LineCol, LineIndex, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
