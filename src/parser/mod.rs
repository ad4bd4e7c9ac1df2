//! Rowan-based parser for the indentation-structured modeling language
//!
//! This module provides a lossless parser using:
//! - **logos** for raw lexing
//! - an indentation layer that materializes `INDENT`/`DEDENT` tokens
//! - **rowan** for the CST (Concrete Syntax Tree)
//!
//! ## Architecture
//!
//! ```text
//! Source Text
//!     ↓
//! Lexer (logos) → raw tokens
//!     ↓
//! IndentationLexer → tokens + synthetic INDENT/DEDENT
//!     ↓
//! Parser → GreenNode tree (immutable, cheap to clone)
//!     ↓
//! AST layer → typed wrappers over SyntaxNode
//!     ↓
//! syntax::lower → element model
//! ```

#[allow(clippy::module_inception)]
mod parser;

pub mod ast;
mod indent;
mod lexer;
mod syntax_kind;

pub use ast::*;
pub use indent::IndentStack;
pub use lexer::{IndentationLexer, LexError, LexOutput, Lexer, Token, tokenize};
pub use parser::{Parse, SyntaxError, parse, parse_cancellable, parse_for_completion};
pub use syntax_kind::{SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken, TesseraLanguage};

/// Re-export rowan types for convenience
pub use rowan::{GreenNode, TextRange, TextSize};
