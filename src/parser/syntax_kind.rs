//! Syntax kinds for the Rowan-based CST
//!
//! This enum defines all possible node and token kinds in the syntax tree.
//! Layout tokens (`NEWLINE`, `INDENT`, `DEDENT`) are significant: indentation
//! is materialized as explicit block delimiters by the lexer.

use serde::{Deserialize, Serialize};

/// All syntax kinds (tokens and nodes) of the modeling language
///
/// Tokens are leaf nodes (identifiers, literals, punctuation, layout).
/// Nodes are composite (properties, blocks, list items, values).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA (whitespace, blank lines and comments)
    // =========================================================================
    WHITESPACE = 0,
    LINE_COMMENT, // # comment

    // =========================================================================
    // LAYOUT (significant)
    // =========================================================================
    NEWLINE, // end of a content line
    INDENT,  // synthetic, zero-width
    DEDENT,  // synthetic, zero-width

    // =========================================================================
    // LITERALS
    // =========================================================================
    IDENT,   // identifier
    INTEGER, // 42
    DECIMAL, // 3.14
    STRING,  // "hello"

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    COLON,     // :
    DOT,       // .
    COMMA,     // ,
    DASH,      // - (list item marker)
    L_BRACKET, // [
    R_BRACKET, // ]

    ERROR,

    // =========================================================================
    // NODES
    // =========================================================================
    SOURCE_FILE,
    PROPERTY,
    BLOCK,
    LIST_ITEM,
    SCALAR,
    LIST_VALUE,
    QUALIFIED_NAME,

    #[doc(hidden)]
    __LAST,
}

impl SyntaxKind {
    /// Check if this is a trivia token (whitespace or comment)
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::WHITESPACE | Self::LINE_COMMENT)
    }

    /// Check if this is a layout token produced from indentation
    pub fn is_layout(self) -> bool {
        matches!(self, Self::NEWLINE | Self::INDENT | Self::DEDENT)
    }

    /// Check if this token is synthesized (has no source text)
    pub fn is_synthetic(self) -> bool {
        matches!(self, Self::INDENT | Self::DEDENT)
    }

    /// Check if this is a punctuation token
    pub fn is_punct(self) -> bool {
        (self as u16) >= (Self::COLON as u16) && (self as u16) <= (Self::R_BRACKET as u16)
    }

    /// Check if this is a literal
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::IDENT | Self::INTEGER | Self::DECIMAL | Self::STRING
        )
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: we control all syntax kinds and check bounds above
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TesseraLanguage {}

impl rowan::Language for TesseraLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for convenience
pub type SyntaxNode = rowan::SyntaxNode<TesseraLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<TesseraLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<TesseraLanguage>;
