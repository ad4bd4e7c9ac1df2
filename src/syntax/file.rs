//! Parsed document: the plain, self-contained result of parsing one source unit.
//!
//! A [`ParsedDocument`] owns everything the rest of the pipeline needs from a
//! parse (token stream, element tree, lexical and syntactic errors) and holds
//! no rowan nodes, so it can cross a thread boundary as serialized JSON.

use rowan::TextRange;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::lower::lower;
use super::model::Element;
use crate::parser::{self, LexError, Parse, SyntaxError, SyntaxKind};

/// A token of the stream kept on a source unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub kind: SyntaxKind,
    pub range: TextRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub tokens: Vec<TokenInfo>,
    pub root: Option<Element>,
    pub lex_errors: Vec<LexError>,
    pub syntax_errors: Vec<SyntaxError>,
}

impl ParsedDocument {
    /// Parse and lower `text`.
    pub fn parse(text: &str) -> Self {
        Self::from_parse(parser::parse(text))
    }

    /// Parse and lower `text`, or `None` when `cancel` fires first.
    pub fn parse_cancellable(text: &str, cancel: &CancellationToken) -> Option<Self> {
        let parse = parser::parse_cancellable(text, cancel)?;
        if cancel.is_cancelled() {
            return None;
        }
        Some(Self::from_parse(parse))
    }

    /// Parse truncated text (a buffer up to the cursor), keeping blocks
    /// open at the end.
    pub fn parse_for_completion(text: &str) -> Self {
        Self::from_parse(parser::parse_for_completion(text))
    }

    fn from_parse(parse: Parse) -> Self {
        let (root, lower_errors) = lower(&parse);
        let tokens = parse
            .tokens
            .iter()
            .map(|&(kind, range)| TokenInfo { kind, range })
            .collect();
        let mut syntax_errors = parse.errors;
        syntax_errors.extend(lower_errors);
        Self {
            tokens,
            root,
            lex_errors: parse.lex_errors,
            syntax_errors,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.lex_errors.is_empty() || !self.syntax_errors.is_empty()
    }

    /// Serialize for transfer across a worker boundary.
    pub fn dehydrate(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Rebuild a document from [`ParsedDocument::dehydrate`] output.
    pub fn rehydrate(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
