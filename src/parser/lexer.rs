//! Logos-based lexer with indentation awareness
//!
//! Raw tokens come from the logos-generated tokenizer; [`IndentationLexer`]
//! walks the input line by line and materializes indentation changes as
//! zero-width `INDENT`/`DEDENT` tokens so the parser can treat them as
//! block delimiters.

use std::cell::Cell;

use logos::Logos;
use rowan::{TextRange, TextSize};
use serde::{Deserialize, Serialize};

use super::indent::IndentStack;
use super::syntax_kind::SyntaxKind;

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: TextSize,
}

impl Token<'_> {
    pub fn range(&self) -> TextRange {
        TextRange::at(self.offset, TextSize::of(self.text))
    }
}

/// A malformed-indentation report anchored at the offending line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexError {
    pub message: String,
    pub range: TextRange,
}

/// Tokens plus lexical errors for one input.
#[derive(Debug, Clone, Default)]
pub struct LexOutput<'a> {
    pub tokens: Vec<Token<'a>>,
    pub errors: Vec<LexError>,
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_offset(input, TextSize::new(0))
    }

    /// Lex a slice whose first byte sits at `base` in the full text.
    pub fn with_offset(input: &'a str, base: TextSize) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            offset: base.into(),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        let kind = match logos_token {
            Ok(t) => t.into(),
            Err(()) => SyntaxKind::ERROR,
        };

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string with the default indentation lexer
pub fn tokenize(input: &str) -> LexOutput<'_> {
    IndentationLexer::new().tokenize(input)
}

/// Indentation-sensitive tokenizer.
///
/// Keeps no state between calls except the completion-mode flag, which is
/// re-entrant: [`IndentationLexer::with_completion_mode`] restores the
/// previous value when its closure returns or unwinds.
#[derive(Debug, Default)]
pub struct IndentationLexer {
    completion_mode: Cell<bool>,
}

struct RestoreMode<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl Drop for RestoreMode<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

impl IndentationLexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether end-of-text dedents are currently suppressed.
    pub fn is_completion_mode(&self) -> bool {
        self.completion_mode.get()
    }

    /// Run `f` with end-of-text dedent flushing suppressed.
    ///
    /// Completion parses operate on truncated input, where closing the open
    /// blocks would invent structure the user has not typed yet.
    pub fn with_completion_mode<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let previous = self.completion_mode.replace(true);
        let _restore = RestoreMode {
            flag: &self.completion_mode,
            previous,
        };
        f(self)
    }

    pub fn tokenize<'a>(&self, input: &'a str) -> LexOutput<'a> {
        let mut out = LexOutput::default();
        let mut stack = IndentStack::new();
        let mut line_start = 0usize;

        for line in input.split_inclusive('\n') {
            let content = line.trim_end_matches(['\n', '\r']);
            let indent_len = content.len() - content.trim_start_matches([' ', '\t']).len();
            let rest = &content[indent_len..];

            if rest.is_empty() || rest.starts_with('#') {
                push_raw(line, line_start, true, &mut out.tokens);
            } else {
                if indent_len > 0 {
                    out.tokens.push(Token {
                        kind: SyntaxKind::WHITESPACE,
                        text: &line[..indent_len],
                        offset: offset_of(line_start),
                    });
                }
                let column = indent_len + list_marker_len(rest);
                let line_range = TextRange::at(offset_of(line_start), TextSize::of(content));
                adjust_indentation(
                    column,
                    offset_of(line_start + indent_len),
                    line_range,
                    &mut stack,
                    &mut out,
                );
                push_raw(
                    &line[indent_len..],
                    line_start + indent_len,
                    false,
                    &mut out.tokens,
                );
            }
            line_start += line.len();
        }

        if !self.completion_mode.get() {
            // Anchored at the end of the text, not the start of the last line.
            let end = TextSize::of(input);
            while !stack.is_base() {
                stack.pop();
                out.tokens.push(Token {
                    kind: SyntaxKind::DEDENT,
                    text: "",
                    offset: end,
                });
            }
        }

        out
    }
}

fn offset_of(offset: usize) -> TextSize {
    TextSize::new(offset as u32)
}

/// Width of a leading list-item marker (`-` plus the whitespace after it).
///
/// The marker counts as indentation so the item's properties align on the
/// column after it.
fn list_marker_len(rest: &str) -> usize {
    let mut chars = rest.chars();
    if chars.next() != Some('-') {
        return 0;
    }
    match chars.next() {
        Some(' ') | Some('\t') => {
            let after = &rest[1..];
            1 + (after.len() - after.trim_start_matches([' ', '\t']).len())
        }
        _ => 0,
    }
}

fn adjust_indentation(
    column: usize,
    anchor: TextSize,
    line_range: TextRange,
    stack: &mut IndentStack,
    out: &mut LexOutput<'_>,
) {
    let current = stack.current();
    if column > current {
        stack.push(column);
        out.tokens.push(Token {
            kind: SyntaxKind::INDENT,
            text: "",
            offset: anchor,
        });
    } else if column < current {
        match stack.find_last_index(column) {
            Some(idx) => {
                let dedents = stack.len() - idx - 1;
                for _ in 0..dedents {
                    stack.pop();
                    out.tokens.push(Token {
                        kind: SyntaxKind::DEDENT,
                        text: "",
                        offset: anchor,
                    });
                }
            }
            None => out.errors.push(LexError {
                message: format!(
                    "Invalid dedent to column {}; open indentation levels are {:?}",
                    column,
                    stack.get()
                ),
                range: line_range,
            }),
        }
    }
}

fn push_raw<'a>(text: &'a str, base: usize, blank: bool, tokens: &mut Vec<Token<'a>>) {
    for mut token in Lexer::with_offset(text, offset_of(base)) {
        if blank && token.kind == SyntaxKind::NEWLINE {
            token.kind = SyntaxKind::WHITESPACE;
        }
        tokens.push(token);
    }
}

/// Logos token enum - maps to SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t]+")]
    Whitespace,

    #[regex(r"\r?\n")]
    Newline,

    #[regex(r"#[^\r\n]*")]
    LineComment,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r"[0-9]*\.[0-9]+([eE][+-]?[0-9]+)?")]
    Decimal,

    #[regex(r#""([^"\\\r\n]|\\.)*""#)]
    String,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    #[token(":")]
    Colon,

    #[token(".")]
    Dot,

    #[token(",")]
    Comma,

    #[token("-")]
    Dash,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,
}

impl From<LogosToken> for SyntaxKind {
    fn from(token: LogosToken) -> Self {
        match token {
            LogosToken::Whitespace => SyntaxKind::WHITESPACE,
            LogosToken::Newline => SyntaxKind::NEWLINE,
            LogosToken::LineComment => SyntaxKind::LINE_COMMENT,
            LogosToken::Ident => SyntaxKind::IDENT,
            LogosToken::Integer => SyntaxKind::INTEGER,
            LogosToken::Decimal => SyntaxKind::DECIMAL,
            LogosToken::String => SyntaxKind::STRING,
            LogosToken::Colon => SyntaxKind::COLON,
            LogosToken::Dot => SyntaxKind::DOT,
            LogosToken::Comma => SyntaxKind::COMMA,
            LogosToken::Dash => SyntaxKind::DASH,
            LogosToken::LBracket => SyntaxKind::L_BRACKET,
            LogosToken::RBracket => SyntaxKind::R_BRACKET,
        }
    }
}
