//! Recursive descent parser for the indentation-structured property language
//!
//! Builds a rowan GreenNode tree from the indentation-aware token stream.
//! Supports error recovery and produces a lossless CST.

use rowan::{GreenNode, GreenNodeBuilder, TextRange, TextSize};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::lexer::{IndentationLexer, LexError, Token};
use super::syntax_kind::SyntaxKind;

/// Parse result containing the green tree and any errors
#[derive(Debug, Clone)]
pub struct Parse {
    pub green: GreenNode,
    pub errors: Vec<SyntaxError>,
    pub lex_errors: Vec<LexError>,
    /// Significant and trivia tokens as `(kind, range)` pairs.
    pub tokens: Vec<(SyntaxKind, TextRange)>,
}

impl Parse {
    /// Get the root syntax node
    pub fn syntax(&self) -> super::SyntaxNode {
        super::SyntaxNode::new_root(self.green.clone())
    }

    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty() && self.lex_errors.is_empty()
    }
}

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Parse source text into a CST
pub fn parse(input: &str) -> Parse {
    run(&IndentationLexer::new(), input, None).0
}

/// Parse source text, checking `cancel` between properties.
///
/// Returns `None` when the token is signalled before parsing completes.
pub fn parse_cancellable(input: &str, cancel: &CancellationToken) -> Option<Parse> {
    let (parse, cancelled) = run(&IndentationLexer::new(), input, Some(cancel));
    (!cancelled).then_some(parse)
}

/// Parse truncated input for completion: open blocks stay open at the end.
pub fn parse_for_completion(input: &str) -> Parse {
    IndentationLexer::new()
        .with_completion_mode(|lexer| run(lexer, input, None))
        .0
}

fn run(
    lexer: &IndentationLexer,
    input: &str,
    cancel: Option<&CancellationToken>,
) -> (Parse, bool) {
    let lexed = lexer.tokenize(input);
    let mut parser = Parser::new(&lexed.tokens, cancel);
    parser.parse_source_file();
    let cancelled = parser.cancelled;
    let tokens = lexed.tokens.iter().map(|t| (t.kind, t.range())).collect();
    let (green, errors) = parser.finish();
    let parse = Parse {
        green,
        errors,
        lex_errors: lexed.errors,
        tokens,
    };
    (parse, cancelled)
}

/// The parser state
struct Parser<'a, 't> {
    tokens: &'t [Token<'a>],
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<SyntaxError>,
    cancel: Option<&'t CancellationToken>,
    cancelled: bool,
}

impl<'a, 't> Parser<'a, 't> {
    fn new(tokens: &'t [Token<'a>], cancel: Option<&'t CancellationToken>) -> Self {
        Self {
            tokens,
            pos: 0,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
            cancel,
            cancelled: false,
        }
    }

    fn finish(self) -> (GreenNode, Vec<SyntaxError>) {
        (self.builder.finish(), self.errors)
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    fn current(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> SyntaxKind {
        self.current().map(|t| t.kind).unwrap_or(SyntaxKind::ERROR)
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        !self.at_eof() && self.current_kind() == kind
    }

    fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        !self.at_eof() && kinds.contains(&self.current_kind())
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Kind of the n-th non-trivia token from the current position
    fn nth(&self, n: usize) -> SyntaxKind {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .nth(n)
            .map(|t| t.kind)
            .unwrap_or(SyntaxKind::ERROR)
    }

    /// Safe point: observe the cancellation token
    fn check_cancelled(&mut self) -> bool {
        if !self.cancelled && self.cancel.is_some_and(|c| c.is_cancelled()) {
            self.cancelled = true;
        }
        self.cancelled
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    fn bump(&mut self) {
        let tokens = self.tokens;
        if let Some(token) = tokens.get(self.pos) {
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        while self.current().is_some_and(|t| t.kind.is_trivia()) {
            self.bump();
        }
    }

    /// Skip trivia and empty line ends
    fn skip_blank(&mut self) {
        while self
            .current()
            .is_some_and(|t| t.kind.is_trivia() || t.kind == SyntaxKind::NEWLINE)
        {
            self.bump();
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error(&mut self, message: impl Into<String>) {
        let range = self
            .current()
            .map(|t| t.range())
            .or_else(|| {
                self.tokens
                    .last()
                    .map(|t| TextRange::empty(t.range().end()))
            })
            .unwrap_or_else(|| TextRange::empty(TextSize::new(0)));
        self.errors.push(SyntaxError::new(message, range));
    }

    /// Report an error and wrap tokens up to the next line end in an ERROR node
    fn error_recover(&mut self, message: impl Into<String>) {
        self.error(message);
        self.builder.start_node(SyntaxKind::ERROR.into());
        let mut consumed = false;
        while !self.at_eof()
            && !self.at_any(&[SyntaxKind::NEWLINE, SyntaxKind::INDENT, SyntaxKind::DEDENT])
        {
            self.bump();
            consumed = true;
        }
        if !consumed && !self.at_eof() && !self.at(SyntaxKind::DEDENT) {
            self.bump();
        }
        self.builder.finish_node();
    }

    // =========================================================================
    // Node building helpers
    // =========================================================================

    fn start_node(&mut self, kind: SyntaxKind) {
        self.builder.start_node(kind.into());
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    // =========================================================================
    // Grammar rules
    // =========================================================================

    /// SourceFile = Property*
    fn parse_source_file(&mut self) {
        self.start_node(SyntaxKind::SOURCE_FILE);
        let mut roots = 0usize;

        loop {
            self.skip_blank();
            if self.at_eof() || self.check_cancelled() {
                break;
            }
            let pos_before = self.pos;
            match self.current_kind() {
                SyntaxKind::IDENT => {
                    roots += 1;
                    if roots == 2 {
                        self.error("a file holds exactly one root element");
                    }
                    self.parse_property();
                }
                SyntaxKind::INDENT => {
                    self.error("unexpected indentation");
                    self.start_node(SyntaxKind::ERROR);
                    self.parse_block();
                    self.finish_node();
                }
                _ => self.error_recover(format!(
                    "expected a property, found {:?}",
                    self.current_kind()
                )),
            }
            // Safety: if we didn't make progress, force-skip a token
            if self.pos == pos_before && !self.at_eof() {
                self.bump();
            }
        }

        // Trailing synthetic tokens still belong to the lossless tree
        while !self.at_eof() {
            self.bump();
        }

        self.finish_node();
    }

    /// Property = IDENT ':' (Value NEWLINE | NEWLINE Block?)
    fn parse_property(&mut self) {
        if self.check_cancelled() {
            return;
        }
        self.start_node(SyntaxKind::PROPERTY);
        self.bump(); // key
        self.skip_trivia();

        if !self.eat(SyntaxKind::COLON) {
            self.error_recover("expected ':' after property name");
            self.eat(SyntaxKind::NEWLINE);
            self.finish_node();
            return;
        }
        self.skip_trivia();

        if self.at_eof() || self.at(SyntaxKind::NEWLINE) {
            self.eat(SyntaxKind::NEWLINE);
            self.skip_blank();
            if self.at(SyntaxKind::INDENT) {
                self.parse_block();
            }
        } else if self.at_value_start() {
            self.parse_value();
            self.finish_line();
        } else {
            self.error_recover("expected a value or a nested block");
            self.eat(SyntaxKind::NEWLINE);
        }

        self.finish_node();
    }

    /// After an inline value: trivia, then a line end (or end of block/input)
    fn finish_line(&mut self) {
        self.skip_trivia();
        if self.eat(SyntaxKind::NEWLINE) || self.at_eof() || self.at(SyntaxKind::DEDENT) {
            return;
        }
        if self.at(SyntaxKind::INDENT) {
            self.error("unexpected indentation after an inline value");
            self.start_node(SyntaxKind::ERROR);
            self.parse_block();
            self.finish_node();
            return;
        }
        self.error_recover("unexpected input after value");
        self.eat(SyntaxKind::NEWLINE);
    }

    /// Block = INDENT (Property | ListItem)* DEDENT
    fn parse_block(&mut self) {
        self.start_node(SyntaxKind::BLOCK);
        self.bump(); // INDENT

        loop {
            self.skip_blank();
            if self.at_eof() || self.check_cancelled() {
                break;
            }
            if self.eat(SyntaxKind::DEDENT) {
                break;
            }
            let pos_before = self.pos;
            match self.current_kind() {
                SyntaxKind::IDENT => self.parse_property(),
                SyntaxKind::DASH => self.parse_list_item(),
                SyntaxKind::INDENT => {
                    self.error("unexpected indentation");
                    self.start_node(SyntaxKind::ERROR);
                    self.parse_block();
                    self.finish_node();
                }
                _ => self.error_recover(format!(
                    "expected a property or list item, found {:?}",
                    self.current_kind()
                )),
            }
            if self.pos == pos_before && !self.at_eof() {
                self.bump();
            }
        }

        self.finish_node();
    }

    /// ListItem = '-' (Property Property* | Value NEWLINE)
    fn parse_list_item(&mut self) {
        self.start_node(SyntaxKind::LIST_ITEM);
        self.bump(); // '-'
        self.skip_trivia();

        if self.at(SyntaxKind::IDENT) && self.nth(1) == SyntaxKind::COLON {
            self.parse_property();
            // Following properties at the same level belong to this item
            loop {
                self.skip_blank();
                if !self.at(SyntaxKind::IDENT) || self.check_cancelled() {
                    break;
                }
                self.parse_property();
            }
        } else if self.at_value_start() {
            self.parse_value();
            self.finish_line();
        } else if self.at(SyntaxKind::NEWLINE) {
            self.error("empty list item");
            self.bump();
        } else if !self.at_eof() {
            self.error_recover("expected a property or value after '-'");
            self.eat(SyntaxKind::NEWLINE);
        }

        self.finish_node();
    }

    fn at_value_start(&self) -> bool {
        self.at_any(&[
            SyntaxKind::IDENT,
            SyntaxKind::STRING,
            SyntaxKind::INTEGER,
            SyntaxKind::DECIMAL,
            SyntaxKind::L_BRACKET,
        ])
    }

    /// Value = Scalar | '[' (Scalar (',' Scalar)*)? ']'
    fn parse_value(&mut self) {
        if self.at(SyntaxKind::L_BRACKET) {
            self.start_node(SyntaxKind::LIST_VALUE);
            self.bump();
            self.skip_trivia();
            while !self.at_eof() && !self.at_any(&[SyntaxKind::R_BRACKET, SyntaxKind::NEWLINE]) {
                if self.at_value_start() && !self.at(SyntaxKind::L_BRACKET) {
                    self.parse_scalar();
                } else {
                    self.error("expected a value in list");
                    self.start_node(SyntaxKind::ERROR);
                    self.bump();
                    self.finish_node();
                }
                self.skip_trivia();
                if !self.eat(SyntaxKind::COMMA) {
                    break;
                }
                self.skip_trivia();
            }
            if !self.eat(SyntaxKind::R_BRACKET) {
                self.error("expected ']'");
            }
            self.finish_node();
        } else {
            self.parse_scalar();
        }
    }

    /// Scalar = STRING | INTEGER | DECIMAL | QualifiedName
    fn parse_scalar(&mut self) {
        self.start_node(SyntaxKind::SCALAR);
        if self.at(SyntaxKind::IDENT) {
            self.start_node(SyntaxKind::QUALIFIED_NAME);
            self.bump();
            while self.at(SyntaxKind::DOT) {
                self.bump();
                if !self.eat(SyntaxKind::IDENT) {
                    self.error("expected identifier after '.'");
                    break;
                }
            }
            self.finish_node();
        } else {
            self.bump();
        }
        self.finish_node();
    }
}
