//! Typed AST wrappers over the untyped rowan CST.
//!
//! Each struct wraps a SyntaxNode and provides methods to access children.

use rowan::TextRange;

use super::syntax_kind::SyntaxKind;
use super::{SyntaxNode, SyntaxToken};

/// Trait for AST nodes that wrap a SyntaxNode
pub trait AstNode: Sized {
    fn can_cast(kind: SyntaxKind) -> bool;
    fn cast(node: SyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &SyntaxNode;

    fn text_range(&self) -> TextRange {
        self.syntax().text_range()
    }
}

// ============================================================================
// Helper macros
// ============================================================================

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                kind == SyntaxKind::$kind
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                if Self::can_cast(node.kind()) {
                    Some(Self(node))
                } else {
                    None
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

fn first_token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == kind)
}

// ============================================================================
// Root
// ============================================================================

ast_node!(SourceFile, SOURCE_FILE);

impl SourceFile {
    /// Top-level properties. A well-formed document has exactly one.
    pub fn properties(&self) -> impl Iterator<Item = Property> + '_ {
        self.0.children().filter_map(Property::cast)
    }

    pub fn root(&self) -> Option<Property> {
        self.properties().next()
    }
}

// ============================================================================
// Properties and blocks
// ============================================================================

ast_node!(Property, PROPERTY);

impl Property {
    pub fn key_token(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::IDENT)
    }

    pub fn key(&self) -> Option<String> {
        self.key_token().map(|t| t.text().to_string())
    }

    /// Inline value, when the property is written `key: value`.
    pub fn value(&self) -> Option<Value> {
        self.0.children().find_map(Value::cast)
    }

    /// Nested block, when the property is written `key:` followed by an indented block.
    pub fn block(&self) -> Option<Block> {
        self.0.children().find_map(Block::cast)
    }
}

ast_node!(Block, BLOCK);

/// A member of a block: either a nested property or a `- ` list item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockMember {
    Property(Property),
    ListItem(ListItem),
}

impl AstNode for BlockMember {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(kind, SyntaxKind::PROPERTY | SyntaxKind::LIST_ITEM)
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::PROPERTY => Some(Self::Property(Property(node))),
            SyntaxKind::LIST_ITEM => Some(Self::ListItem(ListItem(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Property(n) => n.syntax(),
            Self::ListItem(n) => n.syntax(),
        }
    }
}

impl Block {
    pub fn members(&self) -> impl Iterator<Item = BlockMember> + '_ {
        self.0.children().filter_map(BlockMember::cast)
    }

    pub fn properties(&self) -> impl Iterator<Item = Property> + '_ {
        self.0.children().filter_map(Property::cast)
    }

    pub fn list_items(&self) -> impl Iterator<Item = ListItem> + '_ {
        self.0.children().filter_map(ListItem::cast)
    }
}

ast_node!(ListItem, LIST_ITEM);

impl ListItem {
    /// Properties of an object item (`- id: A` plus continuation lines).
    pub fn properties(&self) -> impl Iterator<Item = Property> + '_ {
        self.0.children().filter_map(Property::cast)
    }

    /// Value of a scalar item (`- A`).
    pub fn value(&self) -> Option<Value> {
        self.0.children().find_map(Value::cast)
    }
}

// ============================================================================
// Values
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Scalar(Scalar),
    List(ListValue),
}

impl AstNode for Value {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(kind, SyntaxKind::SCALAR | SyntaxKind::LIST_VALUE)
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::SCALAR => Some(Self::Scalar(Scalar(node))),
            SyntaxKind::LIST_VALUE => Some(Self::List(ListValue(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Scalar(n) => n.syntax(),
            Self::List(n) => n.syntax(),
        }
    }
}

impl Value {
    /// Scalars in this value: one for a scalar, each element for a list.
    pub fn scalars(&self) -> Vec<Scalar> {
        match self {
            Self::Scalar(s) => vec![s.clone()],
            Self::List(l) => l.items().collect(),
        }
    }
}

ast_node!(ListValue, LIST_VALUE);

impl ListValue {
    pub fn items(&self) -> impl Iterator<Item = Scalar> + '_ {
        self.0.children().filter_map(Scalar::cast)
    }
}

ast_node!(Scalar, SCALAR);

impl Scalar {
    fn token(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| t.kind().is_literal())
    }

    pub fn is_string(&self) -> bool {
        self.token().is_some_and(|t| t.kind() == SyntaxKind::STRING)
    }

    pub fn is_number(&self) -> bool {
        self.token()
            .is_some_and(|t| matches!(t.kind(), SyntaxKind::INTEGER | SyntaxKind::DECIMAL))
    }

    pub fn qualified_name(&self) -> Option<QualifiedName> {
        self.0.children().find_map(QualifiedName::cast)
    }

    /// Text of the scalar with string quotes and escapes removed.
    pub fn text(&self) -> String {
        if let Some(name) = self.qualified_name() {
            return name.text();
        }
        match self.token() {
            Some(t) if t.kind() == SyntaxKind::STRING => unquote(t.text()),
            Some(t) => t.text().to_string(),
            None => String::new(),
        }
    }
}

ast_node!(QualifiedName, QUALIFIED_NAME);

impl QualifiedName {
    pub fn segments(&self) -> Vec<String> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind() == SyntaxKind::IDENT)
            .map(|t| t.text().to_string())
            .collect()
    }

    pub fn text(&self) -> String {
        self.segments().join(".")
    }
}

fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .map(|s| s.strip_suffix('"').unwrap_or(s))
        .unwrap_or(raw);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
