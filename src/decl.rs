//! Language-neutral declaration tree.
//!
//! Parsed source files are lowered into a small `rowan` tree whose node kinds
//! describe declarations rather than concrete syntax. Structural matching
//! (registration extraction, mock rendering) walks this tree instead of a
//! parser-specific AST, so it can be exercised with hand-built trees.
//!
//! A provider file lowers to something like:
//! ```text
//! ROOT
//!   PACKAGE (IDENT "widgets")
//!   TYPE_DECL
//!     IDENT "Params"
//!     STRUCT_TYPE
//!       FIELD_LIST
//!         FIELD (QUALIFIED_TYPE "dig.In")
//!         FIELD (IDENT "Widget", TYPE_NAME "Widget", TAG)
//!   FUNC_DECL
//!     IDENT "GetWidget"
//!     PARAMS
//!     RESULTS (PARAM (POINTER_TYPE "*Widget"))
//! ```

use rowan::{GreenNodeBuilder, Language};

/// Selector of the embedded marker type that opens a dig parameter struct.
pub const IN_MARKER: &str = "In";

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    // Tokens
    IDENT = 0,
    STRING,
    PUNCT,
    TEXT,

    // Declarations
    PACKAGE,
    IMPORT,
    FUNC_DECL,
    TYPE_DECL,
    INTERFACE_TYPE,
    METHOD,
    EMBED,
    STRUCT_TYPE,
    FIELD_LIST,
    FIELD,
    TAG,
    PARAMS,
    RESULTS,
    PARAM,

    // Type references
    TYPE_NAME,
    QUALIFIED_TYPE,
    POINTER_TYPE,
    SLICE_TYPE,
    OTHER_TYPE,

    ROOT,
}

use SyntaxKind::*;

const KINDS: [SyntaxKind; ROOT as usize + 1] = [
    IDENT,
    STRING,
    PUNCT,
    TEXT,
    PACKAGE,
    IMPORT,
    FUNC_DECL,
    TYPE_DECL,
    INTERFACE_TYPE,
    METHOD,
    EMBED,
    STRUCT_TYPE,
    FIELD_LIST,
    FIELD,
    TAG,
    PARAMS,
    RESULTS,
    PARAM,
    TYPE_NAME,
    QUALIFIED_TYPE,
    POINTER_TYPE,
    SLICE_TYPE,
    OTHER_TYPE,
    ROOT,
];

impl SyntaxKind {
    /// Whether this node kind denotes a type reference.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            TYPE_NAME | QUALIFIED_TYPE | POINTER_TYPE | SLICE_TYPE | OTHER_TYPE | STRUCT_TYPE
                | INTERFACE_TYPE
        )
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeclLanguage {}

impl Language for DeclLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> SyntaxKind {
        KINDS[raw.0 as usize]
    }

    fn kind_to_raw(kind: SyntaxKind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub type SyntaxNode = rowan::SyntaxNode<DeclLanguage>;

/// Thin wrapper over [`GreenNodeBuilder`] speaking [`SyntaxKind`].
#[derive(Default)]
pub struct TreeBuilder {
    inner: GreenNodeBuilder<'static>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, kind: SyntaxKind) {
        self.inner.start_node(kind.into());
    }

    pub fn token(&mut self, kind: SyntaxKind, text: &str) {
        self.inner.token(kind.into(), text);
    }

    pub fn finish(&mut self) {
        self.inner.finish_node();
    }

    /// Emits a complete leaf node holding a single token.
    pub fn leaf(&mut self, node: SyntaxKind, token: SyntaxKind, text: &str) {
        self.start(node);
        self.token(token, text);
        self.finish();
    }

    pub fn build(self) -> SyntaxNode {
        SyntaxNode::new_root(self.inner.finish())
    }
}

/// Text of the first `IDENT` token directly under `node`.
pub fn ident(node: &SyntaxNode) -> Option<String> {
    idents(node).into_iter().next()
}

/// All `IDENT` tokens directly under `node`, in order.
pub fn idents(node: &SyntaxNode) -> Vec<String> {
    node.children_with_tokens()
        .filter_map(|element| element.into_token())
        .filter(|token| token.kind() == IDENT)
        .map(|token| token.text().to_string())
        .collect()
}

/// First child node of `kind`.
pub fn child(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxNode> {
    node.children().find(|c| c.kind() == kind)
}

/// First child node that is a type reference.
pub fn type_of(node: &SyntaxNode) -> Option<SyntaxNode> {
    node.children().find(|c| c.kind().is_type())
}

/// For a `QUALIFIED_TYPE` node `pkg.Name`, returns `(pkg, Name)`.
pub fn qualified_parts(ty: &SyntaxNode) -> Option<(String, String)> {
    if ty.kind() != QUALIFIED_TYPE {
        return None;
    }
    let mut parts = idents(ty).into_iter();
    Some((parts.next()?, parts.next()?))
}

/// Whether a `FIELD` is typed as a qualified reference with selector `In`.
pub fn is_in_marker(field: &SyntaxNode) -> bool {
    type_of(field)
        .and_then(|ty| qualified_parts(&ty))
        .is_some_and(|(_, name)| name == IN_MARKER)
}

/// Whether a `FIELD_LIST` opens with an embedded `pkg.In` member.
pub fn embeds_in_marker(list: &SyntaxNode) -> bool {
    list.children()
        .find(|c| c.kind() == FIELD)
        .is_some_and(|first| idents(&first).is_empty() && is_in_marker(&first))
}
